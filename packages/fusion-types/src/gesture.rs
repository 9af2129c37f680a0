//! gesture.rs — command vocabulary and hand landmark arrays

use serde::{Deserialize, Serialize};

/// Keypoints per detected hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// `[x, y, z]` in color-image pixels; the third value is depth or confidence,
/// depending on the detector.
pub type Landmark = [f64; 3];

/// Gesture labels understood by the headset. The discriminant is the index
/// carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum Gesture {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    Clock = 4,
    #[serde(rename = "cclock")]
    CounterClock = 5,
    Tap = 6,
    /// No actionable gesture.
    Natural = -1,
}

impl Gesture {
    pub const COMMANDS: [Gesture; 7] = [
        Gesture::Up,
        Gesture::Down,
        Gesture::Left,
        Gesture::Right,
        Gesture::Clock,
        Gesture::CounterClock,
        Gesture::Tap,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::COMMANDS.get(i).copied())
            .unwrap_or(Gesture::Natural)
    }

    pub fn is_actionable(self) -> bool {
        self != Gesture::Natural
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Clock => "clock",
            Self::CounterClock => "cclock",
            Self::Tap => "tap",
            Self::Natural => "natural",
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Landmarks of one detected hand, in detector order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandLandmarks(pub Vec<Landmark>);

impl HandLandmarks {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.0.get(index)
    }

    /// `x0, y0, z0, x1, y1, z1, ...` without copying.
    pub fn flattened(&self) -> &[f64] {
        bytemuck::cast_slice(&self.0)
    }
}
