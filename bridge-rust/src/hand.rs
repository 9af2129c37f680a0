//! hand.rs — hand detector and gesture classifier seams
//!
//! Both are opaque to the pipeline: the detector turns a color frame into one
//! hand's landmarks, the classifier turns landmarks into a [`Gesture`]. The
//! implementations here drive the bridge without a trained model: a scripted
//! hand that swipes on a fixed timetable, and a classifier that reads swipes
//! from fingertip travel.

use std::collections::VecDeque;

use fusion_types::frame::ColorFrame;
use fusion_types::{Gesture, HandLandmarks, Landmark, Timestamp, HAND_LANDMARK_COUNT};

pub trait HandTracker {
    /// Landmarks of the detected hand in color-image pixels, or `None` when no
    /// hand is visible.
    fn detect(&mut self, frame: &ColorFrame) -> Option<HandLandmarks>;
}

pub trait GestureClassifier {
    fn classify(&mut self, hand: &HandLandmarks) -> Gesture;
}

// ── Scripted hand ────────────────────────────────────────────────────────────

/// Landmark offsets from the palm centre for a relaxed open hand, in pixels.
/// Order: wrist, then thumb, index, middle, ring, pinky (4 joints each).
const OPEN_HAND: [[f64; 2]; HAND_LANDMARK_COUNT] = [
    [0.0, 70.0],
    [-35.0, 50.0], [-60.0, 30.0], [-75.0, 5.0], [-85.0, -15.0],
    [-25.0, -10.0], [-28.0, -45.0], [-30.0, -70.0], [-31.0, -90.0],
    [0.0, -12.0], [0.0, -50.0], [0.0, -78.0], [0.0, -100.0],
    [22.0, -8.0], [25.0, -42.0], [27.0, -66.0], [28.0, -85.0],
    [40.0, 0.0], [46.0, -28.0], [50.0, -46.0], [52.0, -62.0],
];

/// A hand that rests at the image centre and swipes up, right, down, left in
/// turn. Each `period` starts with a `hidden` gap, then holds still, then swipes
/// `travel_px` during the last `swipe` portion.
pub struct ScriptedHand {
    period_ns: u64,
    hidden_ns: u64,
    swipe_ns: u64,
    travel_px: f64,
}

impl ScriptedHand {
    pub fn new(period_s: f64, hidden_s: f64, swipe_s: f64, travel_px: f64) -> Self {
        let ns = |s: f64| (s * 1e9) as u64;
        Self {
            period_ns: ns(period_s).max(1),
            hidden_ns: ns(hidden_s),
            swipe_ns: ns(swipe_s),
            travel_px,
        }
    }

    fn pose_at(&self, timestamp: Timestamp, width: f64, height: f64) -> Option<[f64; 2]> {
        let cycle = timestamp / self.period_ns;
        let phase = timestamp % self.period_ns;
        if phase < self.hidden_ns {
            return None;
        }
        let centre = [width / 2.0, height / 2.0];
        let swipe_start = self.period_ns.saturating_sub(self.swipe_ns);
        if phase < swipe_start || self.swipe_ns == 0 {
            return Some(centre);
        }

        let progress = (phase - swipe_start) as f64 / self.swipe_ns as f64;
        let d = progress * self.travel_px;
        let offset = match cycle % 4 {
            0 => [0.0, -d],
            1 => [d, 0.0],
            2 => [0.0, d],
            _ => [-d, 0.0],
        };
        Some([centre[0] + offset[0], centre[1] + offset[1]])
    }
}

impl HandTracker for ScriptedHand {
    fn detect(&mut self, frame: &ColorFrame) -> Option<HandLandmarks> {
        let image = &frame.payload.image;
        if image.pixels().is_empty() {
            return None;
        }
        let palm = self.pose_at(frame.timestamp, image.width() as f64, image.height() as f64)?;
        let points: Vec<Landmark> = OPEN_HAND
            .iter()
            .map(|o| [palm[0] + o[0], palm[1] + o[1], 0.9])
            .collect();
        Some(HandLandmarks(points))
    }
}

// ── Swipe classifier ─────────────────────────────────────────────────────────

/// Labels a swipe when the fingertip has travelled at least `min_travel_px`
/// across the last `window` frames. The window restarts after each swipe so one
/// motion yields one label.
pub struct SwipeClassifier {
    tip: usize,
    window: usize,
    min_travel_px: f64,
    recent: VecDeque<[f64; 2]>,
}

impl SwipeClassifier {
    pub fn new(tip: usize, window: usize, min_travel_px: f64) -> Self {
        Self {
            tip,
            window: window.max(2),
            min_travel_px,
            recent: VecDeque::with_capacity(window.max(2)),
        }
    }
}

impl GestureClassifier for SwipeClassifier {
    fn classify(&mut self, hand: &HandLandmarks) -> Gesture {
        let Some(tip) = hand.get(self.tip) else {
            return Gesture::Natural;
        };
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back([tip[0], tip[1]]);

        let (Some(first), Some(last)) = (self.recent.front(), self.recent.back()) else {
            return Gesture::Natural;
        };
        let dx = last[0] - first[0];
        let dy = last[1] - first[1];
        if dx.hypot(dy) < self.min_travel_px {
            return Gesture::Natural;
        }

        self.recent.clear();
        // image rows grow downward
        if dx.abs() >= dy.abs() {
            if dx > 0.0 { Gesture::Right } else { Gesture::Left }
        } else if dy < 0.0 {
            Gesture::Up
        } else {
            Gesture::Down
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_types::{CameraFrame, ColorImage, ColorPayload, Intrinsics, Transform};

    fn frame_at(ts: Timestamp) -> ColorFrame {
        let payload = ColorPayload {
            image: ColorImage::filled(640, 360, [0, 0, 0]),
            intrinsics: Intrinsics::identity(),
        };
        CameraFrame::new(ts, Transform::identity(), payload)
    }

    fn tip_at(x: f64, y: f64) -> HandLandmarks {
        let mut points = vec![[0.0, 0.0, 1.0]; HAND_LANDMARK_COUNT];
        points[8] = [x, y, 1.0];
        HandLandmarks(points)
    }

    #[test]
    fn scripted_hand_hides_then_rests_then_swipes() {
        let mut hand = ScriptedHand::new(4.0, 1.0, 0.5, 200.0);
        assert!(hand.detect(&frame_at(500_000_000)).is_none());

        let rest = hand.detect(&frame_at(2_000_000_000)).unwrap();
        assert_eq!(rest.len(), HAND_LANDMARK_COUNT);
        let wrist = rest.get(0).unwrap();
        assert_eq!([wrist[0], wrist[1]], [320.0, 250.0]);

        // end of the first period: swiping up
        let late = hand.detect(&frame_at(3_999_000_000)).unwrap();
        assert!(late.get(8).unwrap()[1] < rest.get(8).unwrap()[1] - 150.0);
    }

    #[test]
    fn scripted_hand_needs_image_data() {
        let mut hand = ScriptedHand::new(4.0, 1.0, 0.5, 200.0);
        let payload = ColorPayload {
            image: ColorImage::filled(0, 0, [0, 0, 0]),
            intrinsics: Intrinsics::identity(),
        };
        let blank = CameraFrame::new(2_000_000_000, Transform::identity(), payload);
        assert!(hand.detect(&blank).is_none());
        assert!(hand.detect(&frame_at(2_000_000_000)).is_some());
    }

    #[test]
    fn swipe_classifier_reads_direction_from_tip_travel() {
        let mut c = SwipeClassifier::new(8, 4, 100.0);
        assert_eq!(c.classify(&tip_at(100.0, 100.0)), Gesture::Natural);
        assert_eq!(c.classify(&tip_at(150.0, 105.0)), Gesture::Natural);
        assert_eq!(c.classify(&tip_at(230.0, 110.0)), Gesture::Right);
        // window restarted: a lone sample is not a swipe
        assert_eq!(c.classify(&tip_at(230.0, 110.0)), Gesture::Natural);
        assert_eq!(c.classify(&tip_at(230.0, -10.0)), Gesture::Up);
    }

    #[test]
    fn swipe_classifier_ignores_hands_without_the_tip() {
        let mut c = SwipeClassifier::new(8, 4, 10.0);
        assert_eq!(c.classify(&HandLandmarks(vec![[0.0; 3]; 5])), Gesture::Natural);
    }
}
