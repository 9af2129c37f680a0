//! gesture.rs — per-frame gesture stage
//!
//! Validates the detector output, keeps the fingertip trail, and asks the
//! classifier for a label. The trail only feeds visualization; classification
//! never reads it.

use std::collections::VecDeque;

use fusion_types::{Gesture, HandLandmarks};
use tracing::debug;

use crate::hand::GestureClassifier;

/// Fixed-capacity FIFO of recent fingertip positions, oldest first.
#[derive(Debug, Clone)]
pub struct TipTrail {
    capacity: usize,
    points: VecDeque<[f64; 2]>,
}

impl TipTrail {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, points: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, point: [f64; 2]) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.points.iter()
    }

    /// Marker radius per point for a fading trail: the oldest point is
    /// smallest. Empty until the trail holds at least two points.
    pub fn markers(&self) -> Vec<([f64; 2], u32)> {
        if self.points.len() < 2 {
            return Vec::new();
        }
        self.points.iter().enumerate().map(|(i, p)| (*p, i as u32)).collect()
    }
}

pub struct GesturePipeline {
    classifier: Box<dyn GestureClassifier>,
    trail: TipTrail,
    tip_landmark: usize,
    classify: bool,
}

impl GesturePipeline {
    pub fn new(
        classifier: Box<dyn GestureClassifier>,
        history_capacity: usize,
        tip_landmark: usize,
        classify: bool,
    ) -> Self {
        Self {
            classifier,
            trail: TipTrail::new(history_capacity),
            tip_landmark,
            classify,
        }
    }

    pub fn trail(&self) -> &TipTrail {
        &self.trail
    }

    /// `None` when the landmark array is too short to hold the tracked tip;
    /// the cycle is then skipped.
    pub fn process(&mut self, hand: &HandLandmarks) -> Option<Gesture> {
        let Some(tip) = hand.get(self.tip_landmark) else {
            debug!(
                "Malformed hand: {} landmarks, tip index {}",
                hand.len(),
                self.tip_landmark
            );
            return None;
        };
        self.trail.push([tip[0], tip[1]]);

        if !self.classify {
            return Some(Gesture::Natural);
        }
        Some(self.classifier.classify(hand))
    }
}
