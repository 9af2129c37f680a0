//! dispatch.rs — gesture debounce
//!
//! Two states. `Idle` forwards the first actionable gesture and enters
//! `Cooldown`; while cooling down, and for every neutral cycle, a heartbeat
//! goes out instead. The cooldown expires at the start of the first cycle at or
//! after its deadline.

use std::time::{Duration, Instant};

use fusion_types::{Gesture, HandLandmarks, OutboundPayload};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Cooldown { until: Instant },
}

pub struct DispatchController {
    cooldown: Duration,
    state: DispatchState,
}

impl DispatchController {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, state: DispatchState::Idle }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_cooling_down(&self) -> bool {
        matches!(self.state, DispatchState::Cooldown { .. })
    }

    /// Decide this cycle's payload. Always returns exactly one.
    pub fn decide(
        &mut self,
        now: Instant,
        frame_counter: u64,
        gesture: Gesture,
        hand: &HandLandmarks,
    ) -> OutboundPayload {
        if let DispatchState::Cooldown { until } = self.state {
            if now >= until {
                debug!("Cooldown finished");
                self.state = DispatchState::Idle;
            }
        }

        if self.state == DispatchState::Idle && gesture.is_actionable() {
            self.state = DispatchState::Cooldown { until: now + self.cooldown };
            info!("👋 Dispatching gesture '{gesture}' (frame {frame_counter})");
            return OutboundPayload::Gesture { landmarks: hand.clone(), gesture };
        }

        OutboundPayload::Heartbeat { frame_counter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand() -> HandLandmarks {
        HandLandmarks(vec![[1.0, 2.0, 3.0]; 21])
    }

    fn at(start: Instant, secs: f64) -> Instant {
        start + Duration::from_secs_f64(secs)
    }

    #[test]
    fn suppresses_repeat_inside_cooldown() {
        let t0 = Instant::now();
        let mut d = DispatchController::new(Duration::from_secs(2));
        let script = [
            (0.0, Gesture::Natural),
            (0.1, Gesture::Up),
            (0.2, Gesture::Natural),
            (0.3, Gesture::Up),
        ];
        let out: Vec<_> = script
            .iter()
            .enumerate()
            .map(|(i, (t, g))| d.decide(at(t0, *t), i as u64 + 1, *g, &hand()))
            .collect();

        assert_eq!(out[0], OutboundPayload::Heartbeat { frame_counter: 1 });
        assert_eq!(out[1], OutboundPayload::Gesture { landmarks: hand(), gesture: Gesture::Up });
        assert_eq!(out[2], OutboundPayload::Heartbeat { frame_counter: 3 });
        assert_eq!(out[3], OutboundPayload::Heartbeat { frame_counter: 4 });
        assert!(d.is_cooling_down());
    }

    #[test]
    fn cooldown_expires_at_deadline() {
        let t0 = Instant::now();
        let mut d = DispatchController::new(Duration::from_secs(2));
        assert!(d.decide(t0, 1, Gesture::Left, &hand()).is_gesture());
        assert!(!d.decide(at(t0, 1.999), 2, Gesture::Left, &hand()).is_gesture());
        assert!(d.decide(at(t0, 2.0), 3, Gesture::Right, &hand()).is_gesture());
    }

    #[test]
    fn neutral_never_starts_cooldown() {
        let t0 = Instant::now();
        let mut d = DispatchController::new(Duration::from_secs(2));
        for i in 0..50 {
            let p = d.decide(at(t0, i as f64 * 0.05), i, Gesture::Natural, &hand());
            assert!(!p.is_gesture());
            assert_eq!(d.state(), DispatchState::Idle);
        }
    }

    #[test]
    fn at_most_one_gesture_per_cooldown_window() {
        let t0 = Instant::now();
        let mut d = DispatchController::new(Duration::from_secs(2));
        let mut sent = Vec::new();
        // actionable gesture every 30 ms for 10 s, with neutral gaps
        for i in 0..334u64 {
            let t = i as f64 * 0.03;
            let g = if i % 7 == 3 { Gesture::Natural } else { Gesture::COMMANDS[(i % 7) as usize] };
            if d.decide(at(t0, t), i, g, &hand()).is_gesture() {
                sent.push(t);
            }
        }
        assert!(sent.len() >= 4);
        for pair in sent.windows(2) {
            assert!(pair[1] - pair[0] >= 2.0 - 1e-9, "{sent:?}");
        }
    }
}
