//! listener.rs — datagram accounting for the receiver

use std::collections::BTreeMap;

use fusion_types::{FusionError, Gesture, OutboundPayload};

#[derive(Debug, Default)]
pub struct ReceiverStats {
    pub heartbeats: u64,
    pub malformed: u64,
    /// Gesture payloads per label, keyed by wire index.
    pub gestures: BTreeMap<i32, u64>,
    pub last_frame: Option<u64>,
}

impl ReceiverStats {
    /// Decode one datagram and count it.
    pub fn record(&mut self, data: &[u8]) -> Result<OutboundPayload, FusionError> {
        let payload = match OutboundPayload::decode(data) {
            Ok(p) => p,
            Err(e) => {
                self.malformed += 1;
                return Err(e);
            }
        };
        match &payload {
            OutboundPayload::Heartbeat { frame_counter } => {
                self.heartbeats += 1;
                self.last_frame = Some(*frame_counter);
            }
            OutboundPayload::Gesture { gesture, .. } => {
                *self.gestures.entry(gesture.index()).or_default() += 1;
            }
        }
        Ok(payload)
    }

    pub fn total_gestures(&self) -> u64 {
        self.gestures.values().sum()
    }

    pub fn summary(&self) -> String {
        let labels: Vec<String> = self
            .gestures
            .iter()
            .map(|(i, n)| format!("{}={n}", Gesture::from_index(*i)))
            .collect();
        format!(
            "heartbeats={} gestures={} [{}] malformed={}",
            self.heartbeats,
            self.total_gestures(),
            labels.join(" "),
            self.malformed
        )
    }
}
