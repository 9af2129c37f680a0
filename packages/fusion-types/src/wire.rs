//! wire.rs — command datagram layout
//!
//! Every value is a little-endian `f64`:
//!
//! | Payload | Layout | Size |
//! |---|---|---|
//! | Gesture | `x, y, z` per landmark, then the gesture index | `24·n + 8` |
//! | Heartbeat | frame counter, then `-1.0` | 16 |
//!
//! The sizes never collide (16 is not `8 mod 24`), so the receiver can tell the
//! two apart from the length alone.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FusionError;
use crate::gesture::{Gesture, HandLandmarks};

/// Headset UDP port for command datagrams.
pub const COMMAND_PORT: u16 = 5005;

/// Index value marking a heartbeat.
pub const HEARTBEAT_SENTINEL: f64 = -1.0;

const F64_LEN: usize = 8;
const LANDMARK_LEN: usize = 3 * F64_LEN;
const HEARTBEAT_LEN: usize = 2 * F64_LEN;

/// Exactly one of these leaves the bridge per processed cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    Gesture { landmarks: HandLandmarks, gesture: Gesture },
    Heartbeat { frame_counter: u64 },
}

impl OutboundPayload {
    pub fn is_gesture(&self) -> bool {
        matches!(self, Self::Gesture { .. })
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Gesture { landmarks, .. } => landmarks.len() * LANDMARK_LEN + F64_LEN,
            Self::Heartbeat { .. } => HEARTBEAT_LEN,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        match self {
            Self::Gesture { landmarks, gesture } => {
                for v in landmarks.flattened() {
                    buf.put_f64_le(*v);
                }
                buf.put_f64_le(gesture.index() as f64);
            }
            Self::Heartbeat { frame_counter } => {
                buf.put_f64_le(*frame_counter as f64);
                buf.put_f64_le(HEARTBEAT_SENTINEL);
            }
        }
        buf.freeze()
    }

    pub fn decode(mut data: &[u8]) -> Result<Self, FusionError> {
        let len = data.len();
        if len == HEARTBEAT_LEN {
            let counter = data.get_f64_le();
            let sentinel = data.get_f64_le();
            if sentinel != HEARTBEAT_SENTINEL {
                return Err(FusionError::HeartbeatSentinel(sentinel));
            }
            return Ok(Self::Heartbeat { frame_counter: counter as u64 });
        }

        if len < F64_LEN || (len - F64_LEN) % LANDMARK_LEN != 0 {
            return Err(FusionError::PayloadLength(len));
        }
        let count = (len - F64_LEN) / LANDMARK_LEN;
        let mut landmarks = Vec::with_capacity(count);
        for _ in 0..count {
            landmarks.push([data.get_f64_le(), data.get_f64_le(), data.get_f64_le()]);
        }
        let gesture = Gesture::from_index(data.get_f64_le() as i32);
        Ok(Self::Gesture { landmarks: HandLandmarks(landmarks), gesture })
    }
}
