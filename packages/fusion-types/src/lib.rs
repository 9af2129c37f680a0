//! # fusion-types
//!
//! Shared geometry, frame, calibration and wire types for the hand bridge.
//!
//! These types are used by:
//! - `bridge-rust`: synchronizing depth/color frames, reprojecting depth into the
//!   color image and encoding outbound command datagrams
//! - `packages/headset-sim`: decoding command datagrams on the headset side
//!
//! ## Coordinate Conventions
//!
//! - **Sensor frame**: camera-local, X = right, Y = down, Z = forward (optical axis)
//! - **Rig frame**: the sensor's rig node; `extrinsics` map sensor → rig
//! - **World frame**: the headset tracker's world; `pose` maps rig → world
//! - **Image frame**: pixel column/row, origin top-left
//!
//! All [`Transform`]s use column vectors, so `a.compose(&b)` applies `b` first.

pub mod calibration;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod wire;

pub use calibration::{Calibration, CalibrationStore, ColorCalibration, RayGrid};
pub use error::FusionError;
pub use frame::{CameraFrame, ColorFrame, ColorImage, ColorPayload, DepthFrame, DepthImage, Timestamp};
pub use geometry::{Intrinsics, Transform};
pub use gesture::{Gesture, HandLandmarks, Landmark, HAND_LANDMARK_COUNT};
pub use wire::{OutboundPayload, COMMAND_PORT, HEARTBEAT_SENTINEL};
