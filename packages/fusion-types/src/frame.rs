//! frame.rs — frames delivered by the capture layer
//!
//! Image payloads sit behind `Arc` so ring buffers and the polling loop can
//! share a frame without copying the pixels.

use std::sync::Arc;

use crate::error::FusionError;
use crate::geometry::{Intrinsics, Transform};

/// Device timestamp in ticks. The synthetic headset uses nanoseconds.
pub type Timestamp = u64;

/// One captured frame: timestamp, rig → world pose, and the sensor payload.
#[derive(Debug, Clone)]
pub struct CameraFrame<P> {
    pub timestamp: Timestamp,
    pub pose: Transform,
    pub payload: P,
}

impl<P> CameraFrame<P> {
    pub fn new(timestamp: Timestamp, pose: Transform, payload: P) -> Self {
        Self { timestamp, pose, payload }
    }

    pub fn has_valid_pose(&self) -> bool {
        self.pose.is_valid_pose()
    }
}

pub type DepthFrame = CameraFrame<DepthImage>;
pub type ColorFrame = CameraFrame<ColorPayload>;

// ── Depth ────────────────────────────────────────────────────────────────────

/// Raw depth samples, row-major. Zero means "no return".
#[derive(Debug, Clone)]
pub struct DepthImage {
    width: usize,
    height: usize,
    data: Arc<[u16]>,
}

impl DepthImage {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self, FusionError> {
        if data.len() != width * height {
            return Err(FusionError::ImageSize {
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data: data.into() })
    }

    /// All-zero image.
    pub fn empty(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0u16; width * height].into() }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples(&self) -> &[u16] {
        &self.data
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> u16 {
        self.data[v * self.width + u]
    }
}

// ── Color ────────────────────────────────────────────────────────────────────

/// Packed 8-bit BGR pixels, row-major.
#[derive(Debug, Clone)]
pub struct ColorImage {
    width: usize,
    height: usize,
    pixels: Arc<[u8]>,
}

impl ColorImage {
    pub fn new(width: usize, height: usize, pixels: Arc<[u8]>) -> Result<Self, FusionError> {
        if pixels.len() != width * height * 3 {
            return Err(FusionError::ImageSize {
                expected: width * height * 3,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Solid-color image.
    pub fn filled(width: usize, height: usize, bgr: [u8; 3]) -> Self {
        let pixels: Vec<u8> = bgr.iter().copied().cycle().take(width * height * 3).collect();
        Self { width, height, pixels: pixels.into() }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Color frame payload. The color camera autofocuses, so its intrinsics travel
/// with every frame instead of living in the calibration.
#[derive(Debug, Clone)]
pub struct ColorPayload {
    pub image: ColorImage,
    pub intrinsics: Intrinsics,
}
