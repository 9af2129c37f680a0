//! frame_sync.rs — pairs the newest depth frame with the nearest color frame
//!
//! A pair is only produced when both frames carry a valid tracker pose. Each
//! depth frame is considered at most once: polling again before a newer depth
//! frame arrives yields [`SyncMiss::StaleDepth`].

use fusion_types::frame::{ColorFrame, DepthFrame};
use fusion_types::{ColorPayload, DepthImage, Timestamp};

use crate::capture::FrameSource;

/// Why a poll produced no pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMiss {
    NoDepth,
    StaleDepth,
    InvalidDepthPose,
    NoColor,
    InvalidColorPose,
}

#[derive(Debug, Clone)]
pub struct FramePair {
    pub depth: DepthFrame,
    pub color: ColorFrame,
}

pub struct FrameSync<D, C> {
    depth: D,
    color: C,
    last_depth: Option<Timestamp>,
}

impl<D, C> FrameSync<D, C>
where
    D: FrameSource<DepthImage>,
    C: FrameSource<ColorPayload>,
{
    pub fn new(depth: D, color: C) -> Self {
        Self { depth, color, last_depth: None }
    }

    pub fn next_pair(&mut self) -> Result<FramePair, SyncMiss> {
        let depth = self.depth.most_recent().ok_or(SyncMiss::NoDepth)?;
        if self.last_depth.is_some_and(|last| depth.timestamp <= last) {
            return Err(SyncMiss::StaleDepth);
        }
        self.last_depth = Some(depth.timestamp);

        if !depth.has_valid_pose() {
            return Err(SyncMiss::InvalidDepthPose);
        }

        let color = self.color.nearest(depth.timestamp).ok_or(SyncMiss::NoColor)?;
        if !color.has_valid_pose() {
            return Err(SyncMiss::InvalidColorPose);
        }

        Ok(FramePair { depth, color })
    }
}
