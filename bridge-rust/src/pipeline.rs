//! pipeline.rs — one polling cycle
//!
//! sync → (every n-th pair) reproject → detect hand → gesture → dispatch → send.
//! Each stage can end the cycle early; only a cycle that reaches dispatch emits a
//! payload, and then exactly one.

use std::time::Instant;

use tracing::{debug, trace, warn};

use fusion_types::{ColorPayload, DepthImage};

use crate::capture::FrameSource;
use crate::command_channel::PayloadSink;
use crate::dispatch::DispatchController;
use crate::frame_sync::{FrameSync, SyncMiss};
use crate::gesture::GesturePipeline;
use crate::hand::HandTracker;
use crate::reprojector::{AlignedDepthMap, Reprojector};

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    NoData(SyncMiss),
    NoHand,
    /// Detector output without the tracked fingertip.
    Malformed,
    Sent { gesture: bool },
}

pub struct Pipeline<D, C> {
    sync: FrameSync<D, C>,
    reprojector: Option<Reprojector>,
    depth_every: u64,
    synced_cycles: u64,
    aligned: Option<AlignedDepthMap>,
    tracker: Box<dyn HandTracker>,
    gestures: GesturePipeline,
    dispatch: DispatchController,
    sink: Box<dyn PayloadSink>,
    frame_counter: u64,
}

impl<D, C> Pipeline<D, C>
where
    D: FrameSource<DepthImage>,
    C: FrameSource<ColorPayload>,
{
    /// `reprojector` runs on every `depth_every`-th synchronized pair; pass
    /// `None` or `0` to skip depth alignment entirely.
    pub fn new(
        sync: FrameSync<D, C>,
        reprojector: Option<Reprojector>,
        depth_every: u32,
        tracker: Box<dyn HandTracker>,
        gestures: GesturePipeline,
        dispatch: DispatchController,
        sink: Box<dyn PayloadSink>,
    ) -> Self {
        let reprojector = reprojector.filter(|_| depth_every > 0);
        Self {
            sync,
            reprojector,
            depth_every: depth_every as u64,
            synced_cycles: 0,
            aligned: None,
            tracker,
            gestures,
            dispatch,
            sink,
            frame_counter: 0,
        }
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Most recent depth map aligned to the color image.
    pub fn aligned_depth(&self) -> Option<&AlignedDepthMap> {
        self.aligned.as_ref()
    }

    pub fn dispatch(&self) -> &DispatchController {
        &self.dispatch
    }

    pub fn step(&mut self, now: Instant) -> CycleOutcome {
        self.frame_counter += 1;

        let pair = match self.sync.next_pair() {
            Ok(pair) => pair,
            Err(miss) => return CycleOutcome::NoData(miss),
        };
        self.synced_cycles += 1;

        if let Some(reprojector) = &self.reprojector {
            if self.synced_cycles % self.depth_every == 0 {
                match reprojector.reproject(&pair.depth, &pair.color) {
                    Ok((map, stats)) => {
                        debug!(
                            "Depth {} → {} px aligned: {} drawn, {} behind, {} out of bounds, coverage {:.1}%",
                            pair.depth.timestamp,
                            pair.color.timestamp,
                            stats.drawn,
                            stats.behind_camera,
                            stats.out_of_bounds,
                            map.coverage() * 100.0
                        );
                        self.aligned = Some(map);
                    }
                    Err(e) => warn!("Reprojection skipped: {e}"),
                }
            }
        }

        let Some(hand) = self.tracker.detect(&pair.color) else {
            return CycleOutcome::NoHand;
        };
        let Some(gesture) = self.gestures.process(&hand) else {
            return CycleOutcome::Malformed;
        };
        trace!("Fingertip trail: {:?}", self.gestures.trail().markers());

        let payload = self.dispatch.decide(now, self.frame_counter, gesture, &hand);
        self.sink.send(&payload);
        CycleOutcome::Sent { gesture: payload.is_gesture() }
    }
}
