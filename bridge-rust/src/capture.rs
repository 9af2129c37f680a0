//! capture.rs — frame buffers between the capture layer and the polling loop
//!
//! The capture side pushes frames from its own task; the polling loop only
//! peeks. Buffers are bounded and evict the oldest frame when full, so a slow
//! consumer always sees the most recent data.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use fusion_types::{CameraFrame, Timestamp};

/// Frames reserved up front; larger buffers grow on demand.
const PREALLOCATE_MAX: usize = 256;

/// Read side of a per-sensor frame stream.
pub trait FrameSource<P> {
    fn most_recent(&self) -> Option<CameraFrame<P>>;

    /// Frame whose timestamp is closest to `timestamp`; ties go to the older one.
    fn nearest(&self, timestamp: Timestamp) -> Option<CameraFrame<P>>;
}

/// Bounded, thread-safe ring buffer of frames in arrival order.
#[derive(Debug)]
pub struct FrameBuffer<P> {
    inner: Arc<Mutex<VecDeque<CameraFrame<P>>>>,
    capacity: usize,
}

impl<P> Clone for FrameBuffer<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), capacity: self.capacity }
    }
}

impl<P: Clone> FrameBuffer<P> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOCATE_MAX)))),
            capacity,
        }
    }

    // A producer that panicked mid-push leaves a consistent deque behind.
    fn frames(&self) -> MutexGuard<'_, VecDeque<CameraFrame<P>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, frame: CameraFrame<P>) {
        let mut frames = self.frames();
        if frames.len() == self.capacity {
            frames.pop_front();
        }
        frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames().is_empty()
    }
}

impl<P: Clone> FrameSource<P> for FrameBuffer<P> {
    fn most_recent(&self) -> Option<CameraFrame<P>> {
        self.frames().back().cloned()
    }

    fn nearest(&self, timestamp: Timestamp) -> Option<CameraFrame<P>> {
        let frames = self.frames();
        let mut best: Option<&CameraFrame<P>> = None;
        for frame in frames.iter() {
            let closer = match best {
                None => true,
                Some(b) => frame.timestamp.abs_diff(timestamp) < b.timestamp.abs_diff(timestamp),
            };
            if closer {
                best = Some(frame);
            }
        }
        best.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_types::Transform;

    fn frame(ts: Timestamp) -> CameraFrame<u32> {
        CameraFrame::new(ts, Transform::identity(), ts as u32)
    }

    #[test]
    fn evicts_oldest_when_full() {
        let buf = FrameBuffer::new(3);
        for ts in [10, 20, 30, 40] {
            buf.push(frame(ts));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.nearest(0).map(|f| f.timestamp), Some(20));
        assert_eq!(buf.most_recent().map(|f| f.timestamp), Some(40));
    }

    #[test]
    fn nearest_prefers_closest_then_older() {
        let buf = FrameBuffer::new(8);
        for ts in [100, 200, 300] {
            buf.push(frame(ts));
        }
        assert_eq!(buf.nearest(260).map(|f| f.timestamp), Some(300));
        assert_eq!(buf.nearest(150).map(|f| f.timestamp), Some(100));
        assert_eq!(buf.nearest(10_000).map(|f| f.timestamp), Some(300));
    }

    #[test]
    fn empty_buffer_has_no_frames() {
        let buf: FrameBuffer<u32> = FrameBuffer::new(4);
        assert!(buf.is_empty());
        assert!(buf.most_recent().is_none());
        assert!(buf.nearest(5).is_none());
    }

    #[test]
    fn clones_share_storage() {
        let producer = FrameBuffer::new(4);
        let consumer = producer.clone();
        producer.push(frame(7));
        assert_eq!(consumer.most_recent().map(|f| f.payload), Some(7));
    }
}
