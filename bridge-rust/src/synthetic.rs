//! synthetic.rs — stand-in headset sensor streams
//!
//! Runs two producer tasks, depth and color, each pushing frames into its ring
//! buffer at the configured rate. Depth shows a flat wall with a hand-sized
//! blob in front of it; color is a flat gray image with jittering autofocus
//! intrinsics. The head sways slowly in yaw and occasionally loses tracking.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use fusion_types::{
    Calibration, CalibrationStore, CameraFrame, ColorImage, ColorPayload, DepthImage, FusionError,
    Intrinsics, Timestamp, Transform,
};

use crate::capture::FrameBuffer;
use crate::config::CaptureConfig;

const WALL_DISTANCE_M: f64 = 0.9;
const HAND_DISTANCE_M: f64 = 0.45;
/// Hand blob radius as a fraction of the depth image width.
const HAND_RADIUS_FRAC: f64 = 0.12;
const DEPTH_NOISE_M: f64 = 0.004;
/// Precomputed noisy depth images, cycled through.
const DEPTH_VARIANTS: usize = 4;

const SWAY_AMPLITUDE_RAD: f64 = 0.05;
const SWAY_PERIOD_S: f64 = 6.0;

const FOCAL_PER_WIDTH: f64 = 1.15;
const FOCUS_JITTER_PX: f64 = 0.5;

/// Rig pose at `t_s` seconds after start.
pub fn head_pose(t_s: f64) -> Transform {
    let yaw = SWAY_AMPLITUDE_RAD * (std::f64::consts::TAU * t_s / SWAY_PERIOD_S).sin();
    Transform::rotation_y(yaw)
}

/// Pose reported while tracking is lost.
pub fn lost_pose() -> Transform {
    Transform::from_rows([[0.0; 4]; 4])
}

/// One depth image of the scene. Samples are radial distances, so a flat wall
/// reads farther toward the image corners. Distances past the aliasing limit
/// read as zero.
pub fn render_depth<R: Rng + ?Sized>(
    calibration: &Calibration,
    noise: Option<(&Normal<f64>, &mut R)>,
) -> Result<DepthImage, FusionError> {
    let (w, h) = (calibration.width(), calibration.height());
    let hand_radius = w as f64 * HAND_RADIUS_FRAC;
    let (hx, hy) = (w as f64 / 2.0, h as f64 / 2.0);
    let max_raw = calibration.alias() as f64;
    let mut noise = noise;

    let mut data = Vec::with_capacity(w * h);
    for v in 0..h {
        for u in 0..w {
            let in_hand = (u as f64 - hx).hypot(v as f64 - hy) < hand_radius;
            let z = if in_hand { HAND_DISTANCE_M } else { WALL_DISTANCE_M };
            let [x, y] = calibration.uv2xy(u, v);
            let mut radial = z * (x * x + y * y + 1.0).sqrt();
            if let Some((dist, rng)) = noise.as_mut() {
                radial += dist.sample(&mut **rng);
            }
            let raw = radial / calibration.scale();
            data.push(if raw > 0.0 && raw < max_raw { raw.round() as u16 } else { 0 });
        }
    }
    DepthImage::new(w, h, data)
}

/// Color intrinsics at rest for a `width × height` image.
pub fn nominal_intrinsics(width: usize, height: usize) -> Intrinsics {
    let f = width as f64 * FOCAL_PER_WIDTH;
    Intrinsics::new(f, f, width as f64 / 2.0, height as f64 / 2.0)
}

fn frame_period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

fn pose_or_lost(rng: &mut StdRng, loss_rate: f64, t_s: f64) -> Transform {
    if loss_rate > 0.0 && rng.gen_bool(loss_rate) {
        lost_pose()
    } else {
        head_pose(t_s)
    }
}

fn stamp(start: Instant) -> (Timestamp, f64) {
    let elapsed = start.elapsed();
    (elapsed.as_nanos() as Timestamp, elapsed.as_secs_f64())
}

pub struct SyntheticHeadset {
    tasks: Vec<JoinHandle<()>>,
}

impl SyntheticHeadset {
    /// Start both sensor streams. Must be called inside a Tokio runtime.
    pub fn spawn(
        capture: &CaptureConfig,
        calibration: &CalibrationStore,
        depth: FrameBuffer<DepthImage>,
        color: FrameBuffer<ColorPayload>,
    ) -> Result<Self, FusionError> {
        let start = Instant::now();
        let loss_rate = capture.tracking_loss_rate;

        let mut rng = StdRng::from_entropy();
        let noise = Normal::new(0.0, DEPTH_NOISE_M).ok();
        let mut depth_images = Vec::with_capacity(DEPTH_VARIANTS);
        for _ in 0..DEPTH_VARIANTS {
            let image = match &noise {
                Some(n) => render_depth(&calibration.depth, Some((n, &mut rng)))?,
                None => render_depth::<StdRng>(&calibration.depth, None)?,
            };
            depth_images.push(image);
        }
        info!(
            "🥽 Synthetic headset: depth {}x{} @ {} fps, color {}x{} @ {} fps",
            calibration.depth.width(),
            calibration.depth.height(),
            capture.depth_fps,
            capture.color_width,
            capture.color_height,
            capture.color_fps
        );

        let depth_period = frame_period(capture.depth_fps);
        let depth_task = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut ticker = interval(depth_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut n = 0usize;
            loop {
                ticker.tick().await;
                let (ts, t_s) = stamp(start);
                let pose = pose_or_lost(&mut rng, loss_rate, t_s);
                let image = depth_images[n % depth_images.len()].clone();
                depth.push(CameraFrame::new(ts, pose, image));
                n += 1;
            }
        });

        let (w, h) = (capture.color_width, capture.color_height);
        let image = ColorImage::filled(w, h, [48, 48, 48]);
        let nominal = nominal_intrinsics(w, h);
        let color_period = frame_period(capture.color_fps);
        let color_task = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let jitter = Normal::new(0.0, FOCUS_JITTER_PX).ok();
            let mut ticker = interval(color_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let (ts, t_s) = stamp(start);
                let pose = pose_or_lost(&mut rng, loss_rate, t_s);
                let df = jitter.map_or(0.0, |j| j.sample(&mut rng));
                let intrinsics =
                    Intrinsics::new(nominal.fx + df, nominal.fy + df, nominal.cx, nominal.cy);
                color.push(CameraFrame::new(ts, pose, ColorPayload { image: image.clone(), intrinsics }));
            }
        });

        Ok(Self { tasks: vec![depth_task, color_task] })
    }

    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!("Synthetic headset stopped");
    }
}

impl Drop for SyntheticHeadset {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
