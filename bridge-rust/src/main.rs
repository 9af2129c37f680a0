//! main.rs — hand-bridge entry point
//!
//! Startup: config → calibration → frame buffers + synthetic headset → command
//! socket → polling loop. The loop runs one pipeline cycle per tick until
//! Ctrl-C.

mod capture;
mod command_channel;
mod config;
mod dispatch;
mod frame_sync;
mod gesture;
mod hand;
mod pipeline;
mod reprojector;
mod synthetic;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use fusion_types::CalibrationStore;

use capture::FrameBuffer;
use command_channel::CommandChannel;
use config::BridgeConfig;
use dispatch::DispatchController;
use frame_sync::FrameSync;
use gesture::GesturePipeline;
use hand::{ScriptedHand, SwipeClassifier};
use pipeline::{CycleOutcome, Pipeline};
use reprojector::Reprojector;
use synthetic::SyntheticHeadset;

// Scripted hand timetable: 4 s cycle, hidden for 1 s, swipes 400 px in 0.4 s.
const HAND_PERIOD_S: f64 = 4.0;
const HAND_HIDDEN_S: f64 = 1.0;
const HAND_SWIPE_S: f64 = 0.4;
const HAND_TRAVEL_PX: f64 = 400.0;

const STATUS_EVERY: u64 = 2000;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hand-bridge", about = "Depth/color fusion and gesture command bridge")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "bridge.toml")]
    config: PathBuf,
    /// Headset address (overrides headset.host)
    #[arg(long)]
    host: Option<String>,
    /// Headset command port (overrides headset.command_port)
    #[arg(long)]
    port: Option<u16>,
    /// Reproject every n-th synchronized pair, 0 to disable (overrides pipeline.depth_every)
    #[arg(long)]
    depth_every: Option<u32>,
}

impl Args {
    fn apply(&self, cfg: &mut BridgeConfig) {
        if let Some(host) = &self.host {
            cfg.headset.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.headset.command_port = port;
        }
        if let Some(n) = self.depth_every {
            cfg.pipeline.depth_every = n;
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hand_bridge=info".into()),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("hand-bridge failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = BridgeConfig::load(&args.config)?;
    args.apply(&mut cfg);

    let calibration = CalibrationStore::load(&cfg.headset.calibration_dir).with_context(|| {
        format!("loading calibration from {}", cfg.headset.calibration_dir.display())
    })?;
    let max_depth = calibration.depth.max_depth();
    info!(
        "📐 Depth {}x{}, range up to {max_depth:.3} m",
        calibration.depth.width(),
        calibration.depth.height()
    );
    let cap = &cfg.capture;
    if (cap.color_width, cap.color_height) != (calibration.color.width, calibration.color.height) {
        warn!(
            "Capture is {}x{} but color calibration is {}x{}; aligned depth follows the calibration",
            cap.color_width, cap.color_height, calibration.color.width, calibration.color.height
        );
    }

    let depth = FrameBuffer::new(cap.depth_capacity());
    let color = FrameBuffer::new(cap.color_capacity());
    let headset = SyntheticHeadset::spawn(cap, &calibration, depth.clone(), color.clone())
        .context("starting synthetic headset")?;

    let channel = CommandChannel::new(&cfg.headset.host, cfg.headset.command_port)
        .context("binding command socket")?;
    info!("📡 Sending commands to udp://{}", channel.dest());

    let p = &cfg.pipeline;
    let g = &cfg.gesture;
    let reprojector = (p.depth_every > 0).then(|| Reprojector::new(&calibration, p.raster));
    let mut pipeline = Pipeline::new(
        FrameSync::new(depth, color),
        reprojector,
        p.depth_every,
        Box::new(ScriptedHand::new(HAND_PERIOD_S, HAND_HIDDEN_S, HAND_SWIPE_S, HAND_TRAVEL_PX)),
        GesturePipeline::new(
            Box::new(SwipeClassifier::new(g.tip_landmark, g.swipe_window, g.swipe_min_px)),
            g.history_capacity,
            g.tip_landmark,
            p.gesture_enabled,
        ),
        DispatchController::new(Duration::from_secs_f64(g.cooldown_s)),
        Box::new(channel),
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        "✋ Bridge running: poll {} ms, depth every {}, raster {:?}, gestures {}",
        p.poll_interval_ms,
        p.depth_every,
        p.raster,
        if p.gesture_enabled { "on" } else { "off" }
    );

    let mut ticker = interval(Duration::from_millis(p.poll_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let (mut synced, mut gestures) = (0u64, 0u64);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = shutdown_rx.changed() => break,
        }

        match pipeline.step(Instant::now()) {
            CycleOutcome::NoData(_) => {}
            CycleOutcome::Sent { gesture } => {
                synced += 1;
                gestures += gesture as u64;
            }
            CycleOutcome::NoHand | CycleOutcome::Malformed => synced += 1,
        }

        let frame = pipeline.frame_counter();
        if frame % STATUS_EVERY == 0 {
            let nearest = pipeline.aligned_depth().and_then(|m| m.nearest());
            info!(
                "⏱ frame={frame} | synced={synced} | gestures={gestures} | cooldown={} | nearest={}/{max_depth:.3}m",
                pipeline.dispatch().is_cooling_down(),
                nearest.map_or_else(|| "-".to_string(), |z| format!("{z:.3}"))
            );
        }
    }

    headset.abort();
    info!("👋 Shutting down after {} frames", pipeline.frame_counter());
    Ok(())
}
