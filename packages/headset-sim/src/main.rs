//! main.rs — hl-sim, headset-side command receiver
//!
//! Binds the command port and logs every datagram the bridge sends: gestures
//! at info, heartbeats at debug. Bad datagrams are logged and dropped.

mod listener;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use fusion_types::OutboundPayload;

use listener::ReceiverStats;

#[derive(Parser, Debug)]
#[command(name = "hl-sim", about = "Stand-in headset that receives hand-bridge commands")]
struct Args {
    /// UDP address to listen on
    #[arg(long, default_value = "0.0.0.0:5005")]
    bind: String,
    /// Seconds between summary lines
    #[arg(long, default_value = "10")]
    summary_s: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hl_sim=info".into()),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("hl-sim failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let socket = UdpSocket::bind(&args.bind)
        .await
        .with_context(|| format!("binding UDP {}", args.bind))?;
    info!("🥽 hl-sim listening on UDP {}", args.bind);

    let mut stats = ReceiverStats::default();
    let mut summary = tokio::time::interval(Duration::from_secs(args.summary_s.max(1)));
    summary.tick().await;
    let mut buf = vec![0u8; 65536];

    loop {
        tokio::select! {
            recv = socket.recv_from(&mut buf) => match recv {
                Ok((len, src)) => match stats.record(&buf[..len]) {
                    Ok(OutboundPayload::Gesture { landmarks, gesture }) => {
                        let tip = landmarks.get(8).map(|p| format!("({:.0}, {:.0})", p[0], p[1]));
                        info!(
                            "👉 {src}: gesture '{gesture}' (index {}, {} landmarks, tip {})",
                            gesture.index(),
                            landmarks.len(),
                            tip.as_deref().unwrap_or("-")
                        );
                    }
                    Ok(OutboundPayload::Heartbeat { frame_counter }) => {
                        debug!("{src}: heartbeat #{frame_counter}");
                    }
                    Err(e) => warn!("{src}: dropped {len}-byte datagram: {e}"),
                },
                // Never crash — log and continue
                Err(e) => warn!("UDP recv error: {e}"),
            },
            _ = summary.tick() => info!("📊 {}", stats.summary()),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Final: {}", stats.summary());
    Ok(())
}
