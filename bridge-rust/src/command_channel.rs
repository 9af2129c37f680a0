//! command_channel.rs — UDP sender for headset commands
//!
//! One datagram per pipeline cycle to `host:command_port`. Fire-and-forget:
//! send errors are logged and the loop carries on. The host is resolved once,
//! at startup.

use std::io::{Error, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use fusion_types::OutboundPayload;
use tracing::{debug, warn};

/// Where each cycle's payload goes.
pub trait PayloadSink {
    fn send(&mut self, payload: &OutboundPayload);
}

pub struct CommandChannel {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl CommandChannel {
    /// Fails when `host` has no IPv4 address or the local socket cannot bind.
    pub fn new(host: &str, port: u16) -> Result<Self, Error> {
        let dest = (host, port)
            .to_socket_addrs()?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no IPv4 address for {host}")))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(false)?;
        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl PayloadSink for CommandChannel {
    fn send(&mut self, payload: &OutboundPayload) {
        let bytes = payload.encode();
        match self.socket.send_to(&bytes, self.dest) {
            Ok(_) => match payload {
                OutboundPayload::Gesture { gesture, .. } => {
                    debug!("UDP → {} gesture={gesture} ({} bytes)", self.dest, bytes.len())
                }
                OutboundPayload::Heartbeat { frame_counter } => {
                    debug!("UDP → {} heartbeat #{frame_counter}", self.dest)
                }
            },
            Err(e) => warn!("UDP: send to {} failed: {e}", self.dest),
        }
    }
}
