//! OSC over UDP
//!
//! The codec itself is `rosc`; this module only moves encoded packets
//! through tokio sockets. Everything that sends goes through
//! [`MessageSink`] so the repeater and replay paths can be driven against
//! an in-memory sink in tests.

use std::net::SocketAddr;

use async_trait::async_trait;
use rosc::{OscMessage, OscPacket};
use tokio::net::{lookup_host, UdpSocket};
use tracing::trace;

/// Largest datagram we accept.
const MAX_DATAGRAM: usize = rosc::decoder::MTU;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not resolve {0}")]
    Resolve(String),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode OSC packet: {0}")]
    Encode(String),

    #[error("failed to decode OSC packet from {peer}: {message}")]
    Decode { peer: SocketAddr, message: String },
}

/// Something that can deliver an OSC message.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, msg: OscMessage) -> Result<(), TransportError>;
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| TransportError::Resolve(format!("{}:{}", host, port)))
}

/// Sends to one fixed destination from an ephemeral local port.
#[derive(Debug)]
pub struct UdpSender {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpSender {
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let destination = resolve(host, port).await?;
        let local: SocketAddr = if destination.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket,
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

#[async_trait]
impl MessageSink for UdpSender {
    async fn send(&self, msg: OscMessage) -> Result<(), TransportError> {
        let bytes = rosc::encoder::encode(&OscPacket::Message(msg))
            .map_err(|e| TransportError::Encode(format!("{:?}", e)))?;
        self.socket.send_to(&bytes, self.destination).await?;
        Ok(())
    }
}

/// Receives OSC datagrams on a bound UDP port.
#[derive(Debug)]
pub struct OscListener {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl OscListener {
    pub async fn bind(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = resolve(host, port).await?;
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for one datagram and return the messages it carries.
    ///
    /// Bundles are flattened depth-first; their time tags are ignored.
    pub async fn recv(&mut self) -> Result<Vec<OscMessage>, TransportError> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        trace!(len, %peer, "datagram");

        let (_rest, packet) =
            rosc::decoder::decode_udp(&self.buf[..len]).map_err(|e| TransportError::Decode {
                peer,
                message: format!("{:?}", e),
            })?;

        let mut messages = Vec::new();
        flatten(packet, &mut messages);
        Ok(messages)
    }
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}
