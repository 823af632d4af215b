use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::info;

use crate::encoder::EncodedRecord;
use crate::error::SinkError;
use crate::sinks::Sink;

/// Sends every record as one UDP datagram to a fixed destination.
///
/// The socket is bound once, when the sink is created, and released when the
/// sink is dropped. Sends are fire and forget: nothing is read back, and a
/// missing listener is only noticed if the OS happens to report it.
pub struct BroadcastSink {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl BroadcastSink {
    /// Broadcasts to `port` on the loopback interface.
    pub async fn bind(port: u16) -> io::Result<Self> {
        Self::bind_to(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await
    }

    pub async fn bind_to(destination: SocketAddr) -> io::Result<Self> {
        let local = match destination {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local).await?;
        info!(
            local = %socket.local_addr()?,
            %destination,
            "broadcast socket bound"
        );
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
impl Sink for BroadcastSink {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn deliver(&self, record: &EncodedRecord) -> Result<(), SinkError> {
        let len = record.len();
        let sent = self
            .socket
            .send_to(record.as_bytes(), self.destination)
            .await?;
        if sent < len {
            return Err(SinkError::Truncated { sent, len });
        }
        Ok(())
    }
}
