//! UDP datagram source

use std::net::SocketAddr;

use contracts::{ContractError, DatagramSource};
use tokio::net::UdpSocket;
use tracing::{debug, instrument, trace};

/// Datagram source backed by a bound tokio `UdpSocket`
#[derive(Debug)]
pub struct UdpDatagramSource {
    name: String,
    socket: UdpSocket,
}

impl UdpDatagramSource {
    /// Bind to `addr` (e.g. "0.0.0.0:12345", or port 0 for an ephemeral port)
    #[instrument(name = "udp_source_bind", skip(addr), fields(addr = %addr))]
    pub async fn bind(addr: &str) -> Result<Self, ContractError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| ContractError::transport_bind(addr, e.to_string()))?;
        let name = format!("udp:{}", socket.local_addr()?);
        debug!(source = %name, "UDP source bound");
        Ok(Self { name, socket })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramSource for UdpDatagramSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv_datagram(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let (len, peer) = self.socket.recv_from(buf).await?;
        trace!(source = %self.name, %peer, bytes = len, "datagram received");
        Ok(len)
    }
}
