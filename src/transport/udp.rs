use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::QueryTransport;
use crate::error::{ProveError, Result};

/// Largest datagram accepted; matches the advertised EDNS0 payload size with
/// headroom for servers that ignore it.
const MAX_DATAGRAM_SIZE: usize = 65535;

/// Plain DNS over UDP to a single recursive resolver.
pub struct UdpTransport {
    server: SocketAddr,
    timeout: Duration,
}

impl UdpTransport {
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}

#[async_trait]
impl QueryTransport for UdpTransport {
    async fn send(&self, query: &[u8]) -> Result<Vec<u8>> {
        let bind_addr: SocketAddr = if self.server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ProveError::Transport(format!("Failed to bind UDP socket: {}", e)))?;
        socket
            .connect(self.server)
            .await
            .map_err(|e| ProveError::Transport(format!("Failed to connect to {}: {}", self.server, e)))?;

        debug!(server = %self.server, message_len = query.len(), "Sending UDP query");
        socket
            .send(query)
            .await
            .map_err(|e| ProveError::Transport(format!("Failed to send to {}: {}", self.server, e)))?;

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let len = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| ProveError::Transport(format!("Query to {} timed out", self.server)))?
            .map_err(|e| ProveError::Transport(format!("Failed to receive from {}: {}", self.server, e)))?;
        buf.truncate(len);

        if len < 12 || query.len() < 2 || buf[..2] != query[..2] {
            return Err(ProveError::Transport(format!(
                "Unexpected response from {}",
                self.server
            )));
        }
        // TC bit: the signed data did not fit
        if buf[2] & 0x02 != 0 {
            warn!(server = %self.server, "UDP response truncated");
            return Err(ProveError::Transport(format!(
                "Truncated response from {}",
                self.server
            )));
        }

        debug!(server = %self.server, response_len = len, "UDP response received");
        Ok(buf)
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}
