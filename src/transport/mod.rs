//! Query transports
//!
//! A transport carries one encoded DNS query to a recursive resolver and
//! returns the encoded response. Implementations:
//! - DNS-over-HTTPS GET (RFC 8484)
//! - plain UDP (RFC 1035)
//! - a retrying wrapper with exponential backoff
//!
//! Transports never interpret responses; validation happens in the chain
//! resolver, which trusts only signed data.

pub mod doh;
pub mod retry;
pub mod udp;

pub use doh::DohTransport;
pub use retry::RetryingTransport;
pub use udp::UdpTransport;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Send an encoded query and return the encoded response.
    async fn send(&self, query: &[u8]) -> Result<Vec<u8>>;

    fn name(&self) -> &'static str;
}
