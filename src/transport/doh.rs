//! DNS-over-HTTPS client (RFC 8484)
//!
//! Queries go out as GET requests with the wire-format message in the `dns`
//! parameter, base64url encoded without padding:
//!
//! ```text
//! GET /dns-query?dns=AAEBAAABAAAAAAABBF9lbnMH... HTTP/2
//! Accept: application/dns-message
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tracing::debug;

use super::QueryTransport;
use crate::error::{ProveError, Result};

/// Media type for DNS wire-format messages (RFC 8484 §6)
const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

pub struct DohTransport {
    url: String,
    client: reqwest::Client,
}

impl DohTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ProveError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Full request URL for an encoded query.
    pub fn request_url(&self, query: &[u8]) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}dns={}", self.url, separator, URL_SAFE_NO_PAD.encode(query))
    }
}

#[async_trait]
impl QueryTransport for DohTransport {
    async fn send(&self, query: &[u8]) -> Result<Vec<u8>> {
        let url = self.request_url(query);
        debug!(url = %self.url, message_len = query.len(), "Sending DoH query");

        let response = self
            .client
            .get(&url)
            .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| ProveError::Transport(format!("DoH request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProveError::Transport(format!(
                "DoH server {} returned HTTP {}: {}",
                self.url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            ProveError::Transport(format!("Failed to read DoH response from {}: {}", self.url, e))
        })?;

        debug!(url = %self.url, response_len = body.len(), "DoH response received");
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "DoH"
    }
}
