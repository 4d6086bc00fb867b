use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::debug;

use super::QueryTransport;
use crate::error::Result;

/// Upper bound on a single backoff delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retries failed queries on the wrapped transport with jittered exponential
/// backoff: `base`, `2*base`, `4*base`, ... up to `max_retries` extra attempts.
pub struct RetryingTransport {
    inner: Arc<dyn QueryTransport>,
    max_retries: usize,
    base_delay: Duration,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn QueryTransport>, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let base_ms = (self.base_delay.as_millis() as u64).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(base_ms / 2 + base_ms % 2)
            .max_delay(MAX_RETRY_DELAY)
            .map(jitter)
            .take(self.max_retries)
    }
}

#[async_trait]
impl QueryTransport for RetryingTransport {
    async fn send(&self, query: &[u8]) -> Result<Vec<u8>> {
        let inner = &self.inner;
        let mut attempt = 0usize;
        Retry::spawn(self.strategy(), || {
            attempt += 1;
            let current = attempt;
            async move {
                let result = inner.send(query).await;
                if let Err(e) = &result {
                    debug!(transport = inner.name(), attempt = current, error = %e, "Query attempt failed");
                }
                result
            }
        })
        .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
