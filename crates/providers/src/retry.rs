//! Retry policy for outbound model calls — exponential backoff over an
//! explicit set of retryable HTTP status classes.
//!
//! The policy wraps any `ModelProvider`; it never touches session state.
//! Non-retryable failures and exhausted attempts propagate the original
//! error unchanged.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use agentloom_core::error::ProviderError;
use agentloom_core::provider::{ModelProvider, ModelReply, ModelRequest};

/// Transient-failure retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries, including the first attempt.
    pub attempts: u32,

    /// Exponential backoff base.
    pub exp_base: f64,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// HTTP status codes considered transient.
    pub retryable_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            exp_base: 2.0,
            initial_delay: Duration::from_secs(1),
            retryable_status: vec![429, 500, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Whether this failure class warrants another attempt.
    pub fn is_retryable(&self, error: &ProviderError) -> bool {
        error
            .status_code()
            .is_some_and(|status| self.retryable_status.contains(&status))
    }

    /// Wait before attempt `attempt` (1-based; the first attempt has no wait):
    /// `initial_delay * exp_base^(attempt-1)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let factor = self.exp_base.powi(attempt.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor)
    }
}

/// A provider wrapper applying a `RetryPolicy` around every generate call.
pub struct RetryingProvider {
    inner: Arc<dyn ModelProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn ModelProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ModelProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ProviderError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.inner.generate(request.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.policy.attempts && self.policy.is_retryable(&e) => {
                    let delay = self.policy.delay_before(attempt);
                    warn!(
                        provider = self.inner.name(),
                        attempt,
                        max = self.policy.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(
                        provider = self.inner.name(),
                        attempt,
                        error = %e,
                        "Provider failure propagated"
                    );
                    return Err(e);
                }
            }
        }
    }
}
