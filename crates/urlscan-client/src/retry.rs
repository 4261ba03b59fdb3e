//! Rate-limit aware retry.
//!
//! urlscan answers an exhausted quota with HTTP 429 and tells the client how
//! long to back off in `X-Rate-Limit-Reset-After`. [`RetryPolicy`] honours
//! that hint, sleeping the calling task, and re-issues the request until it
//! gets a non-429 answer or runs out of attempts.

use crate::error::{ClientError, Result};
use crate::transport::RawResponse;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use urlscan_core::RetryConfig;

const TOO_MANY_REQUESTS: u16 = 429;

/// Retry behaviour for rate-limited requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    enabled: bool,
    max_attempts: u32,
    fallback_delay: Duration,
}

/// Per-request bookkeeping, dropped once the request settles.
#[derive(Debug)]
struct RetryState {
    attempts: u32,
    started: Instant,
    next_allowed_at: Option<Instant>,
}

impl RetryState {
    fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            next_allowed_at: None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Enabled policy with the given attempt budget and fallback delay.
    ///
    /// An attempt budget of zero is treated as one.
    #[must_use]
    pub fn new(max_attempts: u32, fallback_delay: Duration) -> Self {
        Self {
            enabled: true,
            max_attempts: max_attempts.max(1),
            fallback_delay,
        }
    }

    /// Policy that sends every request exactly once.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(1, Duration::from_secs(1))
        }
    }

    /// Policy described by a [`RetryConfig`].
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(config.max_attempts, config.fallback_delay)
        }
    }

    /// Whether 429s are retried.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Maximum number of requests sent for one logical call.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// How long to wait before retrying after this 429.
    #[must_use]
    pub fn delay_for(&self, response: &RawResponse) -> Duration {
        response.reset_after().unwrap_or(self.fallback_delay)
    }

    /// Run `request_fn`, retrying while it answers 429.
    ///
    /// # Errors
    /// Returns [`ClientError::RateLimitExceeded`] when every attempt was
    /// rate limited, or the first error produced by `request_fn`.
    pub async fn execute<F, Fut>(&self, request_fn: F) -> Result<RawResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawResponse>>,
    {
        self.execute_until(request_fn, None).await
    }

    /// Like [`execute`](Self::execute) but never sleeps past `deadline`.
    ///
    /// # Errors
    /// Returns [`ClientError::Timeout`] if the next retry would start after
    /// the deadline, plus everything [`execute`](Self::execute) returns.
    pub async fn execute_until<F, Fut>(
        &self,
        mut request_fn: F,
        deadline: Option<Instant>,
    ) -> Result<RawResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawResponse>>,
    {
        if !self.enabled {
            return request_fn().await;
        }

        let mut state = RetryState::new();
        loop {
            if let Some(at) = state.next_allowed_at.take() {
                sleep(at.saturating_duration_since(Instant::now())).await;
            }

            state.attempts += 1;
            let response = request_fn().await?;
            if response.status != TOO_MANY_REQUESTS {
                return Ok(response);
            }

            if state.attempts >= self.max_attempts {
                warn!(
                    "Rate limit still in effect after {} attempt(s), giving up",
                    state.attempts
                );
                return Err(ClientError::RateLimitExceeded {
                    attempts: state.attempts,
                    last_response: Box::new(response),
                });
            }

            let delay = self.delay_for(&response);
            let Some(resume_at) = Instant::now().checked_add(delay) else {
                warn!(
                    "Rate limit reset of {}s is out of range, giving up",
                    delay.as_secs()
                );
                return Err(ClientError::RateLimitExceeded {
                    attempts: state.attempts,
                    last_response: Box::new(response),
                });
            };
            if deadline.is_some_and(|deadline| resume_at > deadline) {
                return Err(ClientError::Timeout {
                    waited: state.started.elapsed(),
                });
            }

            info!(
                "Rate limited (attempt {}/{}), retrying in {}s",
                state.attempts,
                self.max_attempts,
                delay.as_secs()
            );
            state.next_allowed_at = Some(resume_at);
        }
    }
}
