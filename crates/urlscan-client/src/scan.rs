//! Scan submission types.

use crate::error::{ClientError, Result};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use urlscan_core::{ResultRecord, Visibility};

/// Handle returned as soon as a scan has been accepted.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    /// Scan UUID
    pub uuid: String,
    /// API URL of the result
    pub api: Option<String>,
    /// Result page URL
    pub result: Option<String>,
    /// Visibility the server granted
    pub visibility: Option<Visibility>,
    /// URL that was submitted
    pub url: Option<String>,
    /// Country the scan runs from
    pub country: Option<String>,
    /// The full submission response
    pub raw: ResultRecord,
    /// When the submission was accepted
    pub submitted_at: Instant,
}

impl ScanHandle {
    /// Parse a submission response.
    ///
    /// # Errors
    /// Returns [`ClientError::Protocol`] if the response has no `uuid`.
    pub fn from_response(value: Value) -> Result<Self> {
        let raw = ResultRecord::try_from(value)
            .map_err(|e| ClientError::Protocol(format!("malformed scan response: {e}")))?;
        let field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        let uuid = field("uuid")
            .filter(|uuid| !uuid.is_empty())
            .ok_or_else(|| ClientError::Protocol("scan response has no uuid".to_string()))?;

        Ok(Self {
            uuid,
            api: field("api"),
            result: field("result"),
            visibility: field("visibility").and_then(|v| v.parse().ok()),
            url: field("url"),
            country: field("country"),
            submitted_at: Instant::now(),
            raw,
        })
    }
}

/// How long and how often to poll for a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between polls
    pub interval: Duration,
    /// Minimum time after submission before the first poll
    pub initial_wait: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(1),
            initial_wait: Duration::from_secs(10),
        }
    }
}

impl WaitOptions {
    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the initial wait.
    #[must_use]
    pub fn with_initial_wait(mut self, initial_wait: Duration) -> Self {
        self.initial_wait = initial_wait;
        self
    }
}
