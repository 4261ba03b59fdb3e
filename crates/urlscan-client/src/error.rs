//! Error types for talking to the urlscan.io API.

use crate::transport::RawResponse;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use urlscan_core::CoreError;

/// One entry of the `errors` array in an API error body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemError {
    /// Short title
    pub title: String,
    /// HTTP status of this item
    #[serde(default)]
    pub status: Option<u16>,
    /// Machine-readable code
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Extra detail
    #[serde(default)]
    pub detail: Option<String>,
}

/// Errors that can occur while using the client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid or missing API key
    #[error("authentication failed (HTTP {status}): {message}")]
    Authentication {
        /// HTTP status code (401 or 403)
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Still rate limited after every retry attempt was used
    #[error("rate limit exceeded after {attempts} attempt(s)")]
    RateLimitExceeded {
        /// Number of requests sent
        attempts: u32,
        /// The final 429 response
        last_response: Box<RawResponse>,
    },

    /// Rate limited with retries disabled
    #[error("rate limited: {message}")]
    RateLimited {
        /// Error message from the server
        message: String,
        /// Time until the limit resets, if the server said
        reset_after: Option<Duration>,
    },

    /// The server's response broke the expected contract
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Unknown scan, result or resource
    #[error("not found: {message}")]
    NotFound {
        /// Error message from the server
        message: String,
    },

    /// A deadline elapsed before the operation finished
    #[error("timed out after {waited:?}")]
    Timeout {
        /// Time spent before giving up
        waited: Duration,
    },

    /// Network-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-success HTTP status
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the server
        message: String,
        /// Longer description
        description: Option<String>,
        /// Machine-readable code
        code: Option<String>,
        /// Per-item errors
        errors: Vec<ItemError>,
    },

    /// Caller input rejected before sending
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O failed (writing downloads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or validation error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClientError {
    /// HTTP status associated with the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::RateLimitExceeded { .. } | Self::RateLimited { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Build the error for a non-success response.
    pub(crate) fn from_response(response: &RawResponse) -> Self {
        let body: serde_json::Value =
            serde_json::from_slice(&response.body).unwrap_or(serde_json::Value::Null);

        let text = |key: &str| body.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let message = text("message").unwrap_or_else(|| {
            let raw = response.text();
            let raw = raw.trim();
            if raw.is_empty() || body.is_object() {
                format!("HTTP {}", response.status)
            } else {
                raw.to_string()
            }
        });
        // the body's status wins over the transport status when present
        let status = body
            .get("status")
            .and_then(serde_json::Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(response.status);

        match status {
            429 => Self::RateLimited {
                message,
                reset_after: response.reset_after(),
            },
            401 | 403 => Self::Authentication { status, message },
            404 => Self::NotFound { message },
            _ => Self::Api {
                status,
                message,
                description: text("description"),
                code: body.get("code").map(|c| match c {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
                errors: body
                    .get("errors")
                    .cloned()
                    .and_then(|e| serde_json::from_value(e).ok())
                    .unwrap_or_default(),
            },
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
