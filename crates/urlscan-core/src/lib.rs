//! urlscan Core - shared foundation for the urlscan.io client crates.
//!
//! This crate holds the pieces every other crate depends on: error types,
//! configuration resolution and the request/response types that do not
//! involve any I/O.
//!
//! # Modules
//!
//! - [`error`] - Configuration and validation errors using thiserror
//! - [`config`] - Client configuration with parameter > environment > file > default precedence
//! - [`types`] - Visibility, search data sources, scan options, Pro enums and the opaque [`ResultRecord`]
//!
//! # Example
//!
//! ```rust
//! use urlscan_core::{ClientConfig, ScanOptions, Visibility};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::builder()
//!     .api_key("my-api-key")
//!     .retry(true)
//!     .build()?;
//! assert!(config.retry.enabled);
//!
//! let options = ScanOptions::new(Visibility::Unlisted).with_tag("triage");
//! assert_eq!(options.tags, vec!["triage".to_string()]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    ApiKey, ClientConfig, ClientConfigBuilder, FileConfig, RetryConfig, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENT, ENV_API_KEY, ENV_BASE_URL, ENV_RETRY,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{
    Frequency, IncidentVisibility, LiveScanResourceType, Permission, ResultRecord, ScanOptions,
    SearchDataSource, Tlp, UpdateVisibility, Visibility, WeekDay,
};
