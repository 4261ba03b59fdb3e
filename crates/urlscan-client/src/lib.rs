//! urlscan Client - async client for the urlscan.io API.
//!
//! Submits scans, fetches and waits for results, and pages through search
//! results. Rate-limited requests can be retried automatically, honouring
//! the server's `X-Rate-Limit-Reset-After` hint.
//!
//! # Modules
//!
//! - [`client`] - The [`Client`] facade: scan, results, bulk operations, search
//! - [`pagination`] - [`ResultIterator`] over any paginated [`PageSource`]
//! - [`search`] - Search queries and the search page source
//! - [`retry`] - [`RetryPolicy`] for HTTP 429 handling
//! - [`transport`] - The [`Transport`] seam and its `reqwest` implementation
//! - [`pro`] - Pro APIs (live scanning, data dumps, hostnames, brands, incidents, ...)
//! - [`extract`] - Unpacking downloaded `.gz` and `.tar.gz` data dumps
//! - [`error`] - [`ClientError`] and the crate [`Result`] alias
//!
//! # Example
//!
//! ```rust,no_run
//! use urlscan_client::{Client, ScanOptions, Visibility, WaitOptions};
//!
//! # async fn run() -> urlscan_client::Result<()> {
//! let client = Client::new("my-api-key")?;
//! let result = client
//!     .scan_and_get_result(
//!         "https://example.com",
//!         &ScanOptions::new(Visibility::Unlisted),
//!         &WaitOptions::default(),
//!     )
//!     .await?;
//! println!("{:?}", result.pointer("/page/url"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod pro;
pub mod retry;
pub mod scan;
pub mod search;
pub mod transport;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use client::Client;
pub use error::{ClientError, ItemError, Result};
pub use extract::extract;
pub use pagination::{PageSource, ResultIterator, ResultPage};
pub use pro::Pro;
pub use retry::RetryPolicy;
pub use scan::{ScanHandle, WaitOptions};
pub use search::{SearchPages, SearchQuery, MAX_TOTAL};
pub use transport::{ApiRequest, HttpTransport, RateLimitInfo, RawResponse, Transport};
pub use urlscan_core::{
    ClientConfig, Frequency, IncidentVisibility, LiveScanResourceType, Permission, ResultRecord,
    ScanOptions, SearchDataSource, Tlp, UpdateVisibility, Visibility, WeekDay,
};
