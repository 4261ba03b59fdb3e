//! Data dumps.
//!
//! Dumps are addressed by `{days|hours|minutes}/{api|search|screenshots|dom}/YYYYMMDD`,
//! optionally followed by a file name when downloading.

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::transport::ApiRequest;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

fn listing_regex() -> &'static Regex {
    static LISTING_REGEX: OnceLock<Regex> = OnceLock::new();
    LISTING_REGEX.get_or_init(|| {
        Regex::new(r"^(days|hours|minutes)/(api|search|screenshots|dom)/\d{8}/?$")
            .expect("valid regex")
    })
}

fn file_regex() -> &'static Regex {
    static FILE_REGEX: OnceLock<Regex> = OnceLock::new();
    FILE_REGEX.get_or_init(|| {
        Regex::new(r"^(days|hours|minutes)/(api|search|screenshots|dom)/\d{8}/[A-Za-z0-9._-]+$")
            .expect("valid regex")
    })
}

fn validate<'p>(path: &'p str, regex: &Regex, what: &str) -> Result<&'p str> {
    let path = path.trim_start_matches('/');
    if regex.is_match(path) && !path.contains("..") {
        Ok(path)
    } else {
        Err(ClientError::InvalidArgument(format!(
            "invalid data dump {what} '{path}'"
        )))
    }
}

/// Data dump API handle.
#[derive(Debug, Clone, Copy)]
pub struct DataDump<'a> {
    client: &'a Client,
}

impl<'a> DataDump<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Files available under a dump directory, e.g. `days/api/20260101`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidArgument`] for a malformed path.
    pub async fn get_list(&self, path: &str) -> Result<Value> {
        let path = validate(path, listing_regex(), "path")?;
        self.client
            .get_json(&format!("/api/v1/datadump/list/{path}"))
            .await
    }

    /// Download one dump file, e.g. `days/api/20260101/20260101.gz`, to `dest`.
    ///
    /// # Errors
    /// Returns error for a malformed path or if the download fails.
    pub async fn download_file(&self, path: &str, dest: &Path) -> Result<u64> {
        let path = validate(path, file_regex(), "file")?;
        let written = self
            .client
            .download(ApiRequest::get(format!("/api/v1/datadump/link/{path}")), dest)
            .await?;
        info!("Downloaded data dump {path} ({written} bytes)");
        Ok(written)
    }
}
