//! Hostname history.

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::pagination::{PageSource, ResultPage};
use crate::transport::ApiRequest;
use async_trait::async_trait;
use serde::Deserialize;
use urlscan_core::ResultRecord;

/// Default page size of the hostname API.
pub const DEFAULT_HOSTNAME_PAGE_SIZE: u32 = 1000;

/// Options for a hostname history lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameQuery {
    /// Records per page (the API's `limit` parameter)
    pub size: u32,
    /// Stop after this many records overall
    pub limit: Option<usize>,
    /// Page state to resume from
    pub page_state: Option<String>,
}

impl Default for HostnameQuery {
    fn default() -> Self {
        Self {
            size: DEFAULT_HOSTNAME_PAGE_SIZE,
            limit: None,
            page_state: None,
        }
    }
}

impl HostnameQuery {
    /// Set the page size.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Cap the total number of records.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a page state.
    #[must_use]
    pub fn with_page_state(mut self, page_state: impl Into<String>) -> Self {
        self.page_state = Some(page_state.into());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostnameResponse {
    results: Vec<ResultRecord>,
    #[serde(default)]
    page_state: Option<String>,
}

/// Pages of a hostname history, cursored by `pageState`.
pub struct HostnamePages {
    client: Client,
    path: String,
    size: u32,
}

impl HostnamePages {
    pub(crate) fn new(client: Client, hostname: &str, query: HostnameQuery) -> Result<Self> {
        if query.size == 0 {
            return Err(ClientError::InvalidArgument(
                "hostname page size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            client,
            path: format!("/api/v1/hostname/{hostname}"),
            size: query.size,
        })
    }
}

#[async_trait]
impl PageSource for HostnamePages {
    async fn fetch_page(&mut self, cursor: Option<String>) -> Result<ResultPage> {
        let request = ApiRequest::get(&self.path)
            .with_query("limit", self.size)
            .with_query_opt("pageState", cursor);
        let value = self.client.get_json_with(request).await?;
        let response: HostnameResponse = serde_json::from_value(value)
            .map_err(|e| ClientError::Protocol(format!("malformed hostname page: {e}")))?;
        Ok(ResultPage::new(
            response.results,
            response.page_state.filter(|state| !state.is_empty()),
        ))
    }
}
