//! Search API page source.
//!
//! The search endpoint pages with `search_after`: the cursor for the next
//! page is the `sort` array of the last hit, joined with commas.

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::pagination::{PageSource, ResultPage};
use crate::transport::ApiRequest;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use urlscan_core::{ResultRecord, SearchDataSource};

/// Largest `total` the search API reports; larger result sets are capped to it.
pub const MAX_TOTAL: u64 = 10_000;

/// Default number of hits per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Elasticsearch query string
    pub q: String,
    /// Hits per page
    pub size: u32,
    /// Stop after this many hits overall
    pub limit: Option<usize>,
    /// Cursor to start from
    pub search_after: Option<String>,
    /// Data source (Pro)
    pub datasource: Option<SearchDataSource>,
    /// Field to collapse results on (Pro)
    pub collapse: Option<String>,
}

impl SearchQuery {
    /// Query with default page size and no limit.
    #[must_use]
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            size: DEFAULT_PAGE_SIZE,
            limit: None,
            search_after: None,
            datasource: None,
            collapse: None,
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Cap the total number of hits.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a cursor.
    #[must_use]
    pub fn with_search_after(mut self, cursor: impl Into<String>) -> Self {
        self.search_after = Some(cursor.into());
        self
    }

    /// Search a specific data source.
    #[must_use]
    pub fn with_datasource(mut self, datasource: SearchDataSource) -> Self {
        self.datasource = Some(datasource);
        self
    }

    /// Collapse results on a field.
    #[must_use]
    pub fn with_collapse(mut self, field: impl Into<String>) -> Self {
        self.collapse = Some(field.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(ClientError::InvalidArgument(
                "search page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<ResultRecord>,
    #[serde(default)]
    total: Option<u64>,
}

/// Pages of a search or structure search.
pub struct SearchPages {
    client: Client,
    path: String,
    query: SearchQuery,
    total: Option<u64>,
    seen: u64,
}

impl SearchPages {
    /// Page through `path` with the given query.
    #[must_use]
    pub fn new(client: Client, path: impl Into<String>, query: SearchQuery) -> Self {
        Self {
            client,
            path: path.into(),
            query,
            total: None,
            seen: 0,
        }
    }

    /// Total reported by the first page, once fetched.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    fn request(&self, cursor: Option<String>) -> ApiRequest {
        ApiRequest::get(&self.path)
            .with_query("q", &self.query.q)
            .with_query("size", self.query.size)
            .with_query_opt("search_after", cursor)
            .with_query_opt("datasource", self.query.datasource.map(SearchDataSource::as_str))
            .with_query_opt("collapse", self.query.collapse.as_deref())
    }

    fn has_more(&self, total: u64, page_len: u64) -> bool {
        if total == MAX_TOTAL {
            page_len >= u64::from(self.query.size)
        } else {
            total > self.seen + page_len
        }
    }
}

#[async_trait]
impl PageSource for SearchPages {
    async fn fetch_page(&mut self, cursor: Option<String>) -> Result<ResultPage> {
        self.query.validate()?;
        let value = self.client.get_json_with(self.request(cursor)).await?;
        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| ClientError::Protocol(format!("malformed search page: {e}")))?;

        if self.total.unwrap_or(0) == 0 {
            self.total = response.total;
        }
        let total = self.total.unwrap_or(0);
        let page_len = response.results.len() as u64;
        let more = page_len > 0 && self.has_more(total, page_len);
        self.seen += page_len;

        let cursor = match response.results.last() {
            Some(last) if more => Some(sort_cursor(last)?),
            _ => None,
        };
        Ok(ResultPage::new(response.results, cursor))
    }
}

/// Cursor for the page after `record`: its `sort` values joined by commas.
pub(crate) fn sort_cursor(record: &ResultRecord) -> Result<String> {
    let sort = record
        .get("sort")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Protocol("search hit has no sort key".to_string()))?;
    Ok(sort
        .iter()
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, sort: Value) -> ResultRecord {
        ResultRecord::try_from(json!({"_id": id, "sort": sort})).unwrap()
    }

    #[test]
    fn test_sort_cursor() {
        let record = hit("a", json!([1_700_000_000_000_u64, "abc-def"]));
        assert_eq!(sort_cursor(&record).unwrap(), "1700000000000,abc-def");

        let record = ResultRecord::try_from(json!({"_id": "a"})).unwrap();
        assert!(matches!(sort_cursor(&record), Err(ClientError::Protocol(_))));
    }

    #[test]
    fn test_query_builder() {
        let query = SearchQuery::new("page.domain:example.com")
            .with_size(50)
            .with_limit(120)
            .with_datasource(SearchDataSource::Hostnames)
            .with_collapse("page.domain");
        assert_eq!(query.size, 50);
        assert_eq!(query.limit, Some(120));
        assert_eq!(query.datasource, Some(SearchDataSource::Hostnames));
        assert!(query.validate().is_ok());
        assert!(SearchQuery::new("x").with_size(0).validate().is_err());
        assert_eq!(SearchQuery::new("x").size, DEFAULT_PAGE_SIZE);
    }
}
