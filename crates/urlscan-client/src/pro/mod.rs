//! urlscan Pro APIs.
//!
//! [`Pro`] wraps a [`Client`] and adds the endpoints only available to Pro
//! subscriptions. Each API family is exposed through a lightweight borrowed
//! handle, e.g. `pro.livescan().get_scanners()`.
//!
//! - [`brand`] - Brand monitoring
//! - [`channel`] - Notification channels
//! - [`datadump`] - Bulk data dumps
//! - [`hostname`] - Hostname history
//! - [`incident`] - Incidents watching an observable
//! - [`livescan`] - Live scanners
//! - [`saved_search`] - Saved searches
//! - [`subscription`] - Subscriptions to saved searches
//! - [`visibility`] - Changing the visibility of existing scans

pub mod brand;
pub mod channel;
pub mod datadump;
pub mod hostname;
pub mod incident;
pub mod livescan;
pub mod saved_search;
pub mod subscription;
pub mod visibility;

use crate::client::{segment, Client};
use crate::error::Result;
use crate::pagination::ResultIterator;
use crate::search::{SearchPages, SearchQuery};
use crate::transport::ApiRequest;
use serde_json::Value;
use std::path::Path;
use urlscan_core::ClientConfig;

pub use brand::Brand;
pub use channel::{Channel, ChannelOptions, ChannelType};
pub use datadump::DataDump;
pub use hostname::{HostnamePages, HostnameQuery};
pub use incident::{Incident, IncidentOptions, ScanIntervalMode, WatchedAttribute};
pub use livescan::{LiveScan, LiveScanOptions, LiveScanResource};
pub use saved_search::{SavedSearch, SavedSearchDataSource, SavedSearchOptions};
pub use subscription::{
    IncidentCreationMode, IncidentWatchKey, Subscription, SubscriptionOptions,
};
pub use visibility::VisibilityApi;

/// Client for the urlscan Pro APIs.
#[derive(Debug, Clone)]
pub struct Pro {
    client: Client,
}

impl Pro {
    /// Pro client with the given API key.
    ///
    /// # Errors
    /// Returns error if the key is empty or the environment holds invalid values.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::from_client(Client::new(api_key)?))
    }

    /// Pro client for a resolved configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(Client::from_config(config)?))
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Brand API.
    #[must_use]
    pub fn brand(&self) -> Brand<'_> {
        Brand::new(&self.client)
    }

    /// Notification channel API.
    #[must_use]
    pub fn channel(&self) -> Channel<'_> {
        Channel::new(&self.client)
    }

    /// Data dump API.
    #[must_use]
    pub fn datadump(&self) -> DataDump<'_> {
        DataDump::new(&self.client)
    }

    /// Incident API.
    #[must_use]
    pub fn incident(&self) -> Incident<'_> {
        Incident::new(&self.client)
    }

    /// Live scanning API.
    #[must_use]
    pub fn livescan(&self) -> LiveScan<'_> {
        LiveScan::new(&self.client)
    }

    /// Saved search API.
    #[must_use]
    pub fn saved_search(&self) -> SavedSearch<'_> {
        SavedSearch::new(&self.client)
    }

    /// Subscription API.
    #[must_use]
    pub fn subscription(&self) -> Subscription<'_> {
        Subscription::new(&self.client)
    }

    /// Scan visibility API.
    #[must_use]
    pub fn visibility(&self) -> VisibilityApi<'_> {
        VisibilityApi::new(&self.client)
    }

    /// Scans structurally similar to `scan_id`.
    ///
    /// Only `q`, `size`, `limit` and `search_after` of the query are used.
    ///
    /// # Errors
    /// Returns error if the scan id is not a valid path segment.
    pub fn structure_search(
        &self,
        scan_id: &str,
        query: SearchQuery,
    ) -> Result<ResultIterator<SearchPages>> {
        query.validate()?;
        let path = format!("/api/v1/pro/result/{}/similar/", segment(scan_id, "scan id")?);
        let query = SearchQuery {
            datasource: None,
            collapse: None,
            ..query
        };
        Ok(self.client.search_at(&path, query))
    }

    /// Historical observations of a hostname.
    ///
    /// # Errors
    /// Returns error if the hostname is not a valid path segment.
    pub fn hostname(
        &self,
        hostname: &str,
        query: HostnameQuery,
    ) -> Result<ResultIterator<HostnamePages>> {
        let limit = query.limit;
        let start = query.page_state.clone();
        let pages = HostnamePages::new(self.client.clone(), segment(hostname, "hostname")?, query)?;
        Ok(ResultIterator::new(pages)
            .with_limit(limit)
            .starting_at(start))
    }

    /// Download a file captured during a scan, by SHA256.
    ///
    /// # Errors
    /// Returns error if the file does not exist or cannot be written.
    pub async fn download_file(
        &self,
        file_hash: &str,
        password: Option<&str>,
        filename: Option<&str>,
        dest: &Path,
    ) -> Result<u64> {
        let request = ApiRequest::get(format!("/downloads/{}", segment(file_hash, "file hash")?))
            .with_query_opt("password", password)
            .with_query_opt("filename", filename);
        self.client.download(request, dest).await
    }

    /// Name and details of the API key's user.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_user(&self) -> Result<Value> {
        self.client.get_json("/api/v1/pro/username").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::mock::{json_response, ScriptedTransport};
    use crate::retry::RetryPolicy;
    use serde_json::json;
    use std::sync::Arc;

    fn pro(transport: &Arc<ScriptedTransport>) -> Pro {
        Pro::from_client(Client::with_transport(
            transport.clone(),
            RetryPolicy::disabled(),
        ))
    }

    #[tokio::test]
    async fn test_structure_search_path_and_params() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            &json!({"total": 1, "results": [{"_id": "x", "sort": [1]}]}),
        )]);
        let query = SearchQuery::new("page.domain:example.com")
            .with_collapse("ignored")
            .with_size(10);

        let records = pro(&transport)
            .structure_search("scan-1", query)
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.path, "/api/v1/pro/result/scan-1/similar/");
        assert_eq!(request.query_value("size"), Some("10"));
        assert_eq!(request.query_value("collapse"), None);
    }

    #[tokio::test]
    async fn test_download_file() {
        let transport = ScriptedTransport::new(vec![
            crate::transport::RawResponse::new(200).with_body(b"zipbytes".to_vec())
        ]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("sample.zip");

        let written = pro(&transport)
            .download_file("abc123", Some("infected"), None, &dest)
            .await
            .unwrap();
        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"zipbytes");

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.path, "/downloads/abc123");
        assert_eq!(request.query_value("password"), Some("infected"));
        assert_eq!(request.query_value("filename"), None);
    }

    #[tokio::test]
    async fn test_user_resource_handles() {
        let transport = ScriptedTransport::repeating(json_response(200, &json!({})));
        let pro = pro(&transport);

        pro.saved_search().get_list().await.unwrap();
        pro.subscription().get_subscriptions().await.unwrap();
        pro.incident().get("inc1").await.unwrap();
        pro.channel().get_channels().await.unwrap();

        let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/api/v1/user/searches/",
                "/api/v1/user/subscriptions/",
                "/api/v1/user/incidents/inc1",
                "/api/v1/user/channels/",
            ]
        );
    }

    #[tokio::test]
    async fn test_get_user_requires_pro() {
        let transport = ScriptedTransport::new(vec![json_response(
            403,
            &json!({"message": "Pro subscription required"}),
        )]);
        let err = pro(&transport).get_user().await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication { status: 403, .. }));
    }
}
