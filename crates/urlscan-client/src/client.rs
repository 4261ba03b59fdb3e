//! The urlscan.io API client.

use crate::error::{ClientError, Result};
use crate::pagination::ResultIterator;
use crate::retry::RetryPolicy;
use crate::scan::{ScanHandle, WaitOptions};
use crate::search::{SearchPages, SearchQuery};
use crate::transport::{ApiRequest, HttpTransport, RawResponse, Transport};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use urlscan_core::{ClientConfig, ResultRecord, ScanOptions};

/// Client for the public urlscan.io API.
///
/// Cloning is cheap: clones share the underlying connection pool. The
/// client holds no mutable state, so clones can be used from several tasks.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ScanRequest<'a> {
    url: &'a str,
    #[serde(flatten)]
    options: &'a ScanOptions,
}

impl Client {
    /// Client with the given API key and defaults for everything else.
    ///
    /// Environment variables still apply to settings not given here.
    ///
    /// # Errors
    /// Returns error if the key is empty or the environment holds invalid values.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::builder()
            .api_key(api_key)
            .build()
            .map_err(urlscan_core::CoreError::from)?;
        Self::from_config(config)
    }

    /// Client for a fully resolved configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        debug!(
            "Creating urlscan client for {} (retry: {})",
            config.base_url, config.retry.enabled
        );
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            RetryPolicy::from_config(&config.retry),
        ))
    }

    /// Client over a custom transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// The retry policy in use.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send a request through the retry policy, returning only 2xx responses.
    ///
    /// # Errors
    /// Returns the mapped API error for any non-2xx status.
    pub async fn request(&self, request: ApiRequest) -> Result<RawResponse> {
        self.request_until(request, None).await
    }

    async fn request_until(
        &self,
        request: ApiRequest,
        deadline: Option<Instant>,
    ) -> Result<RawResponse> {
        let transport = &self.transport;
        let request = &request;
        let response = self
            .retry
            .execute_until(move || transport.send(request), deadline)
            .await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(ClientError::from_response(&response))
        }
    }

    /// `GET` a path and decode the JSON body.
    ///
    /// # Errors
    /// Returns error if the request fails or the body is not JSON.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        self.get_json_with(ApiRequest::get(path)).await
    }

    /// Send a request and decode the JSON body.
    ///
    /// # Errors
    /// Returns error if the request fails or the body is not JSON.
    pub async fn get_json_with(&self, request: ApiRequest) -> Result<Value> {
        self.request(request).await?.json()
    }

    /// `GET` a path and return the body as text.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_text(&self, path: &str) -> Result<String> {
        Ok(self.request(ApiRequest::get(path)).await?.text())
    }

    /// `GET` a path and return the raw body.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_content(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.request(ApiRequest::get(path)).await?.body)
    }

    /// Send a request and write the body to `dest`, returning the byte count.
    ///
    /// # Errors
    /// Returns error if the request fails or the file cannot be written.
    pub async fn download(&self, request: ApiRequest, dest: &Path) -> Result<u64> {
        let response = self.request(request).await?;
        tokio::fs::write(dest, &response.body).await?;
        debug!("Wrote {} bytes to {}", response.body.len(), dest.display());
        Ok(response.body.len() as u64)
    }

    /// Submit a URL for scanning.
    ///
    /// # Errors
    /// Returns error if the submission is rejected.
    pub async fn scan(&self, url: &str, options: &ScanOptions) -> Result<ScanHandle> {
        if url.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "scan URL must not be empty".to_string(),
            ));
        }
        let body = serde_json::to_value(ScanRequest { url, options })?;
        let response = self
            .request(ApiRequest::post("/api/v1/scan/", body))
            .await?;
        let handle = ScanHandle::from_response(response.json()?)?;

        if let Some(granted) = handle.visibility {
            if granted != options.visibility {
                warn!(
                    "Visibility of scan {} is enforced to {} (requested {})",
                    handle.uuid, granted, options.visibility
                );
            }
        }
        info!("Submitted scan {} for {}", handle.uuid, url);
        Ok(handle)
    }

    /// Fetch a finished scan result.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the scan is unknown or not finished.
    pub async fn get_result(&self, id: &str) -> Result<ResultRecord> {
        let path = format!("/api/v1/result/{}/", segment(id, "scan id")?);
        into_record(&self.request(ApiRequest::get(path)).await?)
    }

    /// Screenshot of a scan as PNG bytes.
    ///
    /// # Errors
    /// Returns error if the screenshot does not exist.
    pub async fn get_screenshot(&self, id: &str) -> Result<Vec<u8>> {
        self.get_content(&format!("/screenshots/{}.png", segment(id, "scan id")?))
            .await
    }

    /// Rendered DOM of a scan.
    ///
    /// # Errors
    /// Returns error if the DOM snapshot does not exist.
    pub async fn get_dom(&self, id: &str) -> Result<String> {
        self.get_text(&format!("/dom/{}/", segment(id, "scan id")?))
            .await
    }

    /// Poll until the result of `id` is available.
    ///
    /// A 404 means the scan is still running. Each poll, including its
    /// rate-limit retries, is bounded by the same deadline.
    ///
    /// # Errors
    /// Returns [`ClientError::Timeout`] if the result is not ready within
    /// `options.timeout`.
    pub async fn wait_for_result(&self, id: &str, options: &WaitOptions) -> Result<ResultRecord> {
        let path = format!("/api/v1/result/{}/", segment(id, "scan id")?);
        let started = Instant::now();
        // A timeout past the end of the clock means no deadline.
        let deadline = started.checked_add(options.timeout);

        loop {
            match self
                .request_until(ApiRequest::get(&path), deadline)
                .await
            {
                Ok(response) => return into_record(&response),
                Err(ClientError::NotFound { .. }) => {}
                Err(ClientError::Timeout { .. }) => {
                    return Err(ClientError::Timeout {
                        waited: started.elapsed(),
                    })
                }
                Err(e) => return Err(e),
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ClientError::Timeout {
                            waited: started.elapsed(),
                        });
                    }
                    options.interval.min(deadline - now)
                }
                None => options.interval,
            };
            debug!("Result {id} not ready yet");
            sleep(pause).await;
        }
    }

    /// Submit several URLs one after another.
    ///
    /// Every URL gets its own entry, in input order; one failure does not
    /// stop the rest.
    pub async fn bulk_scan<I, U>(
        &self,
        urls: I,
        options: &ScanOptions,
    ) -> Vec<(String, Result<ScanHandle>)>
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        let mut handles = Vec::new();
        for url in urls {
            let url = url.into();
            let handle = self.scan(&url, options).await;
            if let Err(e) = &handle {
                warn!("Scan of {url} failed: {e}");
            }
            handles.push((url, handle));
        }
        handles
    }

    /// Submit a URL and wait for its result.
    ///
    /// # Errors
    /// Returns the submission error or the error from waiting.
    pub async fn scan_and_get_result(
        &self,
        url: &str,
        scan_options: &ScanOptions,
        wait_options: &WaitOptions,
    ) -> Result<ResultRecord> {
        let handle = self.scan(url, scan_options).await?;
        self.wait_for_handle(&handle, wait_options).await
    }

    /// Submit several URLs and wait for each result.
    ///
    /// Items whose submission failed keep their submission error.
    pub async fn bulk_scan_and_get_results<I, U>(
        &self,
        urls: I,
        scan_options: &ScanOptions,
        wait_options: &WaitOptions,
    ) -> Vec<(String, Result<ResultRecord>)>
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        let mut results = Vec::new();
        for (url, handle) in self.bulk_scan(urls, scan_options).await {
            let result = match handle {
                Ok(handle) => self.wait_for_handle(&handle, wait_options).await,
                Err(e) => Err(e),
            };
            results.push((url, result));
        }
        results
    }

    /// Wait for the result of a submitted scan, honouring `initial_wait`.
    ///
    /// # Errors
    /// Returns [`ClientError::Timeout`] if the result is not ready in time.
    pub async fn wait_for_handle(
        &self,
        handle: &ScanHandle,
        options: &WaitOptions,
    ) -> Result<ResultRecord> {
        let since = handle.submitted_at.elapsed();
        if since < options.initial_wait {
            sleep(options.initial_wait - since).await;
        }
        self.wait_for_result(&handle.uuid, options).await
    }

    /// Search scans.
    #[must_use]
    pub fn search(&self, query: SearchQuery) -> ResultIterator<SearchPages> {
        self.search_at("/api/v1/search/", query)
    }

    pub(crate) fn search_at(&self, path: &str, query: SearchQuery) -> ResultIterator<SearchPages> {
        let limit = query.limit;
        let start = query.search_after.clone();
        ResultIterator::new(SearchPages::new(self.clone(), path, query))
            .with_limit(limit)
            .starting_at(start)
    }

    /// Countries scans can be run from.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_available_countries(&self) -> Result<Value> {
        self.get_json("/api/v1/availableCountries").await
    }

    /// User agents available for scanning.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_user_agents(&self) -> Result<Value> {
        self.get_json("/api/v1/userAgents").await
    }

    /// Remaining quotas of the API key.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_quotas(&self) -> Result<Value> {
        self.get_json("/api/v1/quotas").await
    }
}

fn into_record(response: &RawResponse) -> Result<ResultRecord> {
    let value: Value = response
        .json()
        .map_err(|e| ClientError::Protocol(format!("result is not JSON: {e}")))?;
    ResultRecord::try_from(value).map_err(|e| ClientError::Protocol(e.to_string()))
}

/// Check that `value` can be used as a single path segment.
pub(crate) fn segment<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '?', '#', '%'])
    {
        return Err(ClientError::InvalidArgument(format!(
            "invalid {what}: '{value}'"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{json_response, ScriptedTransport};
    use crate::search::SearchQuery;
    use crate::transport::RESET_AFTER_HEADER;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;
    use urlscan_core::Visibility;

    const UUID: &str = "0e37e828-a9d9-45c0-ac50-1ca579b86c72";

    fn client(transport: &Arc<ScriptedTransport>) -> Client {
        Client::with_transport(transport.clone(), RetryPolicy::new(5, Duration::from_secs(1)))
    }

    fn submitted(uuid: &str, visibility: &str) -> RawResponse {
        json_response(
            200,
            &json!({"uuid": uuid, "api": format!("https://urlscan.io/api/v1/result/{uuid}/"), "visibility": visibility}),
        )
    }

    fn not_found() -> RawResponse {
        json_response(404, &json!({"message": "Scan is not finished yet", "status": 404}))
    }

    fn finished(uuid: &str) -> RawResponse {
        json_response(200, &json!({"task": {"uuid": uuid}, "page": {"url": "https://example.com"}}))
    }

    #[tokio::test]
    async fn test_scan_sends_options() {
        let transport = ScriptedTransport::new(vec![submitted(UUID, "unlisted")]);
        let options = ScanOptions::new(Visibility::Unlisted).with_tag("triage");

        let handle = client(&transport)
            .scan("https://example.com", &options)
            .await
            .unwrap();
        assert_eq!(handle.uuid, UUID);

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/api/v1/scan/");
        assert_eq!(
            requests[0].body,
            Some(json!({"url": "https://example.com", "visibility": "unlisted", "tags": ["triage"]}))
        );
    }

    #[tokio::test]
    async fn test_scan_rejected() {
        let transport = ScriptedTransport::new(vec![json_response(
            400,
            &json!({"message": "DNS Error - Could not resolve domain", "status": 400}),
        )]);
        let err = client(&transport)
            .scan("https://nope.invalid", &ScanOptions::new(Visibility::Public))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_get_result_not_found() {
        let transport = ScriptedTransport::new(vec![not_found()]);
        let err = client(&transport).get_result(UUID).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(transport.requests()[0].path, format!("/api/v1/result/{UUID}/"));
    }

    #[tokio::test]
    async fn test_invalid_id_is_rejected_before_sending() {
        let transport = ScriptedTransport::new(vec![]);
        let client = client(&transport);
        for id in ["", "..", "../quotas", "a/b", "%2e%2e", "%2E.", "a%2fb", "a\\b"] {
            assert!(matches!(
                client.get_result(id).await,
                Err(ClientError::InvalidArgument(_))
            ));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_result_polls_until_ready() {
        let transport = ScriptedTransport::new(vec![not_found(), not_found(), finished(UUID)]);
        let options = WaitOptions::default().with_interval(Duration::from_secs(2));

        let started = Instant::now();
        let record = client(&transport)
            .wait_for_result(UUID, &options)
            .await
            .unwrap();
        assert_eq!(record.id(), Some(UUID));
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_result_times_out() {
        let transport = ScriptedTransport::repeating(not_found());
        let options = WaitOptions::default()
            .with_timeout(Duration::from_secs(5))
            .with_interval(Duration::from_secs(2));

        let started = Instant::now();
        let err = client(&transport)
            .wait_for_result(UUID, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
        assert!(started.elapsed() <= options.timeout + options.interval);
        assert!(started.elapsed() >= options.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_result_unbounded_timeout() {
        let transport = ScriptedTransport::new(vec![not_found(), finished(UUID)]);
        let options = WaitOptions::default().with_timeout(Duration::MAX);

        let record = client(&transport)
            .wait_for_result(UUID, &options)
            .await
            .unwrap();
        assert_eq!(record.id(), Some(UUID));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_result_rate_limit_respects_deadline() {
        let transport = ScriptedTransport::repeating(
            RawResponse::new(429).with_header(RESET_AFTER_HEADER, "60"),
        );
        let options = WaitOptions::default().with_timeout(Duration::from_secs(5));

        let started = Instant::now();
        let err = client(&transport)
            .wait_for_result(UUID, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
        assert!(started.elapsed() <= options.timeout + options.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_result_passes_other_errors() {
        let transport = ScriptedTransport::new(vec![json_response(
            401,
            &json!({"message": "Invalid API key"}),
        )]);
        let err = client(&transport)
            .wait_for_result(UUID, &WaitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Authentication { status: 401, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_scan_and_get_results_keeps_per_item_errors() {
        let transport = ScriptedTransport::new(vec![
            submitted("u1-uuid", "public"),
            json_response(404, &json!({"message": "Not found", "status": 404})),
            finished("u1-uuid"),
        ]);
        let results = client(&transport)
            .bulk_scan_and_get_results(
                ["u1", "u2"],
                &ScanOptions::new(Visibility::Public),
                &WaitOptions::default(),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "u1");
        assert_eq!(results[0].1.as_ref().unwrap().id(), Some("u1-uuid"));
        assert_eq!(results[1].0, "u2");
        assert!(matches!(results[1].1, Err(ClientError::NotFound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_and_get_result_honours_initial_wait() {
        let transport = ScriptedTransport::new(vec![submitted(UUID, "public"), finished(UUID)]);
        let options = WaitOptions::default().with_initial_wait(Duration::from_secs(10));

        let started = Instant::now();
        let record = client(&transport)
            .scan_and_get_result(
                "https://example.com",
                &ScanOptions::new(Visibility::Public),
                &options,
            )
            .await
            .unwrap();
        assert_eq!(record.id(), Some(UUID));
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retried() {
        let transport = ScriptedTransport::new(vec![
            RawResponse::new(429).with_header(RESET_AFTER_HEADER, "3"),
            finished(UUID),
        ]);
        let started = Instant::now();
        let record = client(&transport).get_result(UUID).await.unwrap();
        assert_eq!(record.id(), Some(UUID));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_rate_limit_without_retry() {
        let transport = ScriptedTransport::new(vec![json_response(
            429,
            &json!({"message": "Rate limit exceeded"}),
        )
        .with_header(RESET_AFTER_HEADER, "12")]);
        let client = Client::with_transport(transport.clone(), RetryPolicy::disabled());

        match client.get_quotas().await.unwrap_err() {
            ClientError::RateLimited { reset_after, .. } => {
                assert_eq!(reset_after, Some(Duration::from_secs(12)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_pages_through_results() {
        let transport = ScriptedTransport::new(vec![
            json_response(
                200,
                &json!({"total": 3, "results": [
                    {"_id": "a", "sort": [3, "a"]},
                    {"_id": "b", "sort": [2, "b"]}
                ]}),
            ),
            json_response(200, &json!({"total": 3, "results": [{"_id": "c", "sort": [1, "c"]}]})),
        ]);

        let records = client(&transport)
            .search(SearchQuery::new("domain:example.com").with_size(2))
            .collect_all()
            .await
            .unwrap();
        let ids: Vec<_> = records.iter().filter_map(ResultRecord::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query_value("search_after"), None);
        assert_eq!(requests[0].query_value("q"), Some("domain:example.com"));
        assert_eq!(requests[1].query_value("search_after"), Some("2,b"));
    }

    #[tokio::test]
    async fn test_search_capped_total_pages_by_size() {
        let full_page = json!({"total": 10_000, "results": [
            {"_id": "a", "sort": [2]},
            {"_id": "b", "sort": [1]}
        ]});
        let short_page = json!({"total": 10_000, "results": [{"_id": "c", "sort": [0]}]});
        let transport = ScriptedTransport::new(vec![
            json_response(200, &full_page),
            json_response(200, &short_page),
        ]);

        let records = client(&transport)
            .search(SearchQuery::new("*").with_size(2))
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_search_limit() {
        let transport = ScriptedTransport::new(vec![json_response(
            200,
            &json!({"total": 500, "results": [
                {"_id": "a", "sort": [2]},
                {"_id": "b", "sort": [1]}
            ]}),
        )]);
        let records = client(&transport)
            .search(SearchQuery::new("*").with_size(2).with_limit(1))
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_malformed_page() {
        let transport = ScriptedTransport::new(vec![json_response(200, &json!({"total": 1}))]);
        let result = client(&transport)
            .search(SearchQuery::new("*"))
            .collect_all()
            .await;
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }
}
