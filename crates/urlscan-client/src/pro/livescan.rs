//! Live scanning.
//!
//! Live scanners run a scan synchronously from a chosen location. A
//! finished live scan is ephemeral until it is stored, and can be purged.

use crate::client::{segment, Client};
use crate::error::Result;
use crate::transport::ApiRequest;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use urlscan_core::{LiveScanResourceType, Visibility};

/// Options for a live scan task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveScanOptions {
    /// Visibility of the task
    pub visibility: Option<Visibility>,
    /// Page load timeout in milliseconds
    pub page_timeout: Option<u64>,
    /// Delay before capture in milliseconds
    pub capture_delay: Option<u64>,
    /// Extra request headers
    pub extra_headers: BTreeMap<String, String>,
    /// Scanner features to enable
    pub enable_features: Vec<String>,
    /// Scanner features to disable
    pub disable_features: Vec<String>,
}

impl LiveScanOptions {
    /// Set the visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Add an extra request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    fn scanner(&self) -> ScannerSettings {
        ScannerSettings {
            page_timeout: self.page_timeout,
            capture_delay: self.capture_delay,
            extra_headers: self.extra_headers.clone(),
            enable_features: self.enable_features.clone(),
            disable_features: self.disable_features.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScannerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    page_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capture_delay: Option<u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extra_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    enable_features: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    disable_features: Vec<String>,
}

/// A resource fetched from a live scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveScanResource {
    /// Result JSON
    Json(Value),
    /// DOM text
    Text(String),
    /// Screenshot, response body or download
    Bytes(Vec<u8>),
}

/// Live scan API handle.
#[derive(Debug, Clone, Copy)]
pub struct LiveScan<'a> {
    client: &'a Client,
}

impl<'a> LiveScan<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Available live scanners and their locations.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_scanners(&self) -> Result<Value> {
        self.client.get_json("/api/v1/livescan/scanners/").await
    }

    /// Start a non-blocking live scan and return its task.
    ///
    /// # Errors
    /// Returns error if the scanner rejects the task.
    pub async fn task(&self, scanner_id: &str, url: &str, options: &LiveScanOptions) -> Result<Value> {
        self.submit(scanner_id, "task", url, options).await
    }

    /// Run a blocking live scan and return when it finished.
    ///
    /// # Errors
    /// Returns error if the scanner rejects the task.
    pub async fn scan(&self, scanner_id: &str, url: &str, options: &LiveScanOptions) -> Result<Value> {
        self.submit(scanner_id, "scan", url, options).await
    }

    async fn submit(
        &self,
        scanner_id: &str,
        kind: &str,
        url: &str,
        options: &LiveScanOptions,
    ) -> Result<Value> {
        let mut task = json!({ "url": url });
        if let Some(visibility) = options.visibility {
            task["visibility"] = json!(visibility);
        }
        let body = json!({ "task": task, "scanner": options.scanner() });
        let path = format!(
            "/api/v1/livescan/{}/{kind}/",
            segment(scanner_id, "scanner id")?
        );
        self.client.get_json_with(ApiRequest::post(path, body)).await
    }

    /// Fetch a resource produced by a live scan.
    ///
    /// # Errors
    /// Returns error if the resource does not exist.
    pub async fn get_resource(
        &self,
        scanner_id: &str,
        resource_type: LiveScanResourceType,
        resource_id: &str,
    ) -> Result<LiveScanResource> {
        let path = format!(
            "/api/v1/livescan/{}/{}/{}",
            segment(scanner_id, "scanner id")?,
            resource_type.as_str(),
            segment(resource_id, "resource id")?
        );
        Ok(match resource_type {
            LiveScanResourceType::Result => LiveScanResource::Json(self.client.get_json(&path).await?),
            LiveScanResourceType::Dom => LiveScanResource::Text(self.client.get_text(&path).await?),
            LiveScanResourceType::Screenshot
            | LiveScanResourceType::Response
            | LiveScanResourceType::Download => {
                LiveScanResource::Bytes(self.client.get_content(&path).await?)
            }
        })
    }

    /// Store an ephemeral live scan so it outlives the scanner.
    ///
    /// # Errors
    /// Returns error if the scan is unknown.
    pub async fn store(&self, scanner_id: &str, scan_id: &str, visibility: Visibility) -> Result<Value> {
        let body = json!({ "task": { "visibility": visibility } });
        let path = scan_path(scanner_id, scan_id)?;
        self.client.get_json_with(ApiRequest::put(path, body)).await
    }

    /// Remove an ephemeral live scan from the scanner.
    ///
    /// # Errors
    /// Returns error if the scan is unknown.
    pub async fn purge(&self, scanner_id: &str, scan_id: &str) -> Result<Value> {
        let path = scan_path(scanner_id, scan_id)?;
        self.client.get_json_with(ApiRequest::delete(path)).await
    }
}

fn scan_path(scanner_id: &str, scan_id: &str) -> Result<String> {
    Ok(format!(
        "/api/v1/livescan/{}/{}/",
        segment(scanner_id, "scanner id")?,
        segment(scan_id, "scan id")?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{json_response, ScriptedTransport};
    use crate::retry::RetryPolicy;
    use crate::transport::RawResponse;
    use reqwest::Method;

    fn client(transport: &std::sync::Arc<ScriptedTransport>) -> Client {
        Client::with_transport(transport.clone(), RetryPolicy::disabled())
    }

    #[tokio::test]
    async fn test_task_body() {
        let transport = ScriptedTransport::new(vec![json_response(200, &json!({"uuid": "t1"}))]);
        let client = client(&transport);
        let options = LiveScanOptions {
            page_timeout: Some(10_000),
            ..LiveScanOptions::default()
        }
        .with_visibility(Visibility::Private)
        .with_header("Accept-Language", "de");

        LiveScan::new(&client)
            .task("de01", "https://example.com", &options)
            .await
            .unwrap();

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/api/v1/livescan/de01/task/");
        assert_eq!(
            request.body,
            Some(json!({
                "task": {"url": "https://example.com", "visibility": "private"},
                "scanner": {"pageTimeout": 10_000, "extraHeaders": {"Accept-Language": "de"}}
            }))
        );
    }

    #[tokio::test]
    async fn test_get_resource_by_type() {
        let transport = ScriptedTransport::new(vec![
            json_response(200, &json!({"task": {"uuid": "r1"}})),
            RawResponse::new(200).with_body("<html></html>"),
            RawResponse::new(200).with_body(vec![0x89, 0x50, 0x4e, 0x47]),
        ]);
        let client = client(&transport);
        let live = LiveScan::new(&client);

        assert!(matches!(
            live.get_resource("de01", LiveScanResourceType::Result, "r1").await.unwrap(),
            LiveScanResource::Json(_)
        ));
        assert_eq!(
            live.get_resource("de01", LiveScanResourceType::Dom, "r1").await.unwrap(),
            LiveScanResource::Text("<html></html>".to_string())
        );
        assert_eq!(
            live.get_resource("de01", LiveScanResourceType::Screenshot, "r1").await.unwrap(),
            LiveScanResource::Bytes(vec![0x89, 0x50, 0x4e, 0x47])
        );
        assert_eq!(
            transport.requests()[2].path,
            "/api/v1/livescan/de01/screenshot/r1"
        );
    }

    #[tokio::test]
    async fn test_store_and_purge() {
        let transport = ScriptedTransport::new(vec![
            json_response(200, &json!({"ok": true})),
            json_response(200, &json!({"ok": true})),
        ]);
        let client = client(&transport);
        let live = LiveScan::new(&client);

        live.store("de01", "s1", Visibility::Unlisted).await.unwrap();
        live.purge("de01", "s1").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(requests[0].body, Some(json!({"task": {"visibility": "unlisted"}})));
        assert_eq!(requests[1].method, Method::DELETE);
        assert_eq!(requests[1].path, "/api/v1/livescan/de01/s1/");
    }
}
