//! Changing the visibility of existing scans.

use crate::client::{segment, Client};
use crate::error::Result;
use crate::transport::ApiRequest;
use serde_json::{json, Value};
use urlscan_core::UpdateVisibility;

/// Visibility API handle.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityApi<'a> {
    client: &'a Client,
}

impl<'a> VisibilityApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Change the visibility of a scan.
    ///
    /// # Errors
    /// Returns error if the scan is unknown or not owned by the key.
    pub async fn update(&self, scan_id: &str, visibility: UpdateVisibility) -> Result<Value> {
        let request = ApiRequest::put(path(scan_id)?, json!({ "visibility": visibility }));
        self.client.get_json_with(request).await
    }

    /// Restore the visibility the scan was submitted with.
    ///
    /// # Errors
    /// Returns error if the scan is unknown or not owned by the key.
    pub async fn reset(&self, scan_id: &str) -> Result<Value> {
        self.client
            .get_json_with(ApiRequest::delete(path(scan_id)?))
            .await
    }
}

fn path(scan_id: &str) -> Result<String> {
    Ok(format!(
        "/api/v1/result/{}/visibility/",
        segment(scan_id, "scan id")?
    ))
}
