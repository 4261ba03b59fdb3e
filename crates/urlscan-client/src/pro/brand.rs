//! Brand monitoring.

use crate::client::Client;
use crate::error::Result;
use serde_json::Value;

/// Brand API handle.
#[derive(Debug, Clone, Copy)]
pub struct Brand<'a> {
    client: &'a Client,
}

impl<'a> Brand<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Brands that can be monitored, with their identifiers.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_available_brands(&self) -> Result<Value> {
        self.client.get_json("/api/v1/pro/availableBrands").await
    }

    /// Brands with detection counts and the most recent detection.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_brands(&self) -> Result<Value> {
        self.client.get_json("/api/v1/pro/brands").await
    }
}
