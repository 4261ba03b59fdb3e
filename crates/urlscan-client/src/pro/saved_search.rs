//! Saved searches.
//!
//! A saved search is a stored query that runs continuously against new
//! scans or hostnames; subscriptions turn its matches into notifications.

use crate::client::{segment, Client};
use crate::error::{ClientError, Result};
use crate::transport::ApiRequest;
use serde::Serialize;
use serde_json::{json, Value};
use urlscan_core::{Permission, Tlp};

const SEARCHES_PATH: &str = "/api/v1/user/searches/";

/// Data a saved search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedSearchDataSource {
    /// Observed hostnames
    Hostnames,
    /// Scans
    Scans,
}

/// Definition of a saved search, used to create or replace one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchOptions {
    /// Data source
    pub datasource: SavedSearchDataSource,
    /// Search API query string
    pub query: String,
    /// Short display name
    pub name: String,
    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Long description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    /// TLP marking shown to other Pro users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlp: Option<Tlp>,
    /// Tags applied to matching items; prefix with `pro.`, `public.`,
    /// `private.` or `team.` to scope them
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_tags: Vec<String>,
    /// Who else can see the search
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

impl SavedSearchOptions {
    /// Saved search with only the required fields set.
    #[must_use]
    pub fn new(
        datasource: SavedSearchDataSource,
        query: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            datasource,
            query: query.into(),
            name: name.into(),
            description: None,
            long_description: None,
            tlp: None,
            user_tags: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Set the short description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the TLP marking.
    #[must_use]
    pub fn with_tlp(mut self, tlp: Tlp) -> Self {
        self.tlp = Some(tlp);
        self
    }

    /// Add a user tag.
    #[must_use]
    pub fn with_user_tag(mut self, tag: impl Into<String>) -> Self {
        self.user_tags.push(tag.into());
        self
    }

    /// Add a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    fn body(&self) -> Result<Value> {
        if self.query.trim().is_empty() || self.name.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "saved search needs a query and a name".to_string(),
            ));
        }
        Ok(json!({ "search": self }))
    }
}

/// Saved search API handle.
#[derive(Debug, Clone, Copy)]
pub struct SavedSearch<'a> {
    client: &'a Client,
}

impl<'a> SavedSearch<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Saved searches of the current user.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_list(&self) -> Result<Value> {
        self.client.get_json(SEARCHES_PATH).await
    }

    /// Create a saved search.
    ///
    /// # Errors
    /// Returns error if the definition is incomplete or rejected.
    pub async fn create(&self, options: &SavedSearchOptions) -> Result<Value> {
        let request = ApiRequest::post(SEARCHES_PATH, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Replace the definition of a saved search.
    ///
    /// # Errors
    /// Returns error if the search is unknown or the definition is rejected.
    pub async fn update(&self, search_id: &str, options: &SavedSearchOptions) -> Result<Value> {
        let request = ApiRequest::put(search_path(search_id)?, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Delete a saved search.
    ///
    /// # Errors
    /// Returns error if the search is unknown.
    pub async fn remove(&self, search_id: &str) -> Result<Value> {
        self.client
            .get_json_with(ApiRequest::delete(search_path(search_id)?))
            .await
    }

    /// Current matches of a saved search.
    ///
    /// # Errors
    /// Returns error if the search is unknown.
    pub async fn get_results(&self, search_id: &str) -> Result<Value> {
        let path = format!("{}results/", search_path(search_id)?);
        self.client.get_json(&path).await
    }
}

fn search_path(search_id: &str) -> Result<String> {
    Ok(format!(
        "{SEARCHES_PATH}{}/",
        segment(search_id, "saved search id")?
    ))
}
