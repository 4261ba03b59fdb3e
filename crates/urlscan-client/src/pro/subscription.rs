//! Subscriptions to saved searches.

use crate::client::{segment, Client};
use crate::error::{ClientError, Result};
use crate::transport::ApiRequest;
use serde::Serialize;
use serde_json::{json, Value};
use urlscan_core::{Frequency, IncidentVisibility, Permission, SearchDataSource, WeekDay};

const SUBSCRIPTIONS_PATH: &str = "/api/v1/user/subscriptions/";

/// When a subscription match opens an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentCreationMode {
    /// Never
    None,
    /// Use the account default
    Default,
    /// For every match
    Always,
    /// Unless an incident for the observable is already open
    IgnoreIfExists,
}

/// Attribute an incident opened by a subscription watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncidentWatchKey {
    /// `scans/page.url`
    #[serde(rename = "scans/page.url")]
    ScanPageUrl,
    /// `scans/page.domain`
    #[serde(rename = "scans/page.domain")]
    ScanPageDomain,
    /// `scans/page.ip`
    #[serde(rename = "scans/page.ip")]
    ScanPageIp,
    /// `scans/page.apexDomain`
    #[serde(rename = "scans/page.apexDomain")]
    ScanPageApexDomain,
    /// `hostnames/hostname`
    #[serde(rename = "hostnames/hostname")]
    Hostname,
    /// `hostnames/ip`
    #[serde(rename = "hostnames/ip")]
    HostnameIp,
    /// `hostnames/domain`
    #[serde(rename = "hostnames/domain")]
    HostnameDomain,
}

/// Definition of a subscription, used to create or replace one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOptions {
    /// Saved searches the subscription follows
    pub search_ids: Vec<String>,
    /// Notification frequency
    pub frequency: Frequency,
    /// Addresses receiving notifications
    pub email_addresses: Vec<String>,
    /// Display name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether notifications are sent
    pub is_active: bool,
    /// Ignore the week day and time restrictions
    pub ignore_time: bool,
    /// Days notifications are generated on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub week_days: Vec<WeekDay>,
    /// Team permissions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    /// Notification channels
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channel_ids: Vec<String>,
    /// Channels notified about incidents
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub incident_channel_ids: Vec<String>,
    /// Incident profile used for new incidents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_profile_id: Option<String>,
    /// Visibility of incident scans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_visibility: Option<IncidentVisibility>,
    /// When matches open incidents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_creation_mode: Option<IncidentCreationMode>,
    /// What new incidents watch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_watch_keys: Option<IncidentWatchKey>,
}

impl SubscriptionOptions {
    /// Active subscription for the given searches, without notification targets.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, search_ids: I, frequency: Frequency) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_ids: search_ids.into_iter().map(Into::into).collect(),
            frequency,
            email_addresses: Vec::new(),
            name: name.into(),
            description: None,
            is_active: true,
            ignore_time: false,
            week_days: Vec::new(),
            permissions: Vec::new(),
            channel_ids: Vec::new(),
            incident_channel_ids: Vec::new(),
            incident_profile_id: None,
            incident_visibility: None,
            incident_creation_mode: None,
            incident_watch_keys: None,
        }
    }

    /// Add a notification address.
    #[must_use]
    pub fn with_email(mut self, address: impl Into<String>) -> Self {
        self.email_addresses.push(address.into());
        self
    }

    /// Add a notification channel.
    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_ids.push(channel_id.into());
        self
    }

    /// Restrict notifications to the given days.
    #[must_use]
    pub fn with_week_days(mut self, days: impl IntoIterator<Item = WeekDay>) -> Self {
        self.week_days = days.into_iter().collect();
        self
    }

    /// Pause or resume notifications.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Open incidents for matches.
    #[must_use]
    pub fn with_incidents(
        mut self,
        mode: IncidentCreationMode,
        visibility: IncidentVisibility,
        watch: IncidentWatchKey,
    ) -> Self {
        self.incident_creation_mode = Some(mode);
        self.incident_visibility = Some(visibility);
        self.incident_watch_keys = Some(watch);
        self
    }

    fn body(&self) -> Result<Value> {
        if self.search_ids.is_empty() {
            return Err(ClientError::InvalidArgument(
                "subscription needs at least one saved search".to_string(),
            ));
        }
        Ok(json!({ "subscription": self }))
    }
}

/// Subscription API handle.
#[derive(Debug, Clone, Copy)]
pub struct Subscription<'a> {
    client: &'a Client,
}

impl<'a> Subscription<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Subscriptions of the current user.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_subscriptions(&self) -> Result<Value> {
        self.client.get_json(SUBSCRIPTIONS_PATH).await
    }

    /// Create a subscription.
    ///
    /// # Errors
    /// Returns error if the definition is incomplete or rejected.
    pub async fn create(&self, options: &SubscriptionOptions) -> Result<Value> {
        let request = ApiRequest::post(SUBSCRIPTIONS_PATH, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Replace the settings of a subscription.
    ///
    /// # Errors
    /// Returns error if the subscription is unknown or the definition is rejected.
    pub async fn update(
        &self,
        subscription_id: &str,
        options: &SubscriptionOptions,
    ) -> Result<Value> {
        let request = ApiRequest::put(subscription_path(subscription_id)?, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Delete a subscription.
    ///
    /// # Errors
    /// Returns error if the subscription is unknown.
    pub async fn delete_subscription(&self, subscription_id: &str) -> Result<Value> {
        self.client
            .get_json_with(ApiRequest::delete(subscription_path(subscription_id)?))
            .await
    }

    /// Matches of a subscription in one data source.
    ///
    /// # Errors
    /// Returns error if the subscription is unknown.
    pub async fn get_results(
        &self,
        subscription_id: &str,
        datasource: SearchDataSource,
    ) -> Result<Value> {
        let path = format!(
            "{}results/{}/",
            subscription_path(subscription_id)?,
            datasource.as_str()
        );
        self.client.get_json(&path).await
    }
}

fn subscription_path(subscription_id: &str) -> Result<String> {
    Ok(format!(
        "{SUBSCRIPTIONS_PATH}{}/",
        segment(subscription_id, "subscription id")?
    ))
}
