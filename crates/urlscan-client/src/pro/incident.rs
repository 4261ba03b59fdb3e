//! Incidents.
//!
//! An incident keeps re-scanning an observable (hostname, domain, IP or
//! URL) on a schedule and records every change as an incident state.

use crate::client::{segment, Client};
use crate::error::{ClientError, Result};
use crate::transport::ApiRequest;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use urlscan_core::IncidentVisibility;

const INCIDENTS_PATH: &str = "/api/v1/user/incidents";

/// How the scan interval reacts to the observable's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanIntervalMode {
    /// Keep the configured interval
    Manual,
    /// Switch to the `after_*` intervals on suspension or detection
    Automatic,
}

/// What an incident monitors for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchedAttribute {
    /// Verdicts and detections
    Detections,
    /// TLS certificate
    Tls,
    /// DNS records
    Dns,
    /// Labels
    Labels,
    /// Page content
    Page,
    /// Metadata
    Meta,
    /// IP address
    Ip,
}

/// Definition of an incident, used to create or update one.
///
/// Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentOptions {
    /// Hostname, domain, IP or URL to observe
    pub observable: String,
    /// Visibility of the triggered scans
    pub visibility: IncidentVisibility,
    /// Channels notified about the incident
    pub channels: Vec<String>,
    /// Time between full scans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_interval: Option<u64>,
    /// Interval mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_interval_mode: Option<ScanIntervalMode>,
    /// Monitored attributes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub watched_attributes: Vec<WatchedAttribute>,
    /// Browser user agents to scan with
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_agents: Vec<String>,
    /// User agents used per interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agents_per_interval: Option<u32>,
    /// ISO 3166-1 countries to scan from
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    /// Countries used per interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countries_per_interval: Option<u32>,
    /// Close this long after the observable was suspended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_delay_suspended: Option<u64>,
    /// Close this long after the observable became inactive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_delay_inactive: Option<u64>,
    /// Close this long after the observable turned malicious
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_delay_malicious: Option<u64>,
    /// Scan interval once suspended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_interval_after_suspended: Option<u64>,
    /// Scan interval once malicious
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_interval_after_malicious: Option<u64>,
    /// Incident profile to start from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_profile: Option<String>,
    /// Close automatically after this long
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after: Option<u64>,
}

impl IncidentOptions {
    /// Incident for `observable` with server defaults for everything optional.
    #[must_use]
    pub fn new(observable: impl Into<String>, visibility: IncidentVisibility) -> Self {
        Self {
            observable: observable.into(),
            visibility,
            channels: Vec::new(),
            scan_interval: None,
            scan_interval_mode: None,
            watched_attributes: Vec::new(),
            user_agents: Vec::new(),
            user_agents_per_interval: None,
            countries: Vec::new(),
            countries_per_interval: None,
            stop_delay_suspended: None,
            stop_delay_inactive: None,
            stop_delay_malicious: None,
            scan_interval_after_suspended: None,
            scan_interval_after_malicious: None,
            incident_profile: None,
            expire_after: None,
        }
    }

    /// Notify a channel.
    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channels.push(channel_id.into());
        self
    }

    /// Set the scan interval in seconds.
    #[must_use]
    pub fn with_scan_interval(mut self, seconds: u64, mode: ScanIntervalMode) -> Self {
        self.scan_interval = Some(seconds);
        self.scan_interval_mode = Some(mode);
        self
    }

    /// Monitor an attribute.
    #[must_use]
    pub fn watching(mut self, attribute: WatchedAttribute) -> Self {
        self.watched_attributes.push(attribute);
        self
    }

    /// Scan from these countries.
    #[must_use]
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Close the incident automatically after `seconds`.
    #[must_use]
    pub fn with_expire_after(mut self, seconds: u64) -> Self {
        self.expire_after = Some(seconds);
        self
    }

    fn body(&self) -> Result<Value> {
        if self.observable.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "incident observable must not be empty".to_string(),
            ));
        }
        Ok(json!({ "incident": self }))
    }
}

/// Incident API handle.
#[derive(Debug, Clone, Copy)]
pub struct Incident<'a> {
    client: &'a Client,
}

impl<'a> Incident<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Open an incident.
    ///
    /// # Errors
    /// Returns error if the definition is rejected.
    pub async fn create(&self, options: &IncidentOptions) -> Result<Value> {
        let request = ApiRequest::post(INCIDENTS_PATH, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Details of an incident.
    ///
    /// # Errors
    /// Returns error if the incident is unknown.
    pub async fn get(&self, incident_id: &str) -> Result<Value> {
        self.client.get_json(&incident_path(incident_id)?).await
    }

    /// Update the runtime options of an incident.
    ///
    /// # Errors
    /// Returns error if the incident is unknown or the definition is rejected.
    pub async fn update(&self, incident_id: &str, options: &IncidentOptions) -> Result<Value> {
        let request = ApiRequest::put(incident_path(incident_id)?, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Stop an incident.
    ///
    /// # Errors
    /// Returns error if the incident is unknown.
    pub async fn close(&self, incident_id: &str) -> Result<Value> {
        self.action(Method::PUT, incident_id, "close").await
    }

    /// Restart a closed incident with fresh states and a later expiry.
    ///
    /// # Errors
    /// Returns error if the incident is unknown.
    pub async fn restart(&self, incident_id: &str) -> Result<Value> {
        self.action(Method::PUT, incident_id, "restart").await
    }

    /// Copy an incident without its history.
    ///
    /// # Errors
    /// Returns error if the incident is unknown.
    pub async fn copy(&self, incident_id: &str) -> Result<Value> {
        self.action(Method::POST, incident_id, "copy").await
    }

    /// Copy an incident together with its states.
    ///
    /// # Errors
    /// Returns error if the incident is unknown.
    pub async fn fork(&self, incident_id: &str) -> Result<Value> {
        self.action(Method::POST, incident_id, "fork").await
    }

    /// Attributes accepted in [`IncidentOptions::watched_attributes`].
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_watchable_attributes(&self) -> Result<Value> {
        self.client
            .get_json("/api/v1/user/watchableAttributes")
            .await
    }

    /// Recorded states of an incident.
    ///
    /// # Errors
    /// Returns error if the incident is unknown.
    pub async fn get_states(&self, incident_id: &str) -> Result<Value> {
        let path = format!(
            "/api/v1/user/incidentstates/{}/",
            segment(incident_id, "incident id")?
        );
        self.client.get_json(&path).await
    }

    async fn action(&self, method: Method, incident_id: &str, action: &str) -> Result<Value> {
        let path = format!("{}/{action}", incident_path(incident_id)?);
        let request = ApiRequest::new(method, path).with_body(json!({}));
        self.client.get_json_with(request).await
    }
}

fn incident_path(incident_id: &str) -> Result<String> {
    Ok(format!(
        "{INCIDENTS_PATH}/{}",
        segment(incident_id, "incident id")?
    ))
}
