//! Notification channels.

use crate::client::{segment, Client};
use crate::error::{ClientError, Result};
use crate::transport::ApiRequest;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::OnceLock;
use urlscan_core::{Frequency, Permission, WeekDay};

const CHANNELS_PATH: &str = "/api/v1/user/channels/";

fn utc_time_regex() -> &'static Regex {
    static UTC_TIME_REGEX: OnceLock<Regex> = OnceLock::new();
    UTC_TIME_REGEX.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid regex"))
}

/// Delivery mechanism of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// HTTP callback
    Webhook,
    /// Email
    Email,
}

/// Definition of a channel, used to create or replace one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOptions {
    /// Delivery mechanism
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Display name
    pub name: String,
    /// Callback URL, required for webhooks
    #[serde(rename = "webhookURL", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Notification frequency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    /// Recipients, required for email channels
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email_addresses: Vec<String>,
    /// `HH:MM` (UTC) daily digests are sent at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_time: Option<String>,
    /// Whether the channel delivers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Whether new subscriptions use this channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    /// Ignore the week day and time restrictions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_time: Option<bool>,
    /// Days notifications are generated on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub week_days: Vec<WeekDay>,
    /// Team permissions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

impl ChannelOptions {
    /// Webhook channel posting to `url`.
    #[must_use]
    pub fn webhook(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(url.into()),
            ..Self::empty(ChannelType::Webhook, name.into())
        }
    }

    /// Email channel delivering to `addresses`.
    #[must_use]
    pub fn email<I, S>(name: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            email_addresses: addresses.into_iter().map(Into::into).collect(),
            ..Self::empty(ChannelType::Email, name.into())
        }
    }

    fn empty(channel_type: ChannelType, name: String) -> Self {
        Self {
            channel_type,
            name,
            webhook_url: None,
            frequency: None,
            email_addresses: Vec::new(),
            utc_time: None,
            is_active: None,
            is_default: None,
            ignore_time: None,
            week_days: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Set the notification frequency.
    #[must_use]
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Send daily digests at `HH:MM` UTC.
    #[must_use]
    pub fn with_utc_time(mut self, time: impl Into<String>) -> Self {
        self.utc_time = Some(time.into());
        self
    }

    /// Activate or deactivate the channel.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    /// Add a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    fn body(&self) -> Result<Value> {
        let missing = match self.channel_type {
            ChannelType::Webhook if self.webhook_url.as_deref().unwrap_or("").is_empty() => {
                Some("webhook channel needs a webhook URL")
            }
            ChannelType::Email if self.email_addresses.is_empty() => {
                Some("email channel needs at least one address")
            }
            _ => None,
        };
        if let Some(reason) = missing {
            return Err(ClientError::InvalidArgument(reason.to_string()));
        }
        if let Some(time) = &self.utc_time {
            if !utc_time_regex().is_match(time) {
                return Err(ClientError::InvalidArgument(format!(
                    "utc time must be HH:MM, got '{time}'"
                )));
            }
        }
        Ok(json!({ "channel": self }))
    }
}

/// Channel API handle.
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    client: &'a Client,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Channels of the current user.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_channels(&self) -> Result<Value> {
        self.client.get_json(CHANNELS_PATH).await
    }

    /// Create a channel.
    ///
    /// # Errors
    /// Returns error if the definition is incomplete or rejected.
    pub async fn create(&self, options: &ChannelOptions) -> Result<Value> {
        let request = ApiRequest::post(CHANNELS_PATH, options.body()?);
        self.client.get_json_with(request).await
    }

    /// Details of a channel.
    ///
    /// # Errors
    /// Returns error if the channel is unknown.
    pub async fn get(&self, channel_id: &str) -> Result<Value> {
        self.client.get_json(&channel_path(channel_id)?).await
    }

    /// Replace the settings of a channel.
    ///
    /// # Errors
    /// Returns error if the channel is unknown or the definition is rejected.
    pub async fn update(&self, channel_id: &str, options: &ChannelOptions) -> Result<Value> {
        let request = ApiRequest::put(channel_path(channel_id)?, options.body()?);
        self.client.get_json_with(request).await
    }
}

fn channel_path(channel_id: &str) -> Result<String> {
    Ok(format!(
        "{CHANNELS_PATH}{}/",
        segment(channel_id, "channel id")?
    ))
}
