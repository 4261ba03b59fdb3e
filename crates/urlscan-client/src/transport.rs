//! HTTP transport and the raw request/response types.
//!
//! Everything above this module talks to the API through the [`Transport`]
//! trait, so tests can swap the real [`HttpTransport`] for a scripted one.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use urlscan_core::ClientConfig;

/// Name of the authentication header.
pub const API_KEY_HEADER: &str = "API-Key";

// `HeaderName::from_static` only accepts lowercase names.
const API_KEY_HEADER_LOWER: &str = "api-key";

/// Seconds until a rate-limited client may retry.
pub const RESET_AFTER_HEADER: &str = "X-Rate-Limit-Reset-After";

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path starting with `/`
    pub path: String,
    /// Query parameters in order
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Request with the given method and path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// `PUT` request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter if a value is present.
    #[must_use]
    pub fn with_query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first query parameter with this name.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A response as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Headers with lowercased names
    pub headers: HashMap<String, String>,
    /// Body bytes
    pub body: Vec<u8>,
    /// Final URL of the request
    pub url: String,
}

/// Rate-limit state reported by the server on a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Action the limit applies to (e.g. `search`)
    pub action: String,
    /// Requests left in the current window
    pub remaining: u64,
    /// When the window resets
    pub reset: DateTime<Utc>,
}

impl RawResponse {
    /// Empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            url: String::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body.
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as (lossy) UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parsed `X-Rate-Limit-Reset-After`, rounded up to whole seconds.
    ///
    /// Returns `None` when the header is missing, not a number, or negative.
    #[must_use]
    pub fn reset_after(&self) -> Option<Duration> {
        let seconds: f64 = self.header(RESET_AFTER_HEADER)?.trim().parse().ok()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = seconds.ceil() as u64;
        Some(Duration::from_secs(whole))
    }

    /// Rate-limit headers, if the server sent all three.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        let action = self.header("X-Rate-Limit-Action")?.to_string();
        let remaining = self.header("X-Rate-Limit-Remaining")?.trim().parse().ok()?;
        let reset = DateTime::parse_from_rfc3339(self.header("X-Rate-Limit-Reset")?.trim())
            .ok()?
            .with_timezone(&Utc);
        Some(RateLimitInfo {
            action,
            remaining,
            reset,
        })
    }
}

/// Something that can send an [`ApiRequest`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the whole response.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    /// Returns error only for network-level failures.
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport that authenticates every request with the configured key.
    ///
    /// # Errors
    /// Returns error if the key or user agent are not valid header values,
    /// the proxy URL is invalid, or the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(config.api_key.expose()).map_err(|_| {
            ClientError::InvalidArgument("API key contains invalid header characters".to_string())
        })?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER_LOWER), key);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|_| {
                ClientError::InvalidArgument(format!("invalid user agent '{}'", config.user_agent))
            })?,
        );

        let redirect = if config.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(!config.verify);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(
            "{} {} -> {} in {:?}",
            request.method,
            request.path,
            status,
            started.elapsed()
        );

        let raw = RawResponse {
            status,
            headers,
            body,
            url,
        };
        if let Some(limit) = raw.rate_limit() {
            debug!(
                "Rate limit for '{}': {} remaining until {}",
                limit.action, limit.remaining, limit.reset
            );
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reset_after_rounds_up() {
        let response = RawResponse::new(429).with_header(RESET_AFTER_HEADER, "2.3");
        assert_eq!(response.reset_after(), Some(Duration::from_secs(3)));

        let response = RawResponse::new(429).with_header(RESET_AFTER_HEADER, "4");
        assert_eq!(response.reset_after(), Some(Duration::from_secs(4)));

        let response = RawResponse::new(429).with_header(RESET_AFTER_HEADER, "0");
        assert_eq!(response.reset_after(), Some(Duration::ZERO));
    }

    #[test]
    fn test_reset_after_rejects_garbage() {
        assert_eq!(RawResponse::new(429).reset_after(), None);
        for bad in ["soon", "-1", "NaN", "inf"] {
            let response = RawResponse::new(429).with_header(RESET_AFTER_HEADER, bad);
            assert_eq!(response.reset_after(), None, "value {bad}");
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = RawResponse::new(200).with_header("X-Rate-Limit-Action", "search");
        assert_eq!(response.header("x-rate-limit-action"), Some("search"));
        assert_eq!(response.header("X-RATE-LIMIT-ACTION"), Some("search"));
    }

    #[test]
    fn test_rate_limit_info() {
        let response = RawResponse::new(200)
            .with_header("X-Rate-Limit-Action", "search")
            .with_header("X-Rate-Limit-Remaining", "42")
            .with_header("X-Rate-Limit-Reset", "2026-01-02T00:00:00.000Z");
        let info = response.rate_limit().unwrap();
        assert_eq!(info.action, "search");
        assert_eq!(info.remaining, 42);
        assert_eq!(info.reset.to_rfc3339(), "2026-01-02T00:00:00+00:00");

        let partial = RawResponse::new(200).with_header("X-Rate-Limit-Remaining", "1");
        assert!(partial.rate_limit().is_none());
    }

    #[test]
    fn test_api_key_header_names_agree() {
        assert!(API_KEY_HEADER.eq_ignore_ascii_case(API_KEY_HEADER_LOWER));
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("/api/v1/search/")
            .with_query("q", "domain:example.com")
            .with_query_opt("collapse", None::<String>)
            .with_query("size", 100);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.query.len(), 2);
        assert_eq!(request.query_value("size"), Some("100"));
        assert_eq!(request.query_value("collapse"), None);

        let request = ApiRequest::post("/api/v1/scan/", json!({"url": "https://example.com"}));
        assert_eq!(request.method, Method::POST);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_json_body() {
        let response = RawResponse::new(200).with_json(&json!({"uuid": "abc"}));
        let value: Value = response.json().unwrap();
        assert_eq!(value["uuid"], "abc");
        assert!(response.is_success());
        assert!(RawResponse::new(200).json::<Value>().is_err());
    }
}
