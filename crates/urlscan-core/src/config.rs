//! Client configuration.
//!
//! Every setting is resolved once, when the configuration is built, with the
//! precedence explicit parameter > environment variable > config file >
//! built-in default. Nothing is read from the environment at call time.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://urlscan.io";

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("urlscan-rs/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "URLSCAN_API_KEY";

/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "URLSCAN_BASE_URL";

/// Environment variable toggling rate-limit retries.
pub const ENV_RETRY: &str = "URLSCAN_RETRY";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_FALLBACK_DELAY_SECS: u64 = 1;

/// An urlscan.io API key.
///
/// The key never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting empty or whitespace-only strings.
    pub fn new(key: impl Into<String>) -> ConfigResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(key))
    }

    /// The raw key, for building the request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Rate-limit retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Whether 429 responses are retried after `X-Rate-Limit-Reset-After`
    pub enabled: bool,
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    /// Wait used when a 429 carries no usable reset-after header
    pub fallback_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fallback_delay: Duration::from_secs(DEFAULT_FALLBACK_DELAY_SECS),
        }
    }
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent with every request
    pub api_key: ApiKey,
    /// Base URL without a trailing slash
    pub base_url: String,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry behavior on 429 responses
    pub retry: RetryConfig,
    /// Proxy URL all traffic is routed through
    pub proxy: Option<String>,
    /// Whether TLS certificates are verified
    pub verify: bool,
    /// Whether redirects are followed
    pub follow_redirects: bool,
}

impl ClientConfig {
    /// Build a configuration from an API key, resolving everything else
    /// from the environment and defaults.
    pub fn new(api_key: impl Into<String>) -> ConfigResult<Self> {
        ClientConfigBuilder::new().api_key(api_key).build()
    }

    /// Start a builder with nothing set.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder collecting explicit parameters before resolution.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    retry_enabled: Option<bool>,
    max_attempts: Option<u32>,
    fallback_delay: Option<Duration>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    proxy: Option<String>,
    verify: Option<bool>,
    follow_redirects: Option<bool>,
    file: Option<FileConfig>,
}

impl ClientConfigBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Enable or disable retrying rate-limited requests.
    #[must_use]
    pub fn retry(mut self, enabled: bool) -> Self {
        self.retry_enabled = Some(enabled);
        self
    }

    /// Set the total number of attempts per request.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the wait used when a 429 has no reset-after header.
    #[must_use]
    pub fn fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = Some(delay);
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Route all traffic through a proxy, e.g. `http://127.0.0.1:8080`.
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = Some(verify);
        self
    }

    /// Enable or disable following redirects.
    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Use values from a config file as the fallback below the environment.
    #[must_use]
    pub fn file(mut self, file: FileConfig) -> Self {
        self.file = Some(file);
        self
    }

    /// Resolve the configuration against the process environment.
    pub fn build(self) -> ConfigResult<ClientConfig> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration against a custom environment lookup.
    pub fn build_with_env<F>(self, env: F) -> ConfigResult<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = self.file.unwrap_or_default();

        let api_key = self
            .api_key
            .or_else(|| non_empty(env(ENV_API_KEY)))
            .or(file.api_key)
            .ok_or(ConfigError::MissingApiKey)
            .and_then(ApiKey::new)?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => non_empty(env(ENV_BASE_URL))
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = normalize_base_url(&base_url)?;

        let env_retry = match non_empty(env(ENV_RETRY)) {
            Some(raw) => Some(parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                field: ENV_RETRY.to_string(),
                reason: format!("expected a boolean, got '{raw}'"),
            })?),
            None => None,
        };
        let enabled = self.retry_enabled.or(env_retry).or(file.retry).unwrap_or(false);

        let max_attempts = self
            .max_attempts
            .or(file.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout = self
            .timeout
            .or_else(|| file.timeout_secs.map(Duration::from_secs))
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let proxy = match self.proxy.or(file.proxy) {
            Some(proxy) => Some(validate_proxy(&proxy)?),
            None => None,
        };
        let verify = self.verify.or(file.verify).unwrap_or(true);
        if !verify {
            tracing::warn!("TLS certificate verification is disabled");
        }

        tracing::debug!(
            "Resolved client config: base_url={}, retry={}, max_attempts={}, proxy={}",
            base_url,
            enabled,
            max_attempts,
            proxy.is_some()
        );

        Ok(ClientConfig {
            api_key,
            base_url,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout,
            retry: RetryConfig {
                enabled,
                max_attempts,
                fallback_delay: self
                    .fallback_delay
                    .unwrap_or(Duration::from_secs(DEFAULT_FALLBACK_DELAY_SECS)),
            },
            proxy,
            verify,
            follow_redirects: self
                .follow_redirects
                .or(file.follow_redirects)
                .unwrap_or(true),
        })
    }
}

/// Settings read from `config.toml`.
///
/// Every field is optional; anything missing falls through to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// API key
    pub api_key: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Retry toggle
    pub retry: Option<bool>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Attempts per request
    pub max_attempts: Option<u32>,
    /// Proxy URL
    pub proxy: Option<String>,
    /// TLS certificate verification toggle
    pub verify: Option<bool>,
    /// Redirect toggle
    pub follow_redirects: Option<bool>,
}

impl FileConfig {
    /// Load the config file from the standard location.
    ///
    /// A missing file is not an error and yields an empty config.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load a config file from an explicit path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Path of the config file: `~/.config/urlscan/config.toml` (or platform equivalent).
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("io", "urlscan", "urlscan").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_base_url(url: &str) -> ConfigResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(ConfigError::InvalidValue {
            field: "base_url".to_string(),
            reason: format!("must be an absolute http(s) URL, got '{url}'"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_proxy(url: &str) -> ConfigResult<String> {
    let trimmed = url.trim();
    let scheme_ok = ["http://", "https://", "socks5://", "socks5h://"]
        .iter()
        .any(|scheme| trimmed.starts_with(scheme));
    if !scheme_ok || trimmed.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            field: "proxy".to_string(),
            reason: format!("must be an http(s) or socks5 URL, got '{url}'"),
        });
    }
    Ok(trimmed.to_string())
}
