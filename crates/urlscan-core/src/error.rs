//! Core error types shared by the urlscan crates.
//!
//! Configuration problems and input validation failures are reported here.
//! Errors that involve talking to the API live in `urlscan-client`.

use thiserror::Error;

/// Central error type for configuration and validation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors (resolution, file loading, parsing)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No API key was supplied by parameter, environment or config file
    #[error("no API key configured (pass one explicitly or set URLSCAN_API_KEY)")]
    MissingApiKey,

    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Validation("country must be two letters".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: country must be two letters"
        );

        let err = ConfigError::InvalidValue {
            field: "URLSCAN_RETRY".to_string(),
            reason: "expected a boolean, got 'maybe'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for URLSCAN_RETRY: expected a boolean, got 'maybe'"
        );
    }

    #[test]
    fn test_error_from_config() {
        let core_err: CoreError = ConfigError::MissingApiKey.into();
        assert!(matches!(
            core_err,
            CoreError::Config(ConfigError::MissingApiKey)
        ));
    }
}
