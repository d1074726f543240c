//! Error types for Galley Core
//!
//! The recovery pipeline itself never fails; the only fallible surface in
//! this crate is loading and checking a [`RecoveryConfig`](crate::RecoveryConfig).

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML document could not be deserialized
    #[error("invalid TOML config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// JSON document could not be deserialized
    #[error("invalid JSON config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A field holds a value the pipeline cannot work with
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid value error for field
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
