//! Recovery configuration
//!
//! Every knob has a default that matches production behaviour, so most
//! callers use [`RecoveryConfig::default`]. Configs can also be loaded from
//! TOML or JSON; absent fields keep their defaults.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Recovery pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Object keys that may carry the annotation list, checked in order
    pub list_keys: Vec<String>,
    /// Text used when an item's `original` is empty or unrecoverable
    pub placeholder: String,
    /// Maximum items synthesized from reasoning-trace phrases
    pub max_trace_items: usize,
    /// Upper bound on bracket start positions the boundary locator tries
    pub max_boundary_starts: usize,
    /// Maximum envelope nesting depth the normalizer unwraps
    pub max_envelope_depth: usize,
    /// Anchor items without a reported span at the first occurrence of
    /// `original` in the document
    pub anchor_spans: bool,
    /// Category assigned to items rebuilt by field harvesting
    pub harvest_category: String,
    /// Category assigned to items synthesized from the reasoning trace
    pub trace_category: String,
}

impl RecoveryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With annotation list keys
    #[must_use]
    pub fn with_list_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// With placeholder text
    #[inline]
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// With trace item cap
    #[inline]
    #[must_use]
    pub fn with_max_trace_items(mut self, max: usize) -> Self {
        self.max_trace_items = max;
        self
    }

    /// With boundary start cap
    #[inline]
    #[must_use]
    pub fn with_max_boundary_starts(mut self, max: usize) -> Self {
        self.max_boundary_starts = max;
        self
    }

    /// With span anchoring enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_anchor_spans(mut self, anchor: bool) -> Self {
        self.anchor_spans = anchor;
        self
    }

    /// Load from TOML, then validate
    ///
    /// # Errors
    /// Returns error if TOML is malformed or a value is out of range
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from JSON, then validate
    ///
    /// # Errors
    /// Returns error if JSON is malformed or a value is out of range
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the pipeline relies on
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for the first bad field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.list_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "list_keys",
                "at least one non-blank key is required",
            ));
        }
        if self.placeholder.trim().is_empty() {
            return Err(ConfigError::invalid_value("placeholder", "must not be blank"));
        }
        if self.max_boundary_starts == 0 {
            return Err(ConfigError::invalid_value(
                "max_boundary_starts",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Replace every value [`validate`](Self::validate) rejects with its default
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.list_keys.iter().all(|k| k.trim().is_empty()) {
            self.list_keys = defaults.list_keys;
        }
        if self.placeholder.trim().is_empty() {
            self.placeholder = defaults.placeholder;
        }
        if self.max_boundary_starts == 0 {
            self.max_boundary_starts = defaults.max_boundary_starts;
        }
        self
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            list_keys: [
                "items",
                "annotations",
                "errors",
                "issues",
                "results",
                "corrections",
                "suggestions",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            placeholder: "(unavailable)".to_string(),
            max_trace_items: 3,
            max_boundary_starts: 4096,
            max_envelope_depth: 4,
            anchor_spans: false,
            harvest_category: "general".to_string(),
            trace_category: "reasoning".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_valid() {
        let config = RecoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.list_keys[0], "items");
        assert_eq!(config.max_trace_items, 3);
    }

    #[test]
    fn builder_methods() {
        let config = RecoveryConfig::new()
            .with_list_keys(["findings"])
            .with_placeholder("n/a")
            .with_max_trace_items(5)
            .with_anchor_spans(true);
        assert_eq!(config.list_keys, vec!["findings".to_string()]);
        assert_eq!(config.placeholder, "n/a");
        assert_eq!(config.max_trace_items, 5);
        assert!(config.anchor_spans);
    }

    #[test]
    fn toml_partial_overrides_keep_defaults() {
        let config = RecoveryConfig::from_toml_str(
            r#"
            placeholder = "[missing]"
            max_trace_items = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.placeholder, "[missing]");
        assert_eq!(config.max_trace_items, 1);
        assert_eq!(config.list_keys, RecoveryConfig::default().list_keys);
    }

    #[test]
    fn json_loading() {
        let config =
            RecoveryConfig::from_json_str(r#"{"list_keys": ["edits"], "anchor_spans": true}"#)
                .unwrap();
        assert_eq!(config.list_keys, vec!["edits".to_string()]);
        assert!(config.anchor_spans);
    }

    #[test]
    fn rejects_blank_placeholder() {
        let err = RecoveryConfig::from_toml_str(r#"placeholder = "  ""#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "placeholder",
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_list_keys_and_zero_cap() {
        let config = RecoveryConfig::new().with_list_keys(Vec::<String>::new());
        assert!(config.validate().is_err());

        let config = RecoveryConfig::new().with_max_boundary_starts(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn sanitized_restores_rejected_values() {
        let config = RecoveryConfig::new()
            .with_placeholder(" ")
            .with_list_keys(["", "findings"])
            .with_max_boundary_starts(0)
            .sanitized();
        assert_eq!(config.placeholder, "(unavailable)");
        assert_eq!(config.list_keys, vec![String::new(), "findings".to_string()]);
        assert_eq!(config.max_boundary_starts, 4096);
        assert!(config.validate().is_ok());

        let config = RecoveryConfig::new().with_list_keys(["  "]).sanitized();
        assert_eq!(config.list_keys, RecoveryConfig::default().list_keys);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = RecoveryConfig::from_toml_str("placeholder = ").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToml(_)));
    }
}
