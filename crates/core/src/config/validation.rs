//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `cache_prefix` or `cache_version` is empty
    /// - `api_prefix` does not start and end with `/`
    /// - `precache` is empty or holds a relative or protocol-relative (`//host`) path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `undo_window_secs` is 0 or exceeds 10 minutes
    /// - `user_agent` or `confirmation_phrase` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        if self.api_prefix.len() < 2 || !self.api_prefix.starts_with('/') || !self.api_prefix.ends_with('/') {
            return Err(invalid("api_prefix", "must start and end with '/'"));
        }

        if self.precache.is_empty() {
            return Err(invalid("precache", "must list at least the document root"));
        }
        if let Some(path) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "precache".into(),
                reason: format!("path must be absolute: {path}"),
            });
        }
        if let Some(path) = self.precache.iter().find(|p| p.starts_with("//")) {
            return Err(ConfigError::Invalid {
                field: "precache".into(),
                reason: format!("path must stay on the worker origin: {path}"),
            });
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.undo_window_secs == 0 || self.undo_window_secs > 600 {
            return Err(invalid("undo_window_secs", "must be between 1 and 600 seconds"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.confirmation_phrase.is_empty() {
            return Err(invalid("confirmation_phrase", "must not be empty"));
        }

        if !self.precache.iter().any(|p| p == "/") {
            tracing::warn!(
                precache_count = self.precache.len(),
                "document root is not precached; offline navigations will have no fallback"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin() {
        let config = AppConfig { origin: "ftp://wallai.test".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "origin");

        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "origin");
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "cache_version");
    }

    #[test]
    fn test_validate_api_prefix() {
        for bad in ["api/", "/api", "/", ""] {
            let config = AppConfig { api_prefix: bad.into(), ..Default::default() };
            assert_eq!(field_of(config.validate()), "api_prefix", "prefix {bad:?}");
        }
    }

    #[test]
    fn test_validate_precache() {
        let config = AppConfig { precache: Vec::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "precache");

        let config = AppConfig { precache: vec!["/".into(), "static/app.js".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()), "precache");

        let config = AppConfig { precache: vec!["/".into(), "//cdn.example/x.js".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()), "precache");
        assert!(AppConfig::from_toml_str(r#"precache = ["/", "//cdn.example/x.js"]"#).is_err());
    }

    #[test]
    fn test_validate_limits() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");

        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { undo_window_secs: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "undo_window_secs");
    }

    #[test]
    fn test_validate_empty_phrase() {
        let config = AppConfig { confirmation_phrase: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "confirmation_phrase");
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, undo_window_secs: 600, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
