//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WALLAI_*)
//! 2. TOML config file (if WALLAI_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WALLAI_*)
/// 2. TOML config file (if WALLAI_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is registered on. Requests to any other origin pass through.
    ///
    /// Set via WALLAI_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via WALLAI_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every cache store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache version tag. Changing it makes every older store stale.
    ///
    /// Set via WALLAI_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path prefix routed through the network-first strategy.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Shell assets precached on install, as origin-relative paths.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// User-Agent string for HTTP requests and delete audit data.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// How long a deleted budget can be restored, in seconds.
    #[serde(default = "default_undo_window_secs")]
    pub undo_window_secs: u64,

    /// Literal phrase the user must type to confirm a deletion.
    #[serde(default = "default_confirmation_phrase")]
    pub confirmation_phrase: String,

    /// Service answering `{"ip": "..."}` for the delete audit trail.
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    /// CSRF token sent with mutating budget requests.
    ///
    /// Set via WALLAI_CSRF_TOKEN environment variable.
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// Page opened when the "explore" notification action is clicked.
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./wallai-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "wallai".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/static/css/style.css",
        "/static/js/app.js",
        "/static/pwa/manifest.json",
        "/static/pwa/icon-192x192.png",
        "/static/pwa/icon-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    "wallai-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_undo_window_secs() -> u64 {
    30
}

fn default_confirmation_phrase() -> String {
    "ELIMINAR".into()
}

fn default_ip_lookup_url() -> String {
    "https://api.ipify.org?format=json".into()
}

fn default_dashboard_path() -> String {
    "/dashboard/".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            api_prefix: default_api_prefix(),
            precache: default_precache(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            undo_window_secs: default_undo_window_secs(),
            confirmation_phrase: default_confirmation_phrase(),
            ip_lookup_url: default_ip_lookup_url(),
            csrf_token: None,
            dashboard_path: default_dashboard_path(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Undo window as Duration.
    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }

    /// Store names for the configured cache generation.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.cache_version)
    }

    /// Parsed worker origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve `path` against the worker origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or the joined URL is invalid.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WALLAI_`
    /// 2. TOML file from `WALLAI_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var_os("WALLAI_CONFIG_FILE").map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same layering as [`AppConfig::load`] with an explicit TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed or
    /// validation fails.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        Self::extract(figment.merge(
            Env::prefixed("WALLAI_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Load defaults overlaid with a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the TOML is malformed or validation fails.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// CSRF token required for delete and undo requests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token is not set.
    pub fn require_csrf_token(&self) -> Result<&str, ConfigError> {
        self.csrf_token.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "csrf_token".into(),
            hint: "Set WALLAI_CSRF_TOKEN environment variable".into(),
        })
    }
}
