//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EUS_OFFLINE_*)
//! 2. TOML config file (if EUS_OFFLINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EUS_OFFLINE_*)
/// 2. TOML config file (if EUS_OFFLINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via EUS_OFFLINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the client application. Relative request paths and the
    /// precache manifest are resolved against it.
    ///
    /// Set via EUS_OFFLINE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via EUS_OFFLINE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via EUS_OFFLINE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via EUS_OFFLINE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Leading part of every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag encoded in every partition name. Bumping it makes the
    /// next activation purge all partitions of the previous version.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Root-level paths fetched into the static partition on install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Cached document served when a navigation misses while offline.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Path prefixes routed cache-first.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// File extensions (without the dot) routed cache-first.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Path prefixes routed network-first into the API partition.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Period of the full API partition sweep, in seconds.
    ///
    /// Set via EUS_OFFLINE_API_SWEEP_SECS environment variable.
    #[serde(default = "default_api_sweep_secs")]
    pub api_sweep_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./eus-offline-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "eus-offline/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_cache_prefix() -> String {
    "eus".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_precache_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_shell_path() -> String {
    "/index.html".into()
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/assets/".into(), "/static/".into()]
}

fn default_static_extensions() -> Vec<String> {
    ["js", "mjs", "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf", "otf", "eot"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_api_sweep_secs() -> u64 {
    3_600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache_manifest: default_precache_manifest(),
            shell_path: default_shell_path(),
            static_prefixes: default_static_prefixes(),
            static_extensions: default_static_extensions(),
            api_prefixes: default_api_prefixes(),
            api_sweep_secs: default_api_sweep_secs(),
        }
    }
}

/// The three partition names of one router version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    /// Reserved partition; kept on activation but never routed to.
    pub root: String,
    pub static_assets: String,
    pub api: String,
}

impl PartitionNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            root: format!("{prefix}-platform-{version}"),
            static_assets: format!("{prefix}-static-{version}"),
            api: format!("{prefix}-api-{version}"),
        }
    }

    /// Names that survive activation.
    pub fn allow_list(&self) -> [&str; 3] {
        [&self.root, &self.static_assets, &self.api]
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allow_list().contains(&name)
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sweep period as Duration.
    pub fn api_sweep_period(&self) -> Duration {
        Duration::from_secs(self.api_sweep_secs)
    }

    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames::new(&self.cache_prefix, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EUS_OFFLINE_`
    /// 2. TOML file from `EUS_OFFLINE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EUS_OFFLINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EUS_OFFLINE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
