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
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    /// - `cache_prefix` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - a manifest entry or `shell_path` does not start with `/`
    /// - `api_sweep_secs` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must be non-empty and contain no whitespace"));
        }
        if self.cache_version.is_empty() || self.cache_version.chars().any(char::is_whitespace) {
            return Err(invalid("cache_version", "must be non-empty and contain no whitespace"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme()))),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if let Some(path) = self.precache_manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache_manifest", format!("path must start with '/': {path}")));
        }
        if !self.shell_path.starts_with('/') {
            return Err(invalid("shell_path", "must start with '/'"));
        }

        if self.api_sweep_secs == 0 {
            return Err(invalid("api_sweep_secs", "must be at least 1 second"));
        }

        if !self.precache_manifest.contains(&self.shell_path) {
            tracing::warn!(
                shell_path = %self.shell_path,
                "shell_path is not in precache_manifest; offline navigations fall back \
                 to the synthetic offline page until it is cached by a visit"
            );
        }

        Ok(())
    }
}
