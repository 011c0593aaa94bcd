//! Configuration module for filedepot.

use serde::Deserialize;
use std::path::Path;

use crate::{DepotError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins. Empty means permissive dev mode.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filedepot.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for content-addressed blobs.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum upload size per file, in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Longest edge of generated thumbnails, in pixels.
    #[serde(default = "default_thumbnail_max_dimension")]
    pub thumbnail_max_dimension: u32,
}

fn default_storage_path() -> String {
    "data/blobs".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

fn default_thumbnail_max_dimension() -> u32 {
    320
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            thumbnail_max_dimension: default_thumbnail_max_dimension(),
        }
    }
}

/// API behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Rate limit (requests per rolling hour) for newly issued keys.
    #[serde(default = "default_rate_limit")]
    pub default_rate_limit: u32,
    /// Hard ceiling for the `limit` pagination parameter.
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,
    /// Page size used when the caller omits `limit`.
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,
    /// Account seeded with the bootstrap key at startup.
    #[serde(default)]
    pub bootstrap_account: Option<String>,
    /// Raw secret seeded for the bootstrap account. Never logged.
    #[serde(default)]
    pub bootstrap_key: Option<String>,
}

fn default_rate_limit() -> u32 {
    1000
}

fn default_max_page_limit() -> u32 {
    100
}

fn default_page_limit() -> u32 {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_rate_limit: default_rate_limit(),
            max_page_limit: default_max_page_limit(),
            default_page_limit: default_page_limit(),
            bootstrap_account: None,
            bootstrap_key: None,
        }
    }
}

/// Per-IP burst limiting configuration.
///
/// This guards the listener itself and is independent of the per-key
/// rolling-hour quota enforced after authorization.
#[derive(Debug, Clone, Deserialize)]
pub struct IpLimitConfig {
    /// Requests per minute allowed per client IP.
    #[serde(default = "default_ip_rate_limit")]
    pub requests_per_minute: u32,
}

fn default_ip_rate_limit() -> u32 {
    600
}

impl Default for IpLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_ip_rate_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. When set, output goes to both stdout and the file.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// API behavior configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Per-IP burst limiting.
    #[serde(default)]
    pub ip_limit: IpLimitConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DepotError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DepotError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEDEPOT_BOOTSTRAP_KEY`: Override the bootstrap API key secret
    /// - `FILEDEPOT_DATABASE_PATH`: Override the database path
    /// - `FILEDEPOT_STORAGE_PATH`: Override the blob storage path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("FILEDEPOT_BOOTSTRAP_KEY") {
            if !key.is_empty() {
                self.api.bootstrap_key = Some(key);
            }
        }
        if let Ok(path) = std::env::var("FILEDEPOT_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(path) = std::env::var("FILEDEPOT_STORAGE_PATH") {
            if !path.is_empty() {
                self.storage.path = path;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.path, "data/filedepot.db");
        assert_eq!(config.storage.max_upload_size_mb, 50);
        assert_eq!(config.api.default_rate_limit, 1000);
        assert_eq!(config.api.max_page_limit, 100);
        assert_eq!(config.logging.level, "info");
        assert!(config.api.bootstrap_key.is_none());
    }

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_parse_partial() {
        let toml = r#"
[server]
port = 8088

[storage]
max_upload_size_mb = 10
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.max_upload_size_mb, 10);
        // Untouched sections keep defaults
        assert_eq!(config.api.default_page_limit, 20);
    }

    #[test]
    fn test_parse_bootstrap() {
        let toml = r#"
[api]
bootstrap_account = "admin"
bootstrap_key = "fd_0123456789abcdef"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.api.bootstrap_account.as_deref(), Some("admin"));
        assert_eq!(
            config.api.bootstrap_key.as_deref(),
            Some("fd_0123456789abcdef")
        );
    }

    #[test]
    fn test_parse_invalid() {
        let result = Config::parse("server = 12");
        assert!(matches!(result, Err(DepotError::Config(_))));
    }

    #[test]
    fn test_max_upload_size_bytes() {
        let storage = StorageConfig {
            max_upload_size_mb: 2,
            ..Default::default()
        };
        assert_eq!(storage.max_upload_size_bytes(), 2 * 1024 * 1024);
    }
}
