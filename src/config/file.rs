//! File-based configuration loading
//!
//! Loads optional server and upstream settings from a JSON file. Every field
//! may be omitted; environment variables override whatever the file sets.

use super::settings::UpstreamFailureMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "WEATHERPROXY_CONFIG";

/// Config file name searched for in the default locations
pub const CONFIG_FILE_NAME: &str = "weatherproxy.json";

/// Configuration loaded from JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,

    #[serde(default)]
    pub upstream: FileUpstreamConfig,

    #[serde(default)]
    pub logging: FileLoggingConfig,
}

/// Server section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Upstream section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileUpstreamConfig {
    /// Base URL of the weather API
    #[serde(rename = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Credential value
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Credential query parameter name
    #[serde(rename = "apiKeyParam", skip_serializing_if = "Option::is_none")]
    pub api_key_param: Option<String>,

    /// Timeout in seconds (0 = none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(rename = "failureMode", skip_serializing_if = "Option::is_none")]
    pub failure_mode: Option<UpstreamFailureMode>,
}

/// Logging section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileLoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FileConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: FileConfig = serde_json::from_str(&content)
            .with_context(|| "Failed to parse config JSON")?;

        debug!("Config file parsed: {:?}", path);
        Ok(config)
    }

    /// Load configuration from default locations
    /// Searches in order:
    /// 1. $WEATHERPROXY_CONFIG (must exist when set)
    /// 2. ~/.config/weatherproxy/weatherproxy.json
    /// 3. ./weatherproxy.json
    ///
    /// Returns `None` when no file is found; the file is optional.
    pub fn load_default() -> Result<Option<Self>> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load(Path::new(&explicit)).map(Some);
        }

        match Self::default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load(&path).map(Some),
            None => {
                debug!("No config file found, using environment only");
                Ok(None)
            }
        }
    }

    /// Candidate locations, most specific first
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("weatherproxy").join(CONFIG_FILE_NAME));
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "server": {"host": "127.0.0.1", "port": 8090},
                "upstream": {
                    "baseUrl": "https://weather.example.com/onecall",
                    "apiKey": "file-key",
                    "apiKeyParam": "key",
                    "timeout": 10,
                    "failureMode": "report"
                },
                "logging": {"level": "debug", "format": "json"}
            }"#,
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, Some(8090));
        assert_eq!(config.upstream.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.upstream.failure_mode, Some(UpstreamFailureMode::Report));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_load_empty_object() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{}").unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert!(config.server.host.is_none());
        assert!(config.upstream.base_url.is_none());
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_default_paths_end_with_local_file() {
        let paths = FileConfig::default_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from(CONFIG_FILE_NAME)));
    }
}
