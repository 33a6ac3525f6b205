//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use super::file::FileConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default upstream endpoint (OpenWeatherMap One Call)
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/onecall";

/// Default name of the credential query parameter
pub const DEFAULT_API_KEY_PARAM: &str = "appid";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream weather API configuration
    pub upstream: UpstreamConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Upstream weather API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL the query string is appended to
    pub base_url: String,
    /// Credential injected into every forwarded request
    pub api_key: String,
    /// Query parameter name carrying the credential
    pub api_key_param: String,
    /// Request timeout in seconds, 0 disables it
    pub timeout: u64,
    /// What the proxy does when the upstream call fails
    pub failure_mode: UpstreamFailureMode,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

/// Behaviour when the upstream request fails or returns a non-2xx status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamFailureMode {
    /// Write nothing back and keep the client connection open until it goes away
    #[default]
    Hang,
    /// Answer with a JSON error (502/504)
    Report,
}

impl FromStr for UpstreamFailureMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hang" => Ok(Self::Hang),
            "report" => Ok(Self::Report),
            other => anyhow::bail!(
                "Invalid upstream failure mode: {} (expected 'hang' or 'report')",
                other
            ),
        }
    }
}

impl fmt::Display for UpstreamFailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hang => write!(f, "hang"),
            Self::Report => write!(f, "report"),
        }
    }
}

impl Settings {
    /// Load settings from the optional config file and the process environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let file = FileConfig::load_default()?;
        Self::from_sources(file.as_ref(), |key| std::env::var(key).ok())
    }

    /// Build settings from a file config and an environment lookup
    ///
    /// Environment values win over file values, which win over built-in defaults.
    pub fn from_sources<F>(file: Option<&FileConfig>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.cloned().unwrap_or_default();

        let pick = |key: &str, from_file: Option<String>, default: &str| -> String {
            env(key).or(from_file).unwrap_or_else(|| default.to_string())
        };

        let settings = Self {
            server: ServerConfig {
                host: pick("SERVER_HOST", file.server.host, "0.0.0.0"),
                port: pick("SERVER_PORT", file.server.port.map(|p| p.to_string()), "3000")
                    .parse()
                    .context("Invalid port number")?,
            },
            upstream: UpstreamConfig {
                base_url: pick("WEATHER_API_URL", file.upstream.base_url, DEFAULT_WEATHER_API_URL),
                api_key: env("WEATHER_API_KEY")
                    .or(file.upstream.api_key)
                    .context("WEATHER_API_KEY environment variable not set")?,
                api_key_param: pick(
                    "WEATHER_API_KEY_PARAM",
                    file.upstream.api_key_param,
                    DEFAULT_API_KEY_PARAM,
                ),
                timeout: pick("UPSTREAM_TIMEOUT", file.upstream.timeout.map(|t| t.to_string()), "0")
                    .parse()
                    .context("Invalid upstream timeout")?,
                failure_mode: pick(
                    "UPSTREAM_FAILURE_MODE",
                    file.upstream.failure_mode.map(|m| m.to_string()),
                    "hang",
                )
                .parse()?,
            },
            logging: LoggingConfig {
                level: pick("RUST_LOG", file.logging.level, "info"),
                format: pick("LOG_FORMAT", file.logging.format, "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.upstream.api_key.is_empty() {
            anyhow::bail!("Weather API key cannot be empty");
        }

        if self.upstream.api_key.contains(char::is_whitespace) {
            anyhow::bail!("Weather API key cannot contain whitespace characters");
        }

        if self.upstream.api_key_param.trim().is_empty() {
            anyhow::bail!("API key parameter name cannot be empty");
        }

        if !self.upstream.base_url.starts_with("http") {
            anyhow::bail!("Invalid weather API URL format, should start with 'http'");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Listen address in `host:port` form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
