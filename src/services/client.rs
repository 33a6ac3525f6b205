//! HTTP client service
//!
//! Encapsulates HTTP communication with the upstream weather API

use crate::config::UpstreamConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::redacted_url;
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, warn};

/// Body and metadata of a successful upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// Upstream `Content-Type`, if any
    pub content_type: Option<String>,
    /// Raw body bytes
    pub body: Bytes,
}

/// Source of weather data the proxy forwards to
///
/// `query` is an already serialized query string, credential included.
#[async_trait]
pub trait Upstream: Send + Sync + std::fmt::Debug {
    /// Base URL requests are sent to
    fn base_url(&self) -> &str;

    /// Issue one GET and return the body of a 2xx answer
    async fn fetch(&self, query: &str) -> AppResult<UpstreamResponse>;
}

/// Weather API client
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    credential_key: String,
}

impl WeatherClient {
    /// Create a new client instance
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("weatherproxy/", env!("CARGO_PKG_VERSION")));

        if config.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout));
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credential_key: config.api_key_param.clone(),
        })
    }
}

#[async_trait]
impl Upstream for WeatherClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, query: &str) -> AppResult<UpstreamResponse> {
        debug!(
            "Forwarding to upstream: {}",
            redacted_url(&self.base_url, query, &self.credential_key)
        );

        let response = self
            .client
            .get(build_url(&self.base_url, query))
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(classify)?;

        if !status.is_success() {
            warn!("Upstream answered {} ({} bytes)", status, body.len());
            return Err(AppError::upstream(status.as_u16(), &String::from_utf8_lossy(&body)));
        }

        debug!("Upstream answered {} ({} bytes)", status, body.len());

        Ok(UpstreamResponse {
            content_type,
            body,
        })
    }
}

fn classify(error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::Timeout
    } else {
        AppError::HttpClient(error)
    }
}

/// Append a serialized query to the base URL
pub fn build_url(base_url: &str, query: &str) -> String {
    if query.is_empty() {
        base_url.to_string()
    } else {
        format!("{}?{}", base_url, query)
    }
}
