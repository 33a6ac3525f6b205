//! Weather proxy handler
//!
//! GET / forwards the caller's query to the weather API with the server-held
//! credential injected and relays the upstream body unchanged

use crate::config::{UpstreamConfig, UpstreamFailureMode};
use crate::handlers::AppState;
use crate::services::client::UpstreamResponse;
use crate::services::query;
use crate::utils::error::AppResult;
use axum::{
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

/// Content type used when the upstream sends none
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Handle a forwarded weather query
///
/// GET /
///
/// On upstream failure the behaviour depends on `UpstreamFailureMode`: in
/// `Hang` mode nothing is written and the request stays open until the client
/// disconnects, in `Report` mode the error is returned as JSON.
pub async fn forward_query(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Response> {
    let upstream_config = &state.settings.upstream;
    let query = build_upstream_query(raw.as_deref().unwrap_or_default(), upstream_config);

    match state.upstream.fetch(&query).await {
        Ok(upstream) => Ok(passthrough(upstream)),
        Err(err) => match upstream_config.failure_mode {
            UpstreamFailureMode::Report => Err(err),
            UpstreamFailureMode::Hang => {
                error!("Upstream request failed, no response will be sent: {}", err);
                Ok(std::future::pending::<Response>().await)
            }
        },
    }
}

/// Parse the inbound query, inject the credential and serialize it again
pub fn build_upstream_query(raw: &str, upstream: &UpstreamConfig) -> String {
    let mut params = query::parse(raw);
    query::inject_credential(&mut params, &upstream.api_key_param, &upstream.api_key);
    query::stringify(&params)
}

/// Relay the upstream body byte for byte
fn passthrough(upstream: UpstreamResponse) -> Response {
    debug!("Relaying {} byte upstream body", upstream.body.len());

    let content_type = upstream
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    ([(header::CONTENT_TYPE, content_type)], upstream.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;

    fn upstream_config() -> UpstreamConfig {
        UpstreamConfig {
            base_url: "https://api.openweathermap.org/data/2.5/onecall".to_string(),
            api_key: "server-key".to_string(),
            api_key_param: "appid".to_string(),
            timeout: 0,
            failure_mode: UpstreamFailureMode::Hang,
        }
    }

    #[test]
    fn test_build_upstream_query() {
        let config = upstream_config();
        assert_eq!(build_upstream_query("", &config), "appid=server-key");
        assert_eq!(build_upstream_query("lat=1&lon=2", &config), "lat=1&lon=2&appid=server-key");
        assert_eq!(build_upstream_query("appid=stolen&lat=1", &config), "appid=server-key&lat=1");
    }

    #[test]
    fn test_build_upstream_query_keeps_undecodable_values() {
        let config = upstream_config();
        assert_eq!(build_upstream_query("q=%FF", &config), "q=%25FF&appid=server-key");
        assert_eq!(build_upstream_query("lat=1&5=x", &config), "5=x&lat=1&appid=server-key");
    }

    #[tokio::test]
    async fn test_passthrough_keeps_body_and_defaults_content_type() {
        let response = passthrough(UpstreamResponse {
            content_type: None,
            body: Bytes::from_static(br#"{"temp": 20}"#),
        });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"temp": 20}"#);
    }
}
