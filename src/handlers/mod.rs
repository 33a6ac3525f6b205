//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod health;
pub mod proxy;

use crate::config::Settings;
use crate::middleware::logging::request_logging_middleware;
use crate::services::{Upstream, WeatherClient};
use anyhow::Result;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub upstream: Arc<dyn Upstream>,
    pub started_at: Instant,
}

/// Create application router backed by the real weather API client
pub async fn create_router(settings: Settings) -> Result<Router> {
    let upstream = Arc::new(WeatherClient::new(&settings.upstream)?);
    create_router_with_upstream(settings, upstream).await
}

/// Create application router with a caller-supplied upstream
pub async fn create_router_with_upstream(
    settings: Settings,
    upstream: Arc<dyn Upstream>,
) -> Result<Router> {
    let app_state = Arc::new(AppState {
        settings,
        upstream,
        started_at: Instant::now(),
    });

    // Every response, errors and 404s included, carries Access-Control-Allow-Origin: *
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let router = Router::new()
        .route("/", get(proxy::forward_query))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            request_logging_middleware,
        ))
        .with_state(app_state)
        .layer(middleware_stack);

    Ok(router)
}
