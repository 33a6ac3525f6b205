//! Weather API Proxy Server
//!
//! Single-endpoint HTTP proxy that injects the server-held weather API key
//! into browser queries and relays the upstream response

use anyhow::{Context, Result};
use tracing::{info, warn};
use weatherproxy::config::{Settings, UpstreamFailureMode};
use weatherproxy::utils::logging::init_logging;
use weatherproxy::{create_router, version_info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load settings from config file and environment
    let settings = Settings::new().context("Failed to load server settings")?;

    // Initialize logging
    init_logging(&settings.logging)?;
    info!("{}", version_info());
    info!(
        "Upstream: {} (credential parameter '{}')",
        settings.upstream.base_url, settings.upstream.api_key_param
    );

    if settings.upstream.failure_mode == UpstreamFailureMode::Hang {
        warn!(
            "Upstream failures leave client requests open; \
             set UPSTREAM_FAILURE_MODE=report to return errors instead"
        );
    }

    // Create router
    let app = create_router(settings.clone()).await?;

    // Start server
    let addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}
