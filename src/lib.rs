//! Weather API Proxy Library
//!
//! Forwards browser weather queries to the upstream API with a server-held credential

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::{Settings, UpstreamFailureMode};
pub use handlers::{create_router, create_router_with_upstream, AppState};
pub use services::{Upstream, UpstreamResponse, WeatherClient};
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
