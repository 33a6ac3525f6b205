//! Configuration management module
//!
//! Loads application configuration from environment variables and the
//! optional JSON config file

pub mod file;
pub mod settings;

pub use file::FileConfig;
pub use settings::{LoggingConfig, ServerConfig, Settings, UpstreamConfig, UpstreamFailureMode};
