//! Service layer module
//!
//! Contains the query codec and the upstream HTTP client

pub mod client;
pub mod query;

pub use client::*;
pub use query::QueryParams;
