//! Use-case facade over `publish_core` for an outer HTTP layer.

pub mod api;
pub mod config;

pub use api::{ApiError, ApiResult, PublishApi};
pub use config::ApiConfig;
