//! Axum HTTP API server.
//!
//! This crate provides:
//! - The REST API used by the text-to-video frontend
//! - Rate limiting, CORS and security headers
//! - Prometheus metrics
//! - Host hardware reporting

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiJson, ApiQuery, ApiResult};
pub use routes::create_router;
pub use services::HardwareProbe;
pub use state::AppState;
