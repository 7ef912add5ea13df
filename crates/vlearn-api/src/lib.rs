//! Axum HTTP API server.
//!
//! This crate provides:
//! - Firebase ID token verification (JWKS with TTL cache)
//! - Video, quiz and chat route handlers over the ingestion orchestrator
//! - Rate limiting, CORS and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
