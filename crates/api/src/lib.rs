//! Authenticated HTTP channel to the scheduling API server.
//!
//! This crate provides:
//! - `JwtClient` for token-authenticated (optionally mutual-TLS) requests
//! - `StrategySource` trait and its HTTP implementation
//! - `MetricsPusher` for rate-limited metrics uploads

pub mod auth;
pub mod error;
pub mod metrics;
pub mod strategy;

pub use auth::JwtClient;
pub use error::ApiError;
pub use metrics::{MetricsPusher, PushOutcome};
pub use strategy::{HttpStrategySource, StrategySource};
