//! fairmeter-svc library interface
//!
//! Exposes the assessment engine for integration testing: harvesting and
//! merge, the evaluator framework, the scoring aggregator and the HTTP
//! surface.

pub mod api;
pub mod error;
pub mod evaluators;
pub mod harvest;
pub mod helpers;
pub mod metrics;
pub mod models;
pub mod refdata;
pub mod score;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use fairmeter_common::config::ServiceConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: ServiceConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::assess_routes())
        .with_state(state)
}
