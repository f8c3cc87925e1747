//! HTTP API handlers for fairmeter-svc

pub mod assess;
pub mod health;

pub use assess::assess_routes;
pub use health::health_routes;
