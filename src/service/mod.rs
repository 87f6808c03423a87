//! Service layer for the squadmatch matchmaking service
//!
//! Application state shared by the HTTP handlers, background maintenance and
//! health reporting.

pub mod app;
pub mod health;

pub use app::{is_invalid_request, AppState, EngineStats, ServiceError};
pub use health::{HealthCheck, HealthStatus};
