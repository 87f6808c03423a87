//! Error types for the matchmaking service
//!
//! Domain failures are described by [`MatchmakingError`]; everything else flows
//! through `anyhow` so callers can attach context freely.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid matchmaking request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Model error: {message}")]
    ModelError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
