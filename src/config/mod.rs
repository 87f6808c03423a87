//! Configuration management for the squadmatch service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and the documented defaults for every tunable.

pub mod app;
pub mod matching;
pub mod model;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use matching::MatchingConfig;
pub use model::ModelConfig;
