//! Main application configuration
//!
//! This module defines the primary configuration structures for the squadmatch
//! service, including environment variable loading, TOML files and validation.

use crate::config::matching::MatchingConfig;
use crate::config::model::ModelConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub model: ModelConfig,
    pub matching: MatchingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP API binds to
    pub http_host: String,
    /// Port the HTTP API binds to
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "squadmatch".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8000,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Parse an environment variable into `target` if it is set
fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        override_from_env("HTTP_PORT", &mut self.service.http_port)?;
        override_from_env(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut self.service.shutdown_timeout_seconds,
        )?;

        // Model settings
        override_from_env("MODEL_HIDDEN_UNITS", &mut self.model.hidden_units)?;
        override_from_env("MODEL_LEARNING_RATE", &mut self.model.learning_rate)?;
        override_from_env("MODEL_GAMMA", &mut self.model.gamma)?;
        override_from_env("MODEL_TAU", &mut self.model.tau)?;
        override_from_env("MODEL_BATCH_SIZE", &mut self.model.batch_size)?;
        override_from_env("REPLAY_CAPACITY", &mut self.model.replay_capacity)?;
        if let Ok(dir) = env::var("WEIGHTS_DIR") {
            self.model.weights_dir = PathBuf::from(dir);
        }
        override_from_env("SAVE_ON_UPDATE", &mut self.model.save_on_update)?;
        if let Ok(seed) = env::var("MODEL_SEED") {
            self.model.seed = Some(
                seed.parse()
                    .map_err(|_| anyhow!("Invalid MODEL_SEED value: {}", seed))?,
            );
        }

        // Matching settings
        override_from_env(
            "MATCH_INCLUSION_THRESHOLD",
            &mut self.matching.inclusion_threshold,
        )?;
        override_from_env("MATCH_MAX_CANDIDATES", &mut self.matching.max_candidates)?;
        override_from_env(
            "ENABLE_SYNTHETIC_FALLBACK",
            &mut self.matching.enable_synthetic_fallback,
        )?;
        override_from_env("DEMO_PROFILE_COUNT", &mut self.matching.demo_profile_count)?;

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    config.model.validate()?;
    config.matching.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.service.http_port, 8000);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let raw = r#"
            [service]
            http_port = 9000

            [model]
            batch_size = 32
            seed = 7
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.service.http_port, 9000);
        assert_eq!(config.service.name, "squadmatch");
        assert_eq!(config.model.batch_size, 32);
        assert_eq!(config.model.seed, Some(7));
        assert_eq!(config.matching.max_candidates, 10);
    }

    #[test]
    fn test_from_file_missing() {
        let result = AppConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(result.is_err());
    }
}
