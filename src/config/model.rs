//! Value-function approximator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hyperparameters for the Double-DQN and its replay buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of each of the two hidden layers
    pub hidden_units: usize,
    /// Adam learning rate
    pub learning_rate: f32,
    /// Discount factor applied to the next-state value
    pub gamma: f32,
    /// Soft-update rate of the target network
    pub tau: f32,
    /// Experiences per training step; training is skipped below this
    pub batch_size: usize,
    /// Maximum experiences retained by the replay buffer
    pub replay_capacity: usize,
    /// Directory holding weight snapshots
    pub weights_dir: PathBuf,
    /// Snapshot the weights after every outcome update
    pub save_on_update: bool,
    /// Seed for weight initialization and sampling; random when unset
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_units: 64,
            learning_rate: 0.001,
            gamma: 0.95,
            tau: 0.01,
            batch_size: 64,
            replay_capacity: 10_000,
            weights_dir: PathBuf::from("models"),
            save_on_update: true,
            seed: None,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        let fail = |message: &str| -> crate::error::Result<()> {
            Err(crate::error::MatchmakingError::ConfigurationError {
                message: message.to_string(),
            }
            .into())
        };

        if self.hidden_units == 0 {
            return fail("Hidden units must be greater than 0");
        }
        if self.learning_rate <= 0.0 {
            return fail("Learning rate must be positive");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return fail("Gamma must be within [0, 1]");
        }
        if self.tau <= 0.0 || self.tau > 1.0 {
            return fail("Tau must be within (0, 1]");
        }
        if self.batch_size == 0 {
            return fail("Batch size must be greater than 0");
        }
        if self.replay_capacity < self.batch_size {
            return fail("Replay capacity must be at least the batch size");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gamma, 0.95);
        assert_eq!(config.tau, 0.01);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_rejects_bad_tau() {
        let config = ModelConfig {
            tau: 0.0,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_small_capacity() {
        let config = ModelConfig {
            replay_capacity: 8,
            batch_size: 16,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
