//! Value-function approximator
//!
//! A dense burn network scoring the Reject/Join actions for an encoded player,
//! trained as a Double-DQN from replayed experiences.

pub mod dqn;
pub mod network;
pub mod persistence;

pub use dqn::{DoubleDqn, TrainingStats};
pub use network::{DenseLayer, QNetwork, QOptimizer};
pub use persistence::{load_latest, save_weights, write_snapshot, LoadOutcome, WeightSnapshot};
