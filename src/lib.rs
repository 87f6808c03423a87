//! Squadmatch - teammate matchmaking driven by a Double-DQN compatibility model
//!
//! Players are encoded into fixed-length state vectors, ranked against each
//! other by a learned value network, and the network is refined from reported
//! match outcomes through experience replay.

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod profile;
pub mod replay;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use features::{FeatureEncoder, StateVector};
pub use matching::MatchEngine;
pub use model::DoubleDqn;
pub use profile::{InMemoryProfileRepository, PlayerProfile, ProfileRepository};
pub use replay::{Experience, ReplayBuffer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
