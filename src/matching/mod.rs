//! Matchmaking orchestration
//!
//! Learned ranking of compatible teammates, the synthetic two-team fallback and
//! the engine that owns the model state behind both.

pub mod compatibility;
pub mod engine;
pub mod teams;

pub use compatibility::{find_compatible_teammates, RankedTeammates};
pub use engine::{validate_request, validate_update, MatchEngine};
pub use teams::{build_synthetic_match, QualityScores, SyntheticMatch};
