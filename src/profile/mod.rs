//! Player profiles and their storage
//!
//! Profiles carry per-sport skill, location, availability and the teammate
//! synergy map that match outcomes adjust.

pub mod generator;
pub mod storage;

pub use generator::seed_demo_profiles;
pub use storage::{InMemoryProfileRepository, PlayerProfile, ProfileRepository};
