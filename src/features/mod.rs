//! Player feature encoding
//!
//! Turns a player's sport, skill, location and availability into the fixed
//! [`StateVector`] consumed by the value network, and keeps the learned social
//! features up to date as match outcomes arrive.

pub mod encoder;
pub mod state;

pub use encoder::FeatureEncoder;
pub use state::{encode_state, StateVector, STATE_SIZE};
