//! Experience replay

pub mod buffer;

pub use buffer::{Experience, ReplayBuffer};
