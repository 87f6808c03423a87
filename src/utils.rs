//! Utility functions for the matchmaking service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate an identifier for a synthetic player
pub fn generate_synthetic_player_id() -> String {
    format!("synthetic_{}", Uuid::new_v4().simple())
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Clamp a score into the unit interval
pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Similarity of two skill levels on the 1-5 scale (1.0 for equal skill)
pub fn skill_similarity(skill_a: f32, skill_b: f32) -> f32 {
    1.0 - (skill_a - skill_b).abs() / 5.0
}
