//! Matchmaking scoring configuration

use serde::{Deserialize, Serialize};

/// Weights, thresholds and update deltas used by the orchestrator and encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Weight of the learned Join value in the combined score
    pub learned_weight: f32,
    /// Weight of skill similarity in the combined score
    pub skill_weight: f32,
    /// Candidates must score strictly above this to be returned
    pub inclusion_threshold: f32,
    /// Maximum candidates returned per request
    pub max_candidates: usize,
    /// Upper bound of the confidence percentage
    pub max_confidence: f32,
    /// Fewer learned candidates than this triggers the synthetic fallback
    pub min_learned_candidates: usize,
    pub enable_synthetic_fallback: bool,
    /// Players per side in a synthetic split
    pub team_size: usize,
    /// Starting value of the synergy/history/auxiliary features
    pub neutral_social_value: f32,
    pub synergy_win_delta: f32,
    pub synergy_loss_delta: f32,
    pub history_win_delta: f32,
    pub history_loss_delta: f32,
    /// Demo profiles seeded into the repository at startup
    pub demo_profile_count: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            learned_weight: 0.7,
            skill_weight: 0.3,
            inclusion_threshold: 0.4,
            max_candidates: 10,
            max_confidence: 99.0,
            min_learned_candidates: 2,
            enable_synthetic_fallback: true,
            team_size: 5,
            neutral_social_value: 0.5,
            synergy_win_delta: 0.1,
            synergy_loss_delta: 0.05,
            history_win_delta: 0.05,
            history_loss_delta: 0.03,
            demo_profile_count: 50,
        }
    }
}

impl MatchingConfig {
    /// Blend learned compatibility and skill similarity into one score
    pub fn combined_score(&self, learned: f32, skill_similarity: f32) -> f32 {
        self.learned_weight * learned + self.skill_weight * skill_similarity
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let fail = |message: &str| -> crate::error::Result<()> {
            Err(crate::error::MatchmakingError::ConfigurationError {
                message: message.to_string(),
            }
            .into())
        };

        if self.learned_weight < 0.0 || self.skill_weight < 0.0 {
            return fail("Score weights must be non-negative");
        }
        if self.max_candidates == 0 {
            return fail("Max candidates must be greater than 0");
        }
        if !(0.0..=100.0).contains(&self.max_confidence) {
            return fail("Max confidence must be within [0, 100]");
        }
        if self.team_size == 0 {
            return fail("Team size must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.neutral_social_value) {
            return fail("Neutral social value must be within [0, 1]");
        }
        for delta in [
            self.synergy_win_delta,
            self.synergy_loss_delta,
            self.history_win_delta,
            self.history_loss_delta,
        ] {
            if !(0.0..=1.0).contains(&delta) {
                return fail("Update deltas must be within [0, 1]");
            }
        }

        Ok(())
    }
}
