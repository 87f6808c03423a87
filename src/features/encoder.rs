//! Stateful feature encoder
//!
//! Wraps [`encode_state`] with a per-(player, sport) cache and the outcome-driven
//! update of the social features. This is the only code path that changes
//! teammate synergy scores.

use crate::config::MatchingConfig;
use crate::features::state::{encode_state, StateVector, HISTORY_SLOT, SYNERGY_SLOT};
use crate::profile::{PlayerProfile, ProfileRepository};
use crate::types::{PlayerId, Sport};
use crate::utils::{clamp_unit, mean};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Encodes players into state vectors and keeps the latest vector per sport
pub struct FeatureEncoder {
    repository: Arc<dyn ProfileRepository>,
    config: MatchingConfig,
    cache: HashMap<(PlayerId, String), StateVector>,
}

impl FeatureEncoder {
    pub fn new(repository: Arc<dyn ProfileRepository>, config: MatchingConfig) -> Self {
        Self {
            repository,
            config,
            cache: HashMap::new(),
        }
    }

    /// Encode a player's request and register them as a candidate for others.
    ///
    /// Categorical slots always reflect the arguments. Social slots start at the
    /// configured neutral value, or keep whatever an earlier update learned.
    pub fn encode(
        &mut self,
        player_id: &str,
        skill_level: u8,
        sport: &str,
        location: &str,
        availability: &str,
    ) -> crate::error::Result<StateVector> {
        let state = self.encode_and_cache(player_id, skill_level, sport, location, availability);

        if let Some(known_sport) = Sport::parse(sport) {
            let mut profile = self
                .repository
                .get_profile(player_id)?
                .unwrap_or_else(|| PlayerProfile::new(player_id, player_id));
            profile.sports.insert(known_sport, skill_level);
            profile.location = location.to_string();
            profile.availability = availability.to_string();
            self.repository.upsert_profile(profile)?;
        }

        Ok(state)
    }

    fn encode_and_cache(
        &mut self,
        player_id: &str,
        skill_level: u8,
        sport: &str,
        location: &str,
        availability: &str,
    ) -> StateVector {
        let mut state = encode_state(
            skill_level,
            sport,
            location,
            availability,
            self.config.neutral_social_value,
        );

        let key = (player_id.to_string(), sport.to_string());
        if let Some(previous) = self.cache.get(&key) {
            state.carry_social_features(previous);
        }
        self.cache.insert(key, state);

        state
    }

    /// Cached state for a player and sport, derived from the stored profile when
    /// nothing is cached yet. Unknown players get the all-zero vector.
    pub fn get_state(&mut self, player_id: &str, sport: &str) -> crate::error::Result<StateVector> {
        if let Some(state) = self.cache.get(&(player_id.to_string(), sport.to_string())) {
            return Ok(*state);
        }

        let profile = self.repository.get_profile(player_id)?;
        let skill = Sport::parse(sport)
            .and_then(|s| profile.as_ref().and_then(|p| p.skill_for(s)));

        match (profile, skill) {
            (Some(profile), Some(skill)) => Ok(self.encode_and_cache(
                player_id,
                skill,
                sport,
                &profile.location,
                &profile.availability,
            )),
            _ => Ok(StateVector::zeros()),
        }
    }

    /// Fold a match outcome into the player's state.
    ///
    /// Synergy toward each known teammate moves up on a positive reward and down
    /// otherwise; the synergy slot becomes the mean over the listed teammates and
    /// the history slot is nudged the same direction.
    pub fn update_state(
        &mut self,
        player_id: &str,
        sport: &str,
        reward: f32,
        teammates: &[PlayerId],
        opponents: &[PlayerId],
    ) -> crate::error::Result<StateVector> {
        let mut state = self.get_state(player_id, sport)?;
        let won = reward > 0.0;
        let neutral = self.config.neutral_social_value;

        let synergy_delta = if won {
            self.config.synergy_win_delta
        } else {
            -self.config.synergy_loss_delta
        };

        for teammate_id in teammates {
            if self.repository.get_profile(teammate_id)?.is_some() {
                self.repository
                    .adjust_synergy(player_id, teammate_id, synergy_delta, neutral)?;
            }
        }

        if let Some(profile) = self.repository.get_profile(player_id)? {
            if teammates.iter().any(|t| profile.synergy.contains_key(t)) {
                let scores: Vec<f32> = teammates
                    .iter()
                    .map(|t| profile.synergy.get(t).copied().unwrap_or(neutral))
                    .collect();
                if let Some(avg) = mean(&scores) {
                    state.set(SYNERGY_SLOT, avg);
                }
            }
        }

        let history_delta = if won {
            self.config.history_win_delta
        } else {
            -self.config.history_loss_delta
        };
        state.set(HISTORY_SLOT, clamp_unit(state.history() + history_delta));

        debug!(
            "Updated state for '{}' in {} - reward: {:.2}, teammates: {}, opponents: {}, synergy: {:.3}",
            player_id,
            sport,
            reward,
            teammates.len(),
            opponents.len(),
            state.synergy()
        );

        self.cache
            .insert((player_id.to_string(), sport.to_string()), state);
        Ok(state)
    }

    /// Number of cached (player, sport) vectors
    pub fn cached_states(&self) -> usize {
        self.cache.len()
    }

    pub fn repository(&self) -> &Arc<dyn ProfileRepository> {
        &self.repository
    }
}
