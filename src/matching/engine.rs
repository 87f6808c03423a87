//! Matchmaking engine
//!
//! Owns every piece of mutable matchmaking state: the encoder cache, the replay
//! buffer, both networks and the random source. Callers serialize access.

use crate::config::{MatchingConfig, ModelConfig};
use crate::error::MatchmakingError;
use crate::features::FeatureEncoder;
use crate::matching::compatibility::find_compatible_teammates;
use crate::matching::teams::{build_synthetic_match, Requester};
use crate::model::{load_latest, save_weights, DoubleDqn, LoadOutcome, TrainingStats, WeightSnapshot};
use crate::profile::ProfileRepository;
use crate::replay::{Experience, ReplayBuffer};
use crate::types::{Action, MatchmakingOutcome, MatchmakingRequest, OutcomeUpdate, UpdateSummary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Skill levels accepted from requests
pub const SKILL_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

pub struct MatchEngine {
    encoder: FeatureEncoder,
    buffer: ReplayBuffer,
    dqn: DoubleDqn,
    rng: StdRng,
    repository: Arc<dyn ProfileRepository>,
    model_config: ModelConfig,
    matching_config: MatchingConfig,
}

/// Reject requests the encoder cannot represent faithfully
pub fn validate_request(request: &MatchmakingRequest) -> Result<(), MatchmakingError> {
    if request.player_id.trim().is_empty() {
        return Err(MatchmakingError::InvalidRequest {
            reason: "playerId must not be empty".to_string(),
        });
    }
    if !SKILL_RANGE.contains(&request.skill_level) {
        return Err(MatchmakingError::InvalidRequest {
            reason: format!(
                "skillLevel must be between 1 and 5, got {}",
                request.skill_level
            ),
        });
    }
    Ok(())
}

pub fn validate_update(update: &OutcomeUpdate) -> Result<(), MatchmakingError> {
    if update.player_id.trim().is_empty() {
        return Err(MatchmakingError::InvalidRequest {
            reason: "playerId must not be empty".to_string(),
        });
    }
    if !update.reward.is_finite() {
        return Err(MatchmakingError::InvalidRequest {
            reason: "reward must be a finite number".to_string(),
        });
    }
    Ok(())
}

impl MatchEngine {
    /// Create an engine with fresh weights. Seeded when `model_config.seed` is set.
    pub fn new(
        repository: Arc<dyn ProfileRepository>,
        model_config: ModelConfig,
        matching_config: MatchingConfig,
    ) -> Self {
        let mut rng = match model_config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let dqn = DoubleDqn::new(&model_config, &mut rng);
        let buffer = ReplayBuffer::new(model_config.replay_capacity);
        let encoder = FeatureEncoder::new(repository.clone(), matching_config.clone());

        Self {
            encoder,
            buffer,
            dqn,
            rng,
            repository,
            model_config,
            matching_config,
        }
    }

    /// Load the latest snapshot from the configured weights directory
    pub fn load_weights(&mut self) -> LoadOutcome {
        load_latest(&mut self.dqn, &self.model_config.weights_dir)
    }

    pub fn save_weights(&self) -> crate::error::Result<PathBuf> {
        save_weights(&self.dqn, &self.model_config.weights_dir)
    }

    /// Parameters of the main network, ready to be written elsewhere
    pub fn weight_snapshot(&self) -> WeightSnapshot {
        WeightSnapshot::capture(&self.dqn)
    }

    /// Encode the requester, rank learned teammates and fall back to a synthetic
    /// split when too few are found.
    pub fn matchmake(
        &mut self,
        request: &MatchmakingRequest,
    ) -> crate::error::Result<MatchmakingOutcome> {
        validate_request(request)?;

        let state = self.encoder.encode(
            &request.player_id,
            request.skill_level,
            &request.sport,
            &request.location,
            &request.availability,
        )?;

        let ranked = find_compatible_teammates(
            &request.player_id,
            &state,
            &mut self.encoder,
            &self.dqn,
            &self.matching_config,
        )?;

        let use_fallback = self.matching_config.enable_synthetic_fallback
            && ranked.candidates.len() < self.matching_config.min_learned_candidates;

        if !use_fallback {
            debug!(
                "Returning {} ranked teammates for '{}'",
                ranked.candidates.len(),
                request.player_id
            );
            return Ok(MatchmakingOutcome::RankedTeammates {
                teammates: ranked.candidates,
                confidence: ranked.confidence,
            });
        }

        info!(
            "Only {} learned candidates for '{}', building synthetic teams",
            ranked.candidates.len(),
            request.player_id
        );

        let profile = self.repository.get_profile(&request.player_id)?;
        let requester = Requester {
            request,
            name: profile
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| request.player_id.clone()),
            win_rate: profile.as_ref().map(|p| p.win_rate).unwrap_or(0.0),
        };

        let synthetic = build_synthetic_match(
            &requester,
            state.sport(),
            self.matching_config.team_size,
            self.matching_config.max_confidence,
            &mut self.rng,
        )?;

        Ok(MatchmakingOutcome::TwoTeams {
            team_a: synthetic.team_a.into_iter().map(|p| p.member).collect(),
            team_b: synthetic.team_b.into_iter().map(|p| p.member).collect(),
            confidence: synthetic.confidence,
            match_quality: synthetic.quality.as_percentages(),
            explanation: synthetic.explanation,
        })
    }

    /// [`MatchEngine::apply_outcome`] followed by a synchronous snapshot when
    /// `save_on_update` is set.
    pub fn record_outcome(&mut self, update: &OutcomeUpdate) -> crate::error::Result<UpdateSummary> {
        let mut summary = self.apply_outcome(update)?;

        if self.model_config.save_on_update {
            summary.weights_saved = match self.save_weights() {
                Ok(_) => true,
                Err(e) => {
                    warn!("Failed to save model weights: {:#}", e);
                    false
                }
            };
        }
        Ok(summary)
    }

    /// Fold a reported match outcome into the player's state, store the
    /// transition and train when enough experience has accumulated.
    ///
    /// Never writes weights; `weights_saved` is always false.
    pub fn apply_outcome(&mut self, update: &OutcomeUpdate) -> crate::error::Result<UpdateSummary> {
        validate_update(update)?;

        let state = self.encoder.get_state(&update.player_id, &update.sport)?;
        let next_state = self.encoder.update_state(
            &update.player_id,
            &update.sport,
            update.reward,
            &update.teammates,
            &update.opponents,
        )?;
        self.record_game(update)?;

        self.buffer.push(Experience {
            state,
            action: Action::Join,
            reward: update.reward,
            next_state,
            done: false,
        });

        let stats: Option<TrainingStats> = self.dqn.train(&self.buffer, &mut self.rng);

        debug!(
            "Recorded outcome of match '{}' for '{}' - buffer: {}, trained: {}",
            update.match_id,
            update.player_id,
            self.buffer.len(),
            stats.is_some()
        );

        Ok(UpdateSummary {
            trained: stats.is_some(),
            loss: stats.map(|s| s.loss),
            buffer_size: self.buffer.len(),
            weights_saved: false,
        })
    }

    /// Bump the player's game count and running win rate
    fn record_game(&self, update: &OutcomeUpdate) -> crate::error::Result<()> {
        let Some(mut profile) = self.repository.get_profile(&update.player_id)? else {
            return Ok(());
        };

        let won = if update.reward > 0.0 { 1.0 } else { 0.0 };
        let games = profile.total_games as f32;
        profile.win_rate = (profile.win_rate * games + won) / (games + 1.0);
        profile.total_games += 1;
        self.repository.upsert_profile(profile)
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn train_steps(&self) -> u64 {
        self.dqn.train_steps()
    }

    pub fn cached_states(&self) -> usize {
        self.encoder.cached_states()
    }

    pub fn profile_count(&self) -> crate::error::Result<usize> {
        self.repository.profile_count()
    }

    pub fn dqn(&self) -> &DoubleDqn {
        &self.dqn
    }

    pub fn dqn_mut(&mut self) -> &mut DoubleDqn {
        &mut self.dqn
    }

    pub fn repository(&self) -> &Arc<dyn ProfileRepository> {
        &self.repository
    }
}
