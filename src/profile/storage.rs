//! Player profile repository interface and implementations
//!
//! The encoder and the orchestrator only see [`ProfileRepository`], so the
//! in-memory store can be replaced by a database-backed one without touching them.

use crate::error::MatchmakingError;
use crate::types::{PlayerId, Sport};
use crate::utils::{clamp_unit, current_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Everything the service knows about a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    /// Skill level (1-5) per sport the player offers
    pub sports: HashMap<Sport, u8>,
    pub location: String,
    pub availability: String,
    pub total_games: u32,
    /// Fraction of games won, in [0, 1]
    pub win_rate: f32,
    /// Teammate id to synergy score in [0, 1]
    pub synergy: HashMap<PlayerId, f32>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PlayerProfile {
    /// Create a profile with no sports, stats or synergy yet
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        let now = current_timestamp();
        Self {
            id: id.into(),
            name: name.into(),
            sports: HashMap::new(),
            location: String::new(),
            availability: String::new(),
            total_games: 0,
            win_rate: 0.0,
            synergy: HashMap::new(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_sport(mut self, sport: Sport, skill_level: u8) -> Self {
        self.sports.insert(sport, skill_level);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_availability(mut self, availability: impl Into<String>) -> Self {
        self.availability = availability.into();
        self
    }

    pub fn skill_for(&self, sport: Sport) -> Option<u8> {
        self.sports.get(&sport).copied()
    }

    pub fn plays(&self, sport: Sport) -> bool {
        self.sports.contains_key(&sport)
    }
}

/// Trait for profile storage operations
#[cfg_attr(test, mockall::automock)]
pub trait ProfileRepository: Send + Sync {
    /// Get a player's profile
    fn get_profile(&self, player_id: &str) -> crate::error::Result<Option<PlayerProfile>>;

    /// Store or replace a player's profile
    fn upsert_profile(&self, profile: PlayerProfile) -> crate::error::Result<()>;

    /// All profiles, ordered by player id
    fn list_profiles(&self) -> crate::error::Result<Vec<PlayerProfile>>;

    /// Profiles offering the given sport, ordered by player id
    fn list_by_sport(&self, sport: Sport) -> crate::error::Result<Vec<PlayerProfile>> {
        Ok(self
            .list_profiles()?
            .into_iter()
            .filter(|profile| profile.plays(sport))
            .collect())
    }

    /// Move `player_id`'s synergy toward `teammate_id` by `delta`, starting from
    /// `initial` when no score exists yet. The result is clamped to [0, 1].
    ///
    /// Returns the new score, or `None` when `player_id` has no profile.
    fn adjust_synergy(
        &self,
        player_id: &str,
        teammate_id: &str,
        delta: f32,
        initial: f32,
    ) -> crate::error::Result<Option<f32>>;

    /// Total number of stored profiles
    fn profile_count(&self) -> crate::error::Result<usize>;
}

/// In-memory profile storage implementation
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<PlayerId, PlayerProfile>>,
}

fn lock_poisoned(kind: &str) -> MatchmakingError {
    MatchmakingError::InternalError {
        message: format!("Failed to acquire profiles {} lock", kind),
    }
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileRepository for InMemoryProfileRepository {
    fn get_profile(&self, player_id: &str) -> crate::error::Result<Option<PlayerProfile>> {
        let profiles = self.profiles.read().map_err(|_| lock_poisoned("read"))?;
        Ok(profiles.get(player_id).cloned())
    }

    fn upsert_profile(&self, mut profile: PlayerProfile) -> crate::error::Result<()> {
        let mut profiles = self.profiles.write().map_err(|_| lock_poisoned("write"))?;
        profile.last_updated = current_timestamp();
        profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn list_profiles(&self) -> crate::error::Result<Vec<PlayerProfile>> {
        let profiles = self.profiles.read().map_err(|_| lock_poisoned("read"))?;
        let mut all: Vec<PlayerProfile> = profiles.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn adjust_synergy(
        &self,
        player_id: &str,
        teammate_id: &str,
        delta: f32,
        initial: f32,
    ) -> crate::error::Result<Option<f32>> {
        let mut profiles = self.profiles.write().map_err(|_| lock_poisoned("write"))?;

        let Some(profile) = profiles.get_mut(player_id) else {
            return Ok(None);
        };

        let score = profile
            .synergy
            .entry(teammate_id.to_string())
            .or_insert(initial);
        *score = clamp_unit(*score + delta);
        let updated = *score;
        profile.last_updated = current_timestamp();

        Ok(Some(updated))
    }

    fn profile_count(&self) -> crate::error::Result<usize> {
        let profiles = self.profiles.read().map_err(|_| lock_poisoned("read"))?;
        Ok(profiles.len())
    }
}
