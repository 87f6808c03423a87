//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use anyhow::anyhow;
use squadmatch::config::AppConfig;
use squadmatch::error::Result;
use squadmatch::profile::{InMemoryProfileRepository, PlayerProfile, ProfileRepository};
use squadmatch::service::AppState;
use squadmatch::types::{MatchmakingRequest, OutcomeUpdate, Sport};
use std::path::PathBuf;
use std::sync::Arc;

/// Unique scratch directory for weight snapshots
pub fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "squadmatch-{}-{}",
        label,
        uuid::Uuid::new_v4().simple()
    ))
}

/// Small, seeded configuration with no demo profiles and no snapshots
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.model.hidden_units = 16;
    config.model.batch_size = 4;
    config.model.replay_capacity = 64;
    config.model.save_on_update = false;
    config.model.seed = Some(1234);
    config.model.weights_dir = scratch_dir("weights");
    config.matching.demo_profile_count = 0;
    config
}

pub fn footballer(id: &str, skill: u8) -> PlayerProfile {
    PlayerProfile::new(id, format!("Footballer {}", id))
        .with_sport(Sport::Football, skill)
        .with_location("Mumbai")
        .with_availability("Weekend Evenings")
}

/// `count` footballers with skills cycling through 1..=5
pub fn footballers(count: usize) -> Vec<PlayerProfile> {
    (0..count)
        .map(|i| footballer(&format!("fb_{:03}", i), (i % 5) as u8 + 1))
        .collect()
}

/// App state over an in-memory repository holding `profiles`
pub async fn create_test_system(
    config: AppConfig,
    profiles: Vec<PlayerProfile>,
) -> (Arc<AppState>, Arc<InMemoryProfileRepository>) {
    let repository = Arc::new(InMemoryProfileRepository::new());
    for profile in profiles {
        repository.upsert_profile(profile).unwrap();
    }

    let state = AppState::with_repository(config, repository.clone())
        .await
        .unwrap();
    (Arc::new(state), repository)
}

pub fn football_request(player_id: &str, skill: u8) -> MatchmakingRequest {
    MatchmakingRequest {
        player_id: player_id.to_string(),
        skill_level: skill,
        sport: "Football".to_string(),
        location: "Mumbai".to_string(),
        availability: "Weekend Evenings".to_string(),
    }
}

pub fn football_outcome(player_id: &str, reward: f32, teammates: &[&str]) -> OutcomeUpdate {
    OutcomeUpdate {
        player_id: player_id.to_string(),
        match_id: format!("match_{}", uuid::Uuid::new_v4().simple()),
        reward,
        sport: "Football".to_string(),
        teammates: teammates.iter().map(|t| t.to_string()).collect(),
        opponents: vec![],
    }
}

/// Repository whose backing store is unreachable
#[derive(Debug, Default)]
pub struct UnavailableProfileRepository;

impl ProfileRepository for UnavailableProfileRepository {
    fn get_profile(&self, _player_id: &str) -> Result<Option<PlayerProfile>> {
        Err(anyhow!("profile store unreachable"))
    }

    fn upsert_profile(&self, _profile: PlayerProfile) -> Result<()> {
        Err(anyhow!("profile store unreachable"))
    }

    fn list_profiles(&self) -> Result<Vec<PlayerProfile>> {
        Err(anyhow!("profile store unreachable"))
    }

    fn adjust_synergy(
        &self,
        _player_id: &str,
        _teammate_id: &str,
        _delta: f32,
        _initial: f32,
    ) -> Result<Option<f32>> {
        Err(anyhow!("profile store unreachable"))
    }

    fn profile_count(&self) -> Result<usize> {
        Err(anyhow!("profile store unreachable"))
    }
}
