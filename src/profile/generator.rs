//! Demo profile generation
//!
//! Populates a repository with randomly generated players so the learned
//! ranking has candidates to score before real traffic arrives.

use crate::profile::storage::{PlayerProfile, ProfileRepository};
use crate::types::{Sport, AVAILABILITY_SLOTS, LOCATIONS};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

/// Build one demo profile with 1-3 sports at random skill levels
pub fn random_profile<R>(index: usize, rng: &mut R) -> PlayerProfile
where
    R: Rng + ?Sized,
{
    let sport_count = rng.random_range(1..=3);
    let mut profile = PlayerProfile::new(format!("player_{}", index), format!("Player {}", index));

    for sport in Sport::ALL.choose_multiple(rng, sport_count) {
        profile.sports.insert(*sport, rng.random_range(1..=5));
    }

    profile.location = LOCATIONS
        .choose(rng)
        .map(|s| s.to_string())
        .unwrap_or_default();
    profile.availability = AVAILABILITY_SLOTS
        .choose(rng)
        .map(|s| s.to_string())
        .unwrap_or_default();
    profile.total_games = rng.random_range(0..50);
    profile.win_rate = rng.random_range(0.0..1.0);

    profile
}

/// Seed `count` demo profiles named `player_1` .. `player_<count>`
pub fn seed_demo_profiles<R>(
    repository: &dyn ProfileRepository,
    count: usize,
    rng: &mut R,
) -> crate::error::Result<usize>
where
    R: Rng + ?Sized,
{
    for index in 1..=count {
        repository.upsert_profile(random_profile(index, rng))?;
    }

    info!("Seeded {} demo player profiles", count);
    Ok(count)
}
