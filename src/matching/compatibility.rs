//! Learned teammate ranking
//!
//! Scores every player offering the requester's sport by blending the value
//! network's Join estimate with plain skill similarity.

use crate::config::MatchingConfig;
use crate::features::{FeatureEncoder, StateVector};
use crate::model::DoubleDqn;
use crate::types::TeammateCandidate;
use crate::utils::{mean, skill_similarity};
use std::cmp::Ordering;
use tracing::debug;

/// Ranked candidates and the confidence derived from their scores
#[derive(Debug, Clone, Default)]
pub struct RankedTeammates {
    pub candidates: Vec<TeammateCandidate>,
    /// Percentage in `[0, max_confidence]`, 0 when there are no candidates
    pub confidence: f32,
}

/// Confidence percentage for a set of combined scores
pub fn confidence_from_scores(scores: &[f32], max_confidence: f32) -> f32 {
    mean(scores)
        .map(|avg| (avg * 100.0).clamp(0.0, max_confidence))
        .unwrap_or(0.0)
}

/// Rank teammates for `requester_id` whose encoded request is `state`.
///
/// The sport comes from the state's sport block. The requester never appears in
/// their own results.
pub fn find_compatible_teammates(
    requester_id: &str,
    state: &StateVector,
    encoder: &mut FeatureEncoder,
    dqn: &DoubleDqn,
    config: &MatchingConfig,
) -> crate::error::Result<RankedTeammates> {
    let sport = state.sport();
    let requester_skill = state.skill_level();
    let requester_join = dqn.join_value(state);

    let profiles = encoder.repository().list_by_sport(sport)?;
    let mut candidates = Vec::new();

    for profile in profiles {
        if profile.id == requester_id {
            continue;
        }
        let Some(skill) = profile.skill_for(sport) else {
            continue;
        };

        let candidate_state = encoder.get_state(&profile.id, sport.name())?;
        let learned = (requester_join + dqn.join_value(&candidate_state)) / 2.0;
        let similarity = skill_similarity(requester_skill, f32::from(skill));
        let combined = config.combined_score(learned, similarity);

        if combined > config.inclusion_threshold {
            candidates.push(TeammateCandidate {
                player_id: profile.id,
                name: profile.name,
                skill_level: skill,
                compatibility: combined,
                sport,
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.compatibility
            .partial_cmp(&a.compatibility)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(config.max_candidates);

    let scores: Vec<f32> = candidates.iter().map(|c| c.compatibility).collect();
    let confidence = confidence_from_scores(&scores, config.max_confidence);

    debug!(
        "Ranked {} {} candidates for '{}' (confidence {:.1})",
        candidates.len(),
        sport,
        requester_id,
        confidence
    );

    Ok(RankedTeammates {
        candidates,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::features::STATE_SIZE;
    use crate::model::{DenseLayer, QNetwork};
    use crate::profile::{InMemoryProfileRepository, PlayerProfile, ProfileRepository};
    use crate::types::{Action, Sport};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn setup(profiles: Vec<PlayerProfile>) -> (FeatureEncoder, DoubleDqn) {
        let repo = Arc::new(InMemoryProfileRepository::new());
        for profile in profiles {
            repo.upsert_profile(profile).unwrap();
        }
        let encoder = FeatureEncoder::new(repo, MatchingConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let dqn = DoubleDqn::new(&ModelConfig::default(), &mut rng);
        (encoder, dqn)
    }

    fn footballer(id: &str, skill: u8) -> PlayerProfile {
        PlayerProfile::new(id, format!("Player {}", id))
            .with_sport(Sport::Football, skill)
            .with_location("Mumbai")
            .with_availability("Flexible")
    }

    #[test]
    fn test_confidence_from_scores() {
        assert_eq!(confidence_from_scores(&[], 99.0), 0.0);
        assert!((confidence_from_scores(&[0.5, 0.7], 99.0) - 60.0).abs() < 1e-4);
        assert_eq!(confidence_from_scores(&[1.5, 1.2], 99.0), 99.0);
    }

    #[test]
    fn test_permissive_threshold_includes_everyone_sorted() {
        let profiles = (1..=12)
            .map(|i| footballer(&format!("p{:02}", i), (i % 5) as u8 + 1))
            .collect();
        let (mut encoder, dqn) = setup(profiles);
        let config = MatchingConfig {
            inclusion_threshold: -1000.0,
            ..MatchingConfig::default()
        };

        let state = encoder
            .encode("me", 3, "Football", "Mumbai", "Flexible")
            .unwrap();
        let ranked = find_compatible_teammates("me", &state, &mut encoder, &dqn, &config).unwrap();

        assert_eq!(ranked.candidates.len(), 10);
        assert!(ranked
            .candidates
            .windows(2)
            .all(|pair| pair[0].compatibility >= pair[1].compatibility));
        assert!(ranked.candidates.iter().all(|c| c.player_id != "me"));
        assert!(ranked.candidates.iter().all(|c| c.sport == Sport::Football));
        assert!((0.0..=99.0).contains(&ranked.confidence));
    }

    #[test]
    fn test_strict_threshold_returns_nothing() {
        let (mut encoder, dqn) = setup(vec![footballer("p1", 3), footballer("p2", 3)]);
        let config = MatchingConfig {
            inclusion_threshold: 1000.0,
            ..MatchingConfig::default()
        };

        let state = encoder
            .encode("me", 3, "Football", "Mumbai", "Flexible")
            .unwrap();
        let ranked = find_compatible_teammates("me", &state, &mut encoder, &dqn, &config).unwrap();
        assert!(ranked.candidates.is_empty());
        assert_eq!(ranked.confidence, 0.0);
    }

    #[test]
    fn test_only_matching_sport_is_scored() {
        let tennis = PlayerProfile::new("t1", "Tennis Player").with_sport(Sport::Tennis, 3);
        let (mut encoder, dqn) = setup(vec![footballer("p1", 3), tennis]);
        let config = MatchingConfig {
            inclusion_threshold: -1000.0,
            ..MatchingConfig::default()
        };

        let state = encoder
            .encode("me", 3, "Football", "Mumbai", "Flexible")
            .unwrap();
        let ranked = find_compatible_teammates("me", &state, &mut encoder, &dqn, &config).unwrap();
        let ids: Vec<_> = ranked.candidates.iter().map(|c| c.player_id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn test_unknown_sport_ranks_against_cricket() {
        let cricketer = PlayerProfile::new("c1", "Cricketer").with_sport(Sport::Cricket, 2);
        let (mut encoder, dqn) = setup(vec![cricketer, footballer("p1", 3)]);
        let config = MatchingConfig {
            inclusion_threshold: -1000.0,
            ..MatchingConfig::default()
        };

        let state = encoder
            .encode("me", 2, "Curling", "Mumbai", "Flexible")
            .unwrap();
        let ranked = find_compatible_teammates("me", &state, &mut encoder, &dqn, &config).unwrap();
        assert_eq!(ranked.candidates.len(), 1);
        assert_eq!(ranked.candidates[0].sport, Sport::Cricket);
    }

    /// Network whose every output is its head bias: Reject 0, Join `join`
    fn pinned_join_dqn(join: f32) -> DoubleDqn {
        let config = ModelConfig {
            hidden_units: 8,
            ..ModelConfig::default()
        };
        let mut head = DenseLayer::zeros(8, Action::COUNT);
        head.biases[Action::Join.index()] = join;
        let network = QNetwork::from_layers(vec![
            DenseLayer::zeros(STATE_SIZE, 8),
            DenseLayer::zeros(8, 8),
            head,
        ])
        .unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let mut dqn = DoubleDqn::new(&config, &mut rng);
        dqn.load_network(network).unwrap();
        dqn
    }

    fn rank_at_defaults(join: f32, candidate_skill: u8) -> RankedTeammates {
        let (mut encoder, _) = setup(vec![footballer("p1", candidate_skill)]);
        let dqn = pinned_join_dqn(join);
        let config = MatchingConfig::default();

        let state = encoder
            .encode("me", 3, "Football", "Mumbai", "Flexible")
            .unwrap();
        find_compatible_teammates("me", &state, &mut encoder, &dqn, &config).unwrap()
    }

    #[test]
    fn test_default_gate_includes_score_above_threshold() {
        // 0.7 * 0.2 + 0.3 * 1.0 = 0.44
        let ranked = rank_at_defaults(0.2, 3);
        assert_eq!(ranked.candidates.len(), 1);
        assert!((ranked.candidates[0].compatibility - 0.44).abs() < 1e-5);
        assert!((ranked.confidence - 44.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_gate_drops_score_below_threshold() {
        // 0.7 * 0.1 + 0.3 * 1.0 = 0.37
        let ranked = rank_at_defaults(0.1, 3);
        assert!(ranked.candidates.is_empty());
        assert_eq!(ranked.confidence, 0.0);
    }

    #[test]
    fn test_default_gate_penalizes_skill_gap() {
        // 0.7 * 0.2 + 0.3 * (1 - 2 / 5) = 0.32
        let ranked = rank_at_defaults(0.2, 5);
        assert!(ranked.candidates.is_empty());
    }
}
