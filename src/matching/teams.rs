//! Synthetic two-team fallback
//!
//! When the learned ranking has too few candidates, the requester is placed in a
//! generated pool which is split into two equal sides and scored with simple
//! match-quality heuristics.

use crate::types::{
    MatchQuality, MatchmakingRequest, PlayerId, Sport, TeamMember, AVAILABILITY_SLOTS,
    FLEXIBLE_AVAILABILITY, LOCATIONS,
};
use crate::utils::{generate_synthetic_player_id, mean, skill_similarity};
use anyhow::anyhow;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use rand_distr::Normal;
use std::collections::{HashMap, HashSet};

const SKILL_SPREAD: f32 = 1.0;
const SYNERGY_RANGE: std::ops::RangeInclusive<f32> = 0.5..=0.9;
const SYNERGY_LINKS: usize = 2;
const DEFAULT_PAIR_SYNERGY: f32 = 0.5;

/// A pool member with the attributes the quality metrics look at
#[derive(Debug, Clone)]
pub struct PoolPlayer {
    pub member: TeamMember,
    pub location: String,
    pub availability: String,
    pub synergy: HashMap<PlayerId, f32>,
}

/// The requester as they enter the pool
#[derive(Debug, Clone)]
pub struct Requester<'a> {
    pub request: &'a MatchmakingRequest,
    pub name: String,
    pub win_rate: f32,
}

/// Match-quality components, each a fraction in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScores {
    pub skill_balance: f32,
    pub synergy: f32,
    pub availability: f32,
    pub location: f32,
    pub position_balance: f32,
}

impl QualityScores {
    pub fn overall(&self) -> f32 {
        0.3 * self.skill_balance
            + 0.25 * self.synergy
            + 0.15 * self.availability
            + 0.1 * self.location
            + 0.2 * self.position_balance
    }

    pub fn as_percentages(&self) -> MatchQuality {
        MatchQuality {
            overall: self.overall() * 100.0,
            skill_balance: self.skill_balance * 100.0,
            synergy: self.synergy * 100.0,
            availability: self.availability * 100.0,
            location: self.location * 100.0,
            position_balance: self.position_balance * 100.0,
        }
    }
}

/// Two equal sides, their quality and a readable summary
#[derive(Debug, Clone)]
pub struct SyntheticMatch {
    pub team_a: Vec<PoolPlayer>,
    pub team_b: Vec<PoolPlayer>,
    pub quality: QualityScores,
    pub confidence: f32,
    pub explanation: String,
}

fn sample_skill<R>(around: u8, normal: &Normal<f32>, rng: &mut R) -> u8
where
    R: Rng + ?Sized,
{
    let raw = f32::from(around) + rng.sample(normal);
    raw.round().clamp(1.0, 5.0) as u8
}

fn random_choice<R>(options: &[&'static str], rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    options.choose(rng).map(|s| s.to_string()).unwrap_or_default()
}

/// Build a pool of `2 * team_size` players that includes the requester
pub fn build_pool<R>(
    requester: &Requester<'_>,
    sport: Sport,
    team_size: usize,
    rng: &mut R,
) -> crate::error::Result<Vec<PoolPlayer>>
where
    R: Rng + ?Sized,
{
    let normal = Normal::new(0.0, SKILL_SPREAD)
        .map_err(|e| anyhow!("Invalid skill distribution: {}", e))?;
    let roles = sport.roles();
    let request = requester.request;

    let mut pool = Vec::with_capacity(team_size * 2);
    pool.push(PoolPlayer {
        member: TeamMember {
            id: request.player_id.clone(),
            name: requester.name.clone(),
            position: random_choice(roles, rng),
            skill_level: request.skill_level,
            win_rate: requester.win_rate,
        },
        location: request.location.clone(),
        availability: request.availability.clone(),
        synergy: HashMap::new(),
    });

    for index in 1..team_size * 2 {
        pool.push(PoolPlayer {
            member: TeamMember {
                id: generate_synthetic_player_id(),
                name: format!("{} Player {}", sport, index),
                position: random_choice(roles, rng),
                skill_level: sample_skill(request.skill_level, &normal, rng),
                win_rate: rng.random_range(0.3..=0.7),
            },
            location: random_choice(&LOCATIONS, rng),
            availability: random_choice(&AVAILABILITY_SLOTS, rng),
            synergy: HashMap::new(),
        });
    }

    // A few known pairings per generated player
    let ids: Vec<PlayerId> = pool.iter().map(|p| p.member.id.clone()).collect();
    for player in pool.iter_mut().skip(1) {
        let others: Vec<&PlayerId> = ids.iter().filter(|id| **id != player.member.id).collect();
        for teammate in others.choose_multiple(rng, SYNERGY_LINKS) {
            player
                .synergy
                .insert((*teammate).clone(), rng.random_range(SYNERGY_RANGE));
        }
    }

    Ok(pool)
}

fn average_skill(team: &[PoolPlayer]) -> f32 {
    let skills: Vec<f32> = team
        .iter()
        .map(|p| f32::from(p.member.skill_level))
        .collect();
    mean(&skills).unwrap_or(0.0)
}

/// Mean pairwise synergy; pairs without history count as 0.5
pub fn team_synergy(team: &[PoolPlayer]) -> f32 {
    let mut scores = Vec::new();
    for (i, a) in team.iter().enumerate() {
        for b in &team[i + 1..] {
            let score = a
                .synergy
                .get(&b.member.id)
                .or_else(|| b.synergy.get(&a.member.id))
                .copied()
                .unwrap_or(DEFAULT_PAIR_SYNERGY);
            scores.push(score);
        }
    }
    mean(&scores).unwrap_or(DEFAULT_PAIR_SYNERGY)
}

fn share<F>(team: &[PoolPlayer], predicate: F) -> f32
where
    F: Fn(&PoolPlayer) -> bool,
{
    if team.is_empty() {
        return 0.0;
    }
    team.iter().filter(|p| predicate(p)).count() as f32 / team.len() as f32
}

/// Fraction of the sport's roles covered by the team
pub fn role_coverage(team: &[PoolPlayer], sport: Sport) -> f32 {
    let roles = sport.roles();
    if roles.is_empty() {
        return 1.0;
    }
    let present: HashSet<&str> = team.iter().map(|p| p.member.position.as_str()).collect();
    roles.iter().filter(|role| present.contains(**role)).count() as f32 / roles.len() as f32
}

/// Score a split against the requester's availability and location
pub fn score_teams(
    team_a: &[PoolPlayer],
    team_b: &[PoolPlayer],
    sport: Sport,
    availability: &str,
    location: &str,
) -> QualityScores {
    let available = |p: &PoolPlayer| {
        p.availability == availability || p.availability == FLEXIBLE_AVAILABILITY
    };
    let nearby = |p: &PoolPlayer| p.location == location;

    QualityScores {
        skill_balance: skill_similarity(average_skill(team_a), average_skill(team_b)),
        synergy: (team_synergy(team_a) + team_synergy(team_b)) / 2.0,
        availability: (share(team_a, available) + share(team_b, available)) / 2.0,
        location: (share(team_a, nearby) + share(team_b, nearby)) / 2.0,
        position_balance: (role_coverage(team_a, sport) + role_coverage(team_b, sport)) / 2.0,
    }
}

fn explain(quality: &QualityScores, team_a: &[PoolPlayer], team_b: &[PoolPlayer]) -> String {
    let gap = (average_skill(team_a) - average_skill(team_b)).abs();
    let mut text = format!(
        "Teams are balanced to within {:.1} skill points on average ({:.0}% skill balance). ",
        gap,
        quality.skill_balance * 100.0
    );

    text.push_str(&format!(
        "Expected team synergy is {:.0}%, {:.0}% of players can make the requested time slot \
         and {:.0}% play in the same city. ",
        quality.synergy * 100.0,
        quality.availability * 100.0,
        quality.location * 100.0
    ));

    if quality.position_balance >= 1.0 {
        text.push_str("Both sides cover every position.");
    } else {
        text.push_str(&format!(
            "Position coverage is {:.0}%, so some roles may need to be shared.",
            quality.position_balance * 100.0
        ));
    }

    text
}

/// Build, shuffle and split a synthetic pool for the requester
pub fn build_synthetic_match<R>(
    requester: &Requester<'_>,
    sport: Sport,
    team_size: usize,
    max_confidence: f32,
    rng: &mut R,
) -> crate::error::Result<SyntheticMatch>
where
    R: Rng + ?Sized,
{
    let mut pool = build_pool(requester, sport, team_size, rng)?;
    pool.shuffle(rng);
    let team_b = pool.split_off(team_size);
    let team_a = pool;

    let quality = score_teams(
        &team_a,
        &team_b,
        sport,
        &requester.request.availability,
        &requester.request.location,
    );
    let confidence = (quality.overall() * 100.0).clamp(0.0, max_confidence);
    let explanation = explain(&quality, &team_a, &team_b);

    Ok(SyntheticMatch {
        team_a,
        team_b,
        quality,
        confidence,
        explanation,
    })
}
