//! Common types used throughout the matchmaking service

use serde::{Deserialize, Serialize};

/// Unique identifier for players
pub type PlayerId = String;

/// Sports the service knows how to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    Cricket,
    Football,
    Basketball,
    Pickleball,
    Tennis,
    Volleyball,
    Badminton,
}

impl Sport {
    /// Every sport, in encoding order
    pub const ALL: [Sport; 7] = [
        Sport::Cricket,
        Sport::Football,
        Sport::Basketball,
        Sport::Pickleball,
        Sport::Tennis,
        Sport::Volleyball,
        Sport::Badminton,
    ];

    /// Look up a sport by its display name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sport| sport.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Sport::Cricket => "Cricket",
            Sport::Football => "Football",
            Sport::Basketball => "Basketball",
            Sport::Pickleball => "Pickleball",
            Sport::Tennis => "Tennis",
            Sport::Volleyball => "Volleyball",
            Sport::Badminton => "Badminton",
        }
    }

    /// Position of this sport inside its one-hot block
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// On-field roles used when assembling synthetic teams
    pub fn roles(self) -> &'static [&'static str] {
        match self {
            Sport::Football => &["Goalkeeper", "Defender", "Midfielder", "Forward"],
            Sport::Cricket => &["Batter", "Bowler", "All-rounder", "Wicket-keeper"],
            Sport::Basketball => &["Guard", "Forward", "Center"],
            Sport::Volleyball => &["Setter", "Outside Hitter", "Middle Blocker", "Libero"],
            Sport::Pickleball | Sport::Tennis | Sport::Badminton => &["Baseline", "Net"],
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Cities covered by the location block
pub const LOCATIONS: [&str; 5] = ["Mumbai", "Delhi", "Bangalore", "Chennai", "Hyderabad"];

/// Availability slots covered by the availability block
pub const AVAILABILITY_SLOTS: [&str; 4] = [
    "Weekday Evenings",
    "Weekend Mornings",
    "Weekend Evenings",
    "Flexible",
];

/// The slot that is compatible with every other slot
pub const FLEXIBLE_AVAILABILITY: &str = "Flexible";

/// Action taken by a player when offered a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Reject = 0,
    Join = 1,
}

impl Action {
    pub const COUNT: usize = 2;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Inbound matchmaking request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingRequest {
    pub player_id: PlayerId,
    /// Skill on a 1-5 scale
    pub skill_level: u8,
    pub sport: String,
    pub location: String,
    pub availability: String,
}

/// Match outcome reported after a game was played
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeUpdate {
    pub player_id: PlayerId,
    pub match_id: String,
    /// Positive for a win, negative for a loss
    pub reward: f32,
    pub sport: String,
    #[serde(default)]
    pub teammates: Vec<PlayerId>,
    #[serde(default)]
    pub opponents: Vec<PlayerId>,
}

/// A teammate suggested by the learned model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeammateCandidate {
    pub player_id: PlayerId,
    pub name: String,
    pub skill_level: u8,
    pub compatibility: f32,
    pub sport: Sport,
}

/// Member of a synthetic team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: PlayerId,
    pub name: String,
    pub position: String,
    pub skill_level: u8,
    pub win_rate: f32,
}

/// Quality breakdown of a synthetic match, every field in percent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuality {
    /// Weighted blend of the other components
    pub overall: f32,
    pub skill_balance: f32,
    pub synergy: f32,
    pub availability: f32,
    pub location: f32,
    pub position_balance: f32,
}

/// Result of a matchmaking request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum MatchmakingOutcome {
    /// Teammates ranked by the learned compatibility score
    RankedTeammates {
        teammates: Vec<TeammateCandidate>,
        confidence: f32,
    },
    /// Synthetic two-team split used when too few learned candidates exist
    #[serde(rename_all = "camelCase")]
    TwoTeams {
        team_a: Vec<TeamMember>,
        team_b: Vec<TeamMember>,
        confidence: f32,
        match_quality: MatchQuality,
        explanation: String,
    },
}

impl MatchmakingOutcome {
    pub fn confidence(&self) -> f32 {
        match self {
            MatchmakingOutcome::RankedTeammates { confidence, .. }
            | MatchmakingOutcome::TwoTeams { confidence, .. } => *confidence,
        }
    }

    /// Short label used for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            MatchmakingOutcome::RankedTeammates { .. } => "ranked_teammates",
            MatchmakingOutcome::TwoTeams { .. } => "two_teams",
        }
    }
}

/// Summary of what an outcome update did to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub trained: bool,
    pub loss: Option<f32>,
    pub buffer_size: usize,
    pub weights_saved: bool,
}
