//! Fixed-length state vector and its layout
//!
//! | slots    | meaning                              |
//! |----------|--------------------------------------|
//! | 0        | skill level / 5                      |
//! | 1..=7    | sport one-hot                        |
//! | 8..=12   | location one-hot                     |
//! | 13..=16  | availability one-hot                 |
//! | 17       | teammate synergy                     |
//! | 18       | match history compatibility          |
//! | 19       | auxiliary social feature             |

use crate::types::{Sport, AVAILABILITY_SLOTS, LOCATIONS};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const STATE_SIZE: usize = 20;

pub const SKILL_SLOT: usize = 0;
pub const SPORT_SLOTS: Range<usize> = 1..1 + Sport::ALL.len();
pub const LOCATION_SLOTS: Range<usize> = 8..8 + LOCATIONS.len();
pub const AVAILABILITY_SLOTS_RANGE: Range<usize> = 13..13 + AVAILABILITY_SLOTS.len();
pub const SYNERGY_SLOT: usize = 17;
pub const HISTORY_SLOT: usize = 18;
pub const AUXILIARY_SLOT: usize = 19;

/// Highest skill level; the skill slot stores `skill / MAX_SKILL_LEVEL`
pub const MAX_SKILL_LEVEL: f32 = 5.0;

/// Encoded player features fed to the value network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector([f32; STATE_SIZE]);

impl Default for StateVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl StateVector {
    pub const fn zeros() -> Self {
        Self([0.0; STATE_SIZE])
    }

    pub fn from_array(values: [f32; STATE_SIZE]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, slot: usize) -> f32 {
        self.0[slot]
    }

    pub fn set(&mut self, slot: usize, value: f32) {
        self.0[slot] = value;
    }

    /// Skill on the 1-5 request scale
    pub fn skill_level(&self) -> f32 {
        self.0[SKILL_SLOT] * MAX_SKILL_LEVEL
    }

    /// Sport whose one-hot slot is set. An all-zero block maps to the first
    /// sport, matching how the ranking has always treated unknown sports.
    pub fn sport(&self) -> Sport {
        let block = &self.0[SPORT_SLOTS];
        let mut best = 0;
        for (idx, value) in block.iter().enumerate() {
            if *value > block[best] {
                best = idx;
            }
        }
        Sport::from_index(best).unwrap_or(Sport::Cricket)
    }

    pub fn synergy(&self) -> f32 {
        self.0[SYNERGY_SLOT]
    }

    pub fn history(&self) -> f32 {
        self.0[HISTORY_SLOT]
    }

    /// Copy the synergy/history/auxiliary slots from another vector
    pub fn carry_social_features(&mut self, from: &StateVector) {
        for slot in [SYNERGY_SLOT, HISTORY_SLOT, AUXILIARY_SLOT] {
            self.0[slot] = from.0[slot];
        }
    }
}

fn set_one_hot(state: &mut [f32; STATE_SIZE], block: Range<usize>, position: Option<usize>) {
    if let Some(position) = position {
        state[block.start + position] = 1.0;
    }
}

/// Encode categorical inputs into a state vector.
///
/// Unrecognized sport, location or availability leaves its block all zero.
/// The social slots are filled with `social_value`.
pub fn encode_state(
    skill_level: u8,
    sport: &str,
    location: &str,
    availability: &str,
    social_value: f32,
) -> StateVector {
    let mut state = [0.0; STATE_SIZE];

    state[SKILL_SLOT] = f32::from(skill_level) / MAX_SKILL_LEVEL;

    set_one_hot(&mut state, SPORT_SLOTS, Sport::parse(sport).map(Sport::index));
    set_one_hot(
        &mut state,
        LOCATION_SLOTS,
        LOCATIONS.iter().position(|l| *l == location),
    );
    set_one_hot(
        &mut state,
        AVAILABILITY_SLOTS_RANGE,
        AVAILABILITY_SLOTS.iter().position(|a| *a == availability),
    );

    state[SYNERGY_SLOT] = social_value;
    state[HISTORY_SLOT] = social_value;
    state[AUXILIARY_SLOT] = social_value;

    StateVector(state)
}
