// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::KeyBindings;
use crate::game::state::GameState;
use crate::recording::format::LogEntry;

const AGGRESSION_FIRING: f64 = 0.7;
const AGGRESSION_SPRINTING: f64 = 0.8;
const AGGRESSION_CROUCHING: f64 = 0.3;
const AGGRESSION_IN_COVER: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStyle {
    Rushing,
    Sneaking,
    Strafing,
    DirectMovement,
    Stationary,
}

impl MovementStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rushing => "rushing",
            Self::Sneaking => "sneaking",
            Self::Strafing => "strafing",
            Self::DirectMovement => "direct_movement",
            Self::Stationary => "stationary",
        }
    }
}

impl fmt::Display for MovementStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    Aggressive,
    Defensive,
}

impl fmt::Display for Positioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aggressive => "aggressive",
            Self::Defensive => "defensive",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TacticalProfile {
    /// Heuristic in [0, 1].
    pub aggression_level: f64,
    pub positioning: Positioning,
}

/// Per-entry features fed into the aggregate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryFeatures {
    pub movement: MovementStyle,
    pub accuracy: f64,
    pub shots_fired: u64,
    pub hits: u64,
    pub score: i64,
    pub tactics: TacticalProfile,
}

/// Labels the movement implied by the held keys. The first matching rule
/// wins: sprint+forward, crouch+forward, two or more directions, exactly one
/// direction, nothing.
#[must_use]
pub fn classify_movement(keys: &BTreeSet<String>, bindings: &KeyBindings) -> MovementStyle {
    let held = |key: &String| keys.contains(key.as_str());
    let forward = held(&bindings.forward);

    if forward && held(&bindings.sprint) {
        return MovementStyle::Rushing;
    }
    if forward && held(&bindings.crouch) {
        return MovementStyle::Sneaking;
    }

    let directions = [
        &bindings.forward,
        &bindings.backward,
        &bindings.left,
        &bindings.right,
    ]
    .into_iter()
    .filter(|key| held(key))
    .count();

    match directions {
        0 => MovementStyle::Stationary,
        1 => MovementStyle::DirectMovement,
        _ => MovementStyle::Strafing,
    }
}

/// Averages the aggression signals present in `state`: firing (0.7),
/// sprinting (0.8) or else crouching (0.3), and being in cover (0.2). With no
/// signal the level is 0. Out of cover counts as aggressive positioning.
#[must_use]
pub fn analyze_tactics(state: &GameState) -> TacticalProfile {
    let mut factors = Vec::with_capacity(3);

    if state.tactical.in_combat {
        factors.push(AGGRESSION_FIRING);
    }
    if state.tactical.sprinting {
        factors.push(AGGRESSION_SPRINTING);
    } else if state.tactical.crouching {
        factors.push(AGGRESSION_CROUCHING);
    }

    let positioning = if state.tactical.in_cover {
        factors.push(AGGRESSION_IN_COVER);
        Positioning::Defensive
    } else {
        Positioning::Aggressive
    };

    #[allow(clippy::cast_precision_loss)]
    let aggression_level = if factors.is_empty() {
        0.0
    } else {
        factors.iter().sum::<f64>() / factors.len() as f64
    };

    TacticalProfile {
        aggression_level,
        positioning,
    }
}

#[must_use]
pub fn extract_features(entries: &[LogEntry], bindings: &KeyBindings) -> Vec<EntryFeatures> {
    let features: Vec<EntryFeatures> = entries
        .iter()
        .map(|entry| {
            let state = &entry.game_state;
            EntryFeatures {
                movement: classify_movement(&entry.input.active_keys, bindings),
                accuracy: state.accuracy(),
                shots_fired: state.shots_fired,
                hits: state.hits,
                score: state.score,
                tactics: analyze_tactics(state),
            }
        })
        .collect();
    log::debug!("extracted features from {} entries", features.len());
    features
}
