// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Camera orientation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ammo {
    pub current: u32,
    pub reserve: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponSlot {
    #[default]
    Primary,
    Secondary,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tactical {
    pub sprinting: bool,
    pub crouching: bool,
    pub in_cover: bool,
    pub in_combat: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub position: Position,
    pub rotation: Rotation,
    pub health: u32,
    pub armor: u32,
    pub weapon: WeaponSlot,
    pub ammo: Ammo,
    pub shots_fired: u64,
    pub hits: u64,
    pub score: i64,
    pub kills: u32,
    pub deaths: u32,
    /// Seconds of simulated play.
    pub game_time: f64,
    pub tactical: Tactical,
}

impl GameState {
    #[must_use]
    pub fn new(magazine_capacity: u32, reserve: u32) -> Self {
        Self {
            position: Position::default(),
            rotation: Rotation::default(),
            health: 100,
            armor: 0,
            weapon: WeaponSlot::Primary,
            ammo: Ammo {
                current: magazine_capacity,
                reserve,
            },
            shots_fired: 0,
            hits: 0,
            score: 0,
            kills: 0,
            deaths: 0,
            game_time: 0.0,
            tactical: Tactical::default(),
        }
    }

    /// Hit ratio over all shots, 0 when nothing was fired.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.shots_fired == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = self.hits as f64 / self.shots_fired as f64;
            ratio
        }
    }
}
