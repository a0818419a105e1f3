// SPDX-License-Identifier: MIT
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::game::state::GameState;
use crate::input::snapshot::InputSnapshot;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Local start time formatted `YYYYMMDD_HHMMSS`; keys the session's files.
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub os: String,
    pub arch: String,
    pub running_as_root: bool,
    pub tracking_enabled: bool,
    pub game_source: String,
    pub frequency_hz: u32,
}

impl SessionMetadata {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, game_source: &str, frequency_hz: u32) -> Self {
        Self {
            session_id: session_id(started_at),
            started_at,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            running_as_root: running_as_root(),
            tracking_enabled: false,
            game_source: game_source.to_string(),
            frequency_hz,
        }
    }
}

#[must_use]
pub fn session_id(started_at: DateTime<Utc>) -> String {
    started_at
        .with_timezone(&Local)
        .format("%Y%m%d_%H%M%S")
        .to_string()
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Where game state comes from. The bundled source estimates it from input;
/// a real game integration would read it from the game instead.
pub trait GameStateSource {
    fn advance(&mut self, input: &InputSnapshot, delta_secs: f64);
    fn state(&self) -> GameState;
    fn name(&self) -> &'static str;
}
