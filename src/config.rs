// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sampling: SamplingSettings,
    pub buffer: BufferSettings,
    pub movement: MovementSettings,
    pub performance: PerformanceSettings,
    pub input: InputSettings,
    pub analysis: AnalysisSettings,
    pub keybinds: KeyBindings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub frequency_hz: u32,
    /// Ticks slower than this are logged as warnings.
    pub loop_warn_ms: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 60,
            loop_warn_ms: 20,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    pub flush_threshold: usize,
    pub flush_interval_secs: u64,
    pub log_dir: PathBuf,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            flush_threshold: 1000,
            flush_interval_secs: 60,
            log_dir: PathBuf::from("game_logs"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Walking speed in meters per second.
    pub base_speed: f64,
    pub sprint_multiplier: f64,
    /// Degrees of rotation per pixel of mouse offset from the screen center.
    pub mouse_sensitivity: f64,
    pub screen_width: u32,
    pub screen_height: u32,
    pub magazine_capacity: u32,
    pub initial_reserve: u32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            base_speed: 4.8,
            sprint_multiplier: 1.5,
            mouse_sensitivity: 0.1,
            screen_width: 1920,
            screen_height: 1080,
            magazine_capacity: 30,
            initial_reserve: 90,
        }
    }
}

impl MovementSettings {
    #[must_use]
    pub fn screen_center(&self) -> (f64, f64) {
        (
            f64::from(self.screen_width) / 2.0,
            f64::from(self.screen_height) / 2.0,
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub sample_interval_ms: u64,
    pub max_cpu_percent: f32,
    pub max_memory_mb: f64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            max_cpu_percent: 80.0,
            max_memory_mb: 500.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub track_keyboard: bool,
    pub track_mouse: bool,
    /// How long a key counts as held after its last press or repeat when the
    /// terminal cannot report releases.
    pub key_hold_ms: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            track_keyboard: true,
            track_mouse: true,
            key_hold_ms: 600,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Seconds between in-session analysis passes; 0 disables them.
    pub interval_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub jump: String,
    pub crouch: String,
    pub sprint: String,
    pub reload: String,
    pub primary_weapon: String,
    pub secondary_weapon: String,
    pub interact: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".into(),
            backward: "s".into(),
            left: "a".into(),
            right: "d".into(),
            jump: "space".into(),
            crouch: "ctrl".into(),
            sprint: "shift".into(),
            reload: "r".into(),
            primary_weapon: "1".into(),
            secondary_weapon: "2".into(),
            interact: "f".into(),
        }
    }
}

impl KeyBindings {
    fn all(&self) -> [&str; 11] {
        [
            self.forward.as_str(),
            self.backward.as_str(),
            self.left.as_str(),
            self.right.as_str(),
            self.jump.as_str(),
            self.crouch.as_str(),
            self.sprint.as_str(),
            self.reload.as_str(),
            self.primary_weapon.as_str(),
            self.secondary_weapon.as_str(),
            self.interact.as_str(),
        ]
    }
}

impl Settings {
    /// Loads settings from a JSON file. Keys missing from the file keep their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting settings fail validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.frequency_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling.frequency_hz",
                reason: "must be greater than zero",
            });
        }
        if self.buffer.flush_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "buffer.flush_threshold",
                reason: "must be greater than zero",
            });
        }
        if self.buffer.flush_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "buffer.flush_interval_secs",
                reason: "must be greater than zero",
            });
        }
        if !is_positive(self.movement.base_speed) {
            return Err(ConfigError::Invalid {
                field: "movement.base_speed",
                reason: "must be positive",
            });
        }
        if !is_positive(self.movement.sprint_multiplier) {
            return Err(ConfigError::Invalid {
                field: "movement.sprint_multiplier",
                reason: "must be positive",
            });
        }
        if self.movement.magazine_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "movement.magazine_capacity",
                reason: "must be greater than zero",
            });
        }
        if self.performance.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "performance.sample_interval_ms",
                reason: "must be greater than zero",
            });
        }
        if self.keybinds.all().iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "keybinds",
                reason: "every action needs a key",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.sampling.frequency_hz.max(1)))
    }

    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.buffer.flush_interval_secs)
    }

    #[must_use]
    pub fn perf_interval(&self) -> Duration {
        Duration::from_millis(self.performance.sample_interval_ms)
    }

    #[must_use]
    pub fn analysis_interval(&self) -> Option<Duration> {
        (self.analysis.interval_secs > 0).then(|| Duration::from_secs(self.analysis.interval_secs))
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.sampling.frequency_hz, 60);
        assert_eq!(settings.buffer.flush_threshold, 1000);
        assert_eq!(settings.movement.magazine_capacity, 30);
        assert_eq!(settings.keybinds.sprint, "shift");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "sampling": { "frequency_hz": 30 }, "keybinds": { "sprint": "alt" } }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.sampling.frequency_hz, 30);
        assert_eq!(settings.sampling.loop_warn_ms, 20);
        assert_eq!(settings.keybinds.sprint, "alt");
        assert_eq!(settings.keybinds.forward, "w");
        assert!((settings.movement.base_speed - 4.8).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let mut settings = Settings::default();
        settings.sampling.frequency_hz = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                field: "sampling.frequency_hz",
                ..
            })
        ));
    }

    #[test]
    fn empty_keybind_is_rejected() {
        let mut settings = Settings::default();
        settings.keybinds.reload = "  ".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn tick_period_matches_frequency() {
        let settings = Settings::default();
        let period = settings.tick_period();
        assert!((period.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
        assert!(settings.analysis_interval().is_some());
    }
}
