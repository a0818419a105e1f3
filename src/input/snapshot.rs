// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// Input state valid at `captured_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub captured_at: DateTime<Utc>,
    pub active_keys: BTreeSet<String>,
    pub mouse_position: (f64, f64),
    pub mouse_buttons: MouseButtons,
    pub tracking_enabled: bool,
    pub secs_since_mouse_move: f64,
}

impl InputSnapshot {
    /// A snapshot with nothing held and the mouse resting at `mouse_position`.
    #[must_use]
    pub fn idle(captured_at: DateTime<Utc>, mouse_position: (f64, f64)) -> Self {
        Self {
            captured_at,
            active_keys: BTreeSet::new(),
            mouse_position,
            mouse_buttons: MouseButtons::default(),
            tracking_enabled: false,
            secs_since_mouse_move: 0.0,
        }
    }

    #[must_use]
    pub fn is_pressed(&self, key: &str) -> bool {
        self.active_keys.contains(key)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AimMetrics {
    pub distance_from_center: f64,
    pub angle_degrees: f64,
    pub is_ads: bool,
}

impl AimMetrics {
    #[must_use]
    pub fn from_snapshot(snapshot: &InputSnapshot, center: (f64, f64)) -> Self {
        let dx = snapshot.mouse_position.0 - center.0;
        let dy = snapshot.mouse_position.1 - center.1;
        Self {
            distance_from_center: dx.hypot(dy),
            angle_degrees: dy.atan2(dx).to_degrees(),
            is_ads: snapshot.mouse_buttons.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aim_metrics_at_center_are_zero() {
        let snap = InputSnapshot::idle(Utc::now(), (960.0, 540.0));
        let aim = AimMetrics::from_snapshot(&snap, (960.0, 540.0));
        assert!(aim.distance_from_center.abs() < f64::EPSILON);
        assert!(!aim.is_ads);
    }

    #[test]
    fn aim_metrics_distance_and_angle() {
        let mut snap = InputSnapshot::idle(Utc::now(), (963.0, 544.0));
        snap.mouse_buttons.right = true;
        let aim = AimMetrics::from_snapshot(&snap, (960.0, 540.0));
        assert!((aim.distance_from_center - 5.0).abs() < 1e-9);
        assert!((aim.angle_degrees - 4f64.atan2(3.0).to_degrees()).abs() < 1e-9);
        assert!(aim.is_ads);
    }
}
