// SPDX-License-Identifier: MIT
use super::state::{GameState, WeaponSlot};
use crate::config::{KeyBindings, MovementSettings};
use crate::datasource::GameStateSource;
use crate::input::snapshot::InputSnapshot;

const PITCH_LIMIT: f64 = 89.0;

/// Dead-reckons player state from input alone. Every update is a pure
/// function of the previous state, the input snapshot and the elapsed time.
pub struct GameStateEstimator {
    state: GameState,
    movement: MovementSettings,
    keys: KeyBindings,
}

impl GameStateEstimator {
    #[must_use]
    pub fn new(movement: MovementSettings, keys: KeyBindings) -> Self {
        Self {
            state: GameState::new(movement.magazine_capacity, movement.initial_reserve),
            movement,
            keys,
        }
    }

    pub fn update(&mut self, input: &InputSnapshot, delta_secs: f64) {
        let dt = if delta_secs.is_finite() {
            delta_secs.max(0.0)
        } else {
            0.0
        };

        self.update_position(input, dt);
        self.update_rotation(input);
        self.update_combat(input);
        self.update_weapon(input);

        self.state.game_time += dt;
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        self.state.clone()
    }

    fn update_position(&mut self, input: &InputSnapshot, dt: f64) {
        let mut move_x = 0.0_f64;
        let mut move_z = 0.0_f64;
        if input.is_pressed(&self.keys.forward) {
            move_z += 1.0;
        }
        if input.is_pressed(&self.keys.backward) {
            move_z -= 1.0;
        }
        if input.is_pressed(&self.keys.right) {
            move_x += 1.0;
        }
        if input.is_pressed(&self.keys.left) {
            move_x -= 1.0;
        }

        let sprint_held = input.is_pressed(&self.keys.sprint);
        let moving = move_x != 0.0 || move_z != 0.0;
        self.state.tactical.sprinting = sprint_held && moving;
        self.state.tactical.crouching = input.is_pressed(&self.keys.crouch);

        if !moving {
            return;
        }

        let mut speed = self.movement.base_speed;
        if sprint_held {
            speed *= self.movement.sprint_multiplier;
        }

        let magnitude = move_x.hypot(move_z);
        let step_x = move_x / magnitude * speed * dt;
        let step_z = move_z / magnitude * speed * dt;

        let (sin, cos) = self.state.rotation.yaw.to_radians().sin_cos();
        self.state.position.x += step_x * cos - step_z * sin;
        self.state.position.z += step_x * sin + step_z * cos;
    }

    fn update_rotation(&mut self, input: &InputSnapshot) {
        let (center_x, center_y) = self.movement.screen_center();
        let (mouse_x, mouse_y) = input.mouse_position;
        let sensitivity = self.movement.mouse_sensitivity;

        let rotation = &mut self.state.rotation;
        rotation.yaw = (rotation.yaw + (mouse_x - center_x) * sensitivity).rem_euclid(360.0);
        rotation.pitch =
            (rotation.pitch + (mouse_y - center_y) * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    fn update_combat(&mut self, input: &InputSnapshot) {
        let firing = input.mouse_buttons.left && self.state.ammo.current > 0;
        if firing {
            self.state.ammo.current -= 1;
            self.state.shots_fired += 1;
        }
        self.state.tactical.in_combat = firing;

        let capacity = self.movement.magazine_capacity;
        if input.is_pressed(&self.keys.reload) && self.state.ammo.current < capacity {
            let needed = capacity - self.state.ammo.current;
            let taken = needed.min(self.state.ammo.reserve);
            self.state.ammo.current += taken;
            self.state.ammo.reserve -= taken;
        }
    }

    fn update_weapon(&mut self, input: &InputSnapshot) {
        if input.is_pressed(&self.keys.primary_weapon) {
            self.state.weapon = WeaponSlot::Primary;
        } else if input.is_pressed(&self.keys.secondary_weapon) {
            self.state.weapon = WeaponSlot::Secondary;
        }
    }
}

impl GameStateSource for GameStateEstimator {
    fn advance(&mut self, input: &InputSnapshot, delta_secs: f64) {
        self.update(input, delta_secs);
    }

    fn state(&self) -> GameState {
        GameStateEstimator::state(self)
    }

    fn name(&self) -> &'static str {
        "input-estimator"
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    const CENTER: (f64, f64) = (960.0, 540.0);

    fn estimator() -> GameStateEstimator {
        GameStateEstimator::new(MovementSettings::default(), KeyBindings::default())
    }

    fn input(keys: &[&str]) -> InputSnapshot {
        let mut snap = InputSnapshot::idle(Utc::now(), CENTER);
        snap.tracking_enabled = true;
        snap.active_keys = keys.iter().map(|k| (*k).to_string()).collect();
        snap
    }

    fn displacement(keys: &[&str]) -> f64 {
        let mut est = estimator();
        est.update(&input(keys), 1.0);
        let p = est.state().position;
        p.x.hypot(p.z)
    }

    #[test]
    fn no_direction_keys_keeps_position() {
        let mut est = estimator();
        for keys in [&[][..], &["shift"][..], &["ctrl", "r"][..], &["space"][..]] {
            est.update(&input(keys), 0.5);
        }
        let state = est.state();
        assert!(state.position.x.abs() < f64::EPSILON);
        assert!(state.position.y.abs() < f64::EPSILON);
        assert!(state.position.z.abs() < f64::EPSILON);
        assert!((state.game_time - 2.0).abs() < 1e-12);
    }

    #[test]
    fn forward_moves_along_z_at_base_speed() {
        let mut est = estimator();
        est.update(&input(&["w"]), 0.5);
        let p = est.state().position;
        assert!(p.x.abs() < 1e-12);
        assert!((p.z - 2.4).abs() < 1e-12);
    }

    #[test]
    fn diagonal_is_normalized() {
        assert!((displacement(&["w", "d"]) - 4.8).abs() < 1e-9);
    }

    #[test]
    fn sprint_increases_displacement() {
        for keys in [&["w"][..], &["a"][..], &["w", "d"][..], &["s", "a"][..]] {
            let walk = displacement(keys);
            let mut sprint_keys = keys.to_vec();
            sprint_keys.push("shift");
            let sprint = displacement(&sprint_keys);
            assert!(sprint > walk, "{keys:?}: {sprint} <= {walk}");
        }
    }

    #[test]
    fn movement_follows_yaw() {
        let mut est = estimator();
        // 900 px right of center at 0.1 deg/px turns 90 degrees.
        let mut turn = input(&[]);
        turn.mouse_position = (CENTER.0 + 900.0, CENTER.1);
        est.update(&turn, 0.0);
        assert!((est.state().rotation.yaw - 90.0).abs() < 1e-9);

        est.update(&input(&["w"]), 1.0);
        let p = est.state().position;
        assert!((p.x + 4.8).abs() < 1e-9);
        assert!(p.z.abs() < 1e-9);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut est = estimator();
        let mut down = input(&[]);
        down.mouse_position = (CENTER.0, CENTER.1 + 540.0);
        for _ in 0..50 {
            est.update(&down, 0.016);
            let pitch = est.state().rotation.pitch;
            assert!((-89.0..=89.0).contains(&pitch));
        }
        assert!((est.state().rotation.pitch - 89.0).abs() < f64::EPSILON);

        let mut up = input(&[]);
        up.mouse_position = (CENTER.0, -10_000.0);
        est.update(&up, 0.016);
        assert!((est.state().rotation.pitch + 89.0).abs() < f64::EPSILON);
    }

    #[test]
    fn firing_consumes_one_round_per_tick() {
        let mut est = estimator();
        let mut fire = input(&[]);
        fire.mouse_buttons.left = true;
        for _ in 0..5 {
            est.update(&fire, 0.016);
        }
        let state = est.state();
        assert_eq!(state.ammo.current, 25);
        assert_eq!(state.shots_fired, 5);
        assert!(state.tactical.in_combat);
    }

    #[test]
    fn empty_magazine_stops_firing() {
        let mut est = estimator();
        let mut fire = input(&[]);
        fire.mouse_buttons.left = true;
        for _ in 0..40 {
            est.update(&fire, 0.016);
        }
        let state = est.state();
        assert_eq!(state.ammo.current, 0);
        assert_eq!(state.shots_fired, 30);
        assert!(!state.tactical.in_combat);
    }

    #[test]
    fn reload_respects_capacity_and_reserve() {
        let mut est = estimator();
        let mut fire = input(&[]);
        fire.mouse_buttons.left = true;
        for _ in 0..10 {
            est.update(&fire, 0.016);
        }
        est.update(&input(&["r"]), 0.016);
        let state = est.state();
        assert_eq!(state.ammo.current, 30);
        assert_eq!(state.ammo.reserve, 80);

        // Drain the reserve through repeated empty-and-reload cycles.
        for _ in 0..10 {
            for _ in 0..30 {
                est.update(&fire, 0.016);
            }
            est.update(&input(&["r"]), 0.016);
            let state = est.state();
            assert!(state.ammo.current <= 30);
        }
        let state = est.state();
        assert_eq!(state.ammo.reserve, 0);
        assert_eq!(state.ammo.current, 0);
    }

    #[test]
    fn reload_with_full_magazine_is_noop() {
        let mut est = estimator();
        est.update(&input(&["r"]), 0.016);
        let state = est.state();
        assert_eq!(state.ammo.current, 30);
        assert_eq!(state.ammo.reserve, 90);
    }

    #[test]
    fn tactical_flags_follow_keys() {
        let mut est = estimator();
        est.update(&input(&["w", "shift"]), 0.016);
        assert!(est.state().tactical.sprinting);
        est.update(&input(&["shift"]), 0.016);
        assert!(!est.state().tactical.sprinting);
        est.update(&input(&["ctrl", "2"]), 0.016);
        let state = est.state();
        assert!(state.tactical.crouching);
        assert_eq!(state.weapon, WeaponSlot::Secondary);
    }

    #[test]
    fn updates_are_deterministic() {
        let script = [
            (vec!["w"], (1000.0, 500.0), true),
            (vec!["w", "shift", "a"], (950.0, 560.0), false),
            (vec!["r"], (960.0, 540.0), false),
            (vec!["s", "d"], (800.0, 300.0), true),
        ];
        let run = || {
            let mut est = estimator();
            for (keys, mouse, fire) in &script {
                let mut snap = input(keys);
                snap.mouse_position = *mouse;
                snap.mouse_buttons.left = *fire;
                est.update(&snap, 0.016);
            }
            est.state()
        };
        assert_eq!(run(), run());
    }
}
