// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::hook::{HookError, InputEvent, InputHook, MouseButton};
use super::snapshot::{InputSnapshot, MouseButtons};
use crate::config::InputSettings;

/// How the active hook reports key releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRelease {
    /// Release events arrive from the hook.
    Reported,
    /// Only presses arrive; a key stays held for the window after its last
    /// press or repeat.
    Decay(Duration),
}

struct InputState {
    keys: BTreeMap<String, Instant>,
    mouse_position: (f64, f64),
    buttons: MouseButtons,
    last_mouse_move: Instant,
    release: KeyRelease,
}

/// Input state shared between the hook thread and the sampling loop.
pub struct SharedInput {
    state: Mutex<InputState>,
    track_keyboard: bool,
    track_mouse: bool,
}

impl SharedInput {
    fn new(settings: &InputSettings, rest_position: (f64, f64)) -> Self {
        Self {
            state: Mutex::new(InputState {
                keys: BTreeMap::new(),
                mouse_position: rest_position,
                buttons: MouseButtons::default(),
                last_mouse_move: Instant::now(),
                release: KeyRelease::Decay(Duration::from_millis(settings.key_hold_ms)),
            }),
            track_keyboard: settings.track_keyboard,
            track_mouse: settings.track_mouse,
        }
    }

    pub fn set_release_mode(&self, release: KeyRelease) {
        self.state.lock().release = release;
    }

    pub fn apply(&self, event: InputEvent) {
        self.apply_at(event, Instant::now());
    }

    fn apply_at(&self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::KeyDown(key) if self.track_keyboard => {
                self.state.lock().keys.insert(key, now);
            }
            InputEvent::KeyUp(key) if self.track_keyboard => {
                self.state.lock().keys.remove(&key);
            }
            InputEvent::MouseMove { x, y } if self.track_mouse => {
                let mut state = self.state.lock();
                state.mouse_position = (x, y);
                state.last_mouse_move = now;
            }
            InputEvent::Button { button, pressed } if self.track_mouse => {
                let mut state = self.state.lock();
                match button {
                    MouseButton::Left => state.buttons.left = pressed,
                    MouseButton::Right => state.buttons.right = pressed,
                    MouseButton::Middle => state.buttons.middle = pressed,
                }
            }
            _ => {}
        }
    }

    fn reset(&self, rest_position: (f64, f64)) {
        let mut state = self.state.lock();
        state.keys.clear();
        state.buttons = MouseButtons::default();
        state.mouse_position = rest_position;
    }

    fn read(&self, now: Instant, captured_at: DateTime<Utc>) -> InputSnapshot {
        let mut state = self.state.lock();
        if let KeyRelease::Decay(window) = state.release {
            state
                .keys
                .retain(|_, pressed| now.saturating_duration_since(*pressed) < window);
        }
        InputSnapshot {
            captured_at,
            active_keys: state.keys.keys().cloned().collect(),
            mouse_position: state.mouse_position,
            mouse_buttons: state.buttons,
            tracking_enabled: true,
            secs_since_mouse_move: now
                .saturating_duration_since(state.last_mouse_move)
                .as_secs_f64(),
        }
    }
}

pub struct InputSampler {
    shared: Arc<SharedInput>,
    hook: Option<Box<dyn InputHook>>,
    rest_position: (f64, f64),
    active: bool,
}

impl InputSampler {
    /// `rest_position` is where the mouse is assumed to sit before any
    /// movement is observed, and while tracking is disabled.
    #[must_use]
    pub fn new(
        hook: Option<Box<dyn InputHook>>,
        settings: &InputSettings,
        rest_position: (f64, f64),
    ) -> Self {
        Self {
            shared: Arc::new(SharedInput::new(settings, rest_position)),
            hook,
            rest_position,
            active: false,
        }
    }

    /// Installs the input hook. Calling this while already started is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if no hook is configured or the hook cannot be
    /// installed. The sampler stays usable in tracking-disabled mode.
    pub fn start(&mut self) -> Result<(), HookError> {
        if self.active {
            return Ok(());
        }
        let hook = self
            .hook
            .as_mut()
            .ok_or_else(|| HookError::Unavailable("no input hook configured".into()))?;
        hook.install(Arc::clone(&self.shared))?;
        self.active = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(hook) = self.hook.as_mut() {
            hook.uninstall();
        }
        self.shared.reset(self.rest_position);
        self.active = false;
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn snapshot(&self) -> InputSnapshot {
        self.snapshot_at(Instant::now(), Utc::now())
    }

    fn snapshot_at(&self, now: Instant, captured_at: DateTime<Utc>) -> InputSnapshot {
        if !self.active {
            return InputSnapshot::idle(captured_at, self.rest_position);
        }
        self.shared.read(now, captured_at)
    }
}

impl Drop for InputSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
