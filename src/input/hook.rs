// SPDX-License-Identifier: MIT
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, KeyboardEnhancementFlags, ModifierKeyCode, MouseEvent, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};

use super::sampler::{KeyRelease, SharedInput};
use crate::config::{InputSettings, MovementSettings};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(20);

pub type InputSink = Arc<SharedInput>;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("input capture unavailable: {0}")]
    Unavailable(String),
    #[error("failed to configure terminal for input capture: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Hook callbacks normalized to a single shape.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    MouseMove { x: f64, y: f64 },
    Button { button: MouseButton, pressed: bool },
}

pub trait InputHook: Send {
    /// Starts delivering events into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the listener.
    fn install(&mut self, sink: InputSink) -> Result<(), HookError>;
    fn uninstall(&mut self);
}

/// Captures keyboard and mouse input from the controlling terminal.
///
/// Raw mode swallows SIGINT, so Ctrl+C (and optionally Esc) set the
/// `interrupt` flag instead.
pub struct TerminalHook {
    track_mouse: bool,
    screen: (f64, f64),
    interrupt: Arc<AtomicBool>,
    quit_on_escape: bool,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    enhanced: bool,
}

impl TerminalHook {
    #[must_use]
    pub fn new(
        input: &InputSettings,
        movement: &MovementSettings,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            track_mouse: input.track_mouse,
            screen: (
                f64::from(movement.screen_width),
                f64::from(movement.screen_height),
            ),
            interrupt,
            quit_on_escape: false,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
            enhanced: false,
        }
    }

    #[must_use]
    pub fn quit_on_escape(mut self, enabled: bool) -> Self {
        self.quit_on_escape = enabled;
        self
    }
}

impl InputHook for TerminalHook {
    fn install(&mut self, sink: InputSink) -> Result<(), HookError> {
        if self.handle.is_some() {
            return Ok(());
        }
        if !io::stdin().is_terminal() {
            return Err(HookError::Unavailable("stdin is not a terminal".into()));
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if self.track_mouse {
            crossterm::execute!(stdout, EnableMouseCapture)?;
        }
        self.enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced {
            crossterm::execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
            sink.set_release_mode(KeyRelease::Reported);
        } else {
            log::info!("terminal does not report key releases; using hold-decay window");
        }

        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        let mut translator = Translator {
            cells: (cols.max(1), rows.max(1)),
            screen: self.screen,
        };
        let stop = Arc::clone(&self.stop);
        let interrupt = Arc::clone(&self.interrupt);
        let quit_on_escape = self.quit_on_escape;
        stop.store(false, Ordering::Relaxed);

        let handle = thread::Builder::new()
            .name("input-hook".into())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match event::poll(EVENT_POLL_TIMEOUT) {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(e) => {
                            log::warn!("input hook stopped polling: {e}");
                            break;
                        }
                    }
                    let Ok(ev) = event::read() else { continue };
                    if is_quit(&ev, quit_on_escape) {
                        interrupt.store(true, Ordering::Relaxed);
                        continue;
                    }
                    for normalized in translator.translate(&ev) {
                        sink.apply(normalized);
                    }
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn uninstall(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = handle.join();

        let mut stdout = io::stdout();
        if self.enhanced {
            let _ = crossterm::execute!(stdout, PopKeyboardEnhancementFlags);
        }
        if self.track_mouse {
            let _ = crossterm::execute!(stdout, DisableMouseCapture);
        }
        let _ = stdout.flush();
        let _ = disable_raw_mode();
    }
}

impl Drop for TerminalHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn is_quit(ev: &Event, quit_on_escape: bool) -> bool {
    let Event::Key(key) = ev else {
        return false;
    };
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Esc => quit_on_escape,
        _ => false,
    }
}

/// Converts crossterm events into `InputEvent`s, scaling terminal cells onto
/// the configured screen resolution.
struct Translator {
    cells: (u16, u16),
    screen: (f64, f64),
}

impl Translator {
    fn translate(&mut self, ev: &Event) -> Vec<InputEvent> {
        match ev {
            Event::Key(key) => translate_key(key),
            Event::Mouse(mouse) => self.translate_mouse(mouse).into_iter().collect(),
            Event::Resize(cols, rows) => {
                self.cells = ((*cols).max(1), (*rows).max(1));
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn translate_mouse(&self, mouse: &MouseEvent) -> Option<InputEvent> {
        let button = |b: event::MouseButton| match b {
            event::MouseButton::Left => MouseButton::Left,
            event::MouseButton::Right => MouseButton::Right,
            event::MouseButton::Middle => MouseButton::Middle,
        };
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                let (x, y) = self.scale(mouse.column, mouse.row);
                Some(InputEvent::MouseMove { x, y })
            }
            MouseEventKind::Down(b) => Some(InputEvent::Button {
                button: button(b),
                pressed: true,
            }),
            MouseEventKind::Up(b) => Some(InputEvent::Button {
                button: button(b),
                pressed: false,
            }),
            _ => None,
        }
    }

    fn scale(&self, column: u16, row: u16) -> (f64, f64) {
        let x = (f64::from(column) + 0.5) / f64::from(self.cells.0) * self.screen.0;
        let y = (f64::from(row) + 0.5) / f64::from(self.cells.1) * self.screen.1;
        (x, y)
    }
}

fn translate_key(key: &KeyEvent) -> Vec<InputEvent> {
    let mut out = Vec::new();
    let pressed = key.kind != KeyEventKind::Release;

    if let Some(name) = key_name(key.code) {
        out.push(if pressed {
            InputEvent::KeyDown(name)
        } else {
            InputEvent::KeyUp(name)
        });
    }

    if pressed {
        for (flag, name) in [
            (KeyModifiers::SHIFT, "shift"),
            (KeyModifiers::CONTROL, "ctrl"),
            (KeyModifiers::ALT, "alt"),
        ] {
            if key.modifiers.contains(flag) {
                out.push(InputEvent::KeyDown(name.to_string()));
            }
        }
        if let KeyCode::Char(c) = key.code
            && c.is_ascii_uppercase()
            && !key.modifiers.contains(KeyModifiers::SHIFT)
        {
            out.push(InputEvent::KeyDown("shift".to_string()));
        }
    }

    out
}

/// Maps a terminal key code to the identifier used in key bindings.
#[must_use]
pub fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_ascii_lowercase().to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab | KeyCode::BackTab => "tab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        KeyCode::Modifier(m) => match m {
            ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "shift".to_string(),
            ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "ctrl".to_string(),
            ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "alt".to_string(),
            _ => return None,
        },
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn key_names_are_normalized() {
        assert_eq!(key_name(KeyCode::Char('W')), Some("w".into()));
        assert_eq!(key_name(KeyCode::Char(' ')), Some("space".into()));
        assert_eq!(key_name(KeyCode::F(5)), Some("f5".into()));
        assert_eq!(
            key_name(KeyCode::Modifier(ModifierKeyCode::LeftControl)),
            Some("ctrl".into())
        );
        assert_eq!(key_name(KeyCode::Null), None);
    }

    #[test]
    fn shifted_char_reports_shift_held() {
        let events = translate_key(&key(
            KeyCode::Char('W'),
            KeyModifiers::SHIFT,
            KeyEventKind::Press,
        ));
        assert_eq!(
            events,
            vec![
                InputEvent::KeyDown("w".into()),
                InputEvent::KeyDown("shift".into())
            ]
        );
    }

    #[test]
    fn release_does_not_touch_modifiers() {
        let events = translate_key(&key(
            KeyCode::Char('w'),
            KeyModifiers::SHIFT,
            KeyEventKind::Release,
        ));
        assert_eq!(events, vec![InputEvent::KeyUp("w".into())]);
    }

    #[test]
    fn mouse_cells_scale_to_screen() {
        let translator = Translator {
            cells: (100, 50),
            screen: (1920.0, 1080.0),
        };
        let (x, y) = translator.scale(49, 24);
        assert!((x - 950.4).abs() < 1e-9);
        assert!((y - 529.2).abs() < 1e-9);
    }

    #[test]
    fn ctrl_c_is_quit() {
        let ev = Event::Key(key(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
            KeyEventKind::Press,
        ));
        assert!(is_quit(&ev, false));
        let esc = Event::Key(key(KeyCode::Esc, KeyModifiers::NONE, KeyEventKind::Press));
        assert!(!is_quit(&esc, false));
        assert!(is_quit(&esc, true));
    }
}
