// SPDX-License-Identifier: MIT
use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub load_normal: Style,
    pub load_medium: Style,
    pub load_high: Style,
    pub key_held: Style,
    pub key_idle: Style,
    pub flag_on: Style,
    pub flag_off: Style,
    pub border: Style,
    pub title: Style,
    pub status_bar: Style,
    pub recording_indicator: Style,
    pub tracking_disabled: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            load_normal: Style::default().fg(Color::Green),
            load_medium: Style::default().fg(Color::Yellow),
            load_high: Style::default().fg(Color::Red),
            key_held: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            key_idle: Style::default().fg(Color::DarkGray),
            flag_on: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            flag_off: Style::default().fg(Color::DarkGray),
            border: Style::default().fg(Color::White),
            title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            status_bar: Style::default().fg(Color::Black).bg(Color::White),
            recording_indicator: Style::default()
                .fg(Color::Red)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
            tracking_disabled: Style::default().fg(Color::Yellow).bg(Color::White),
        }
    }
}

impl Theme {
    /// Green below 50%, yellow below 75%, red above.
    #[must_use]
    pub fn load_style(&self, percent: f32) -> Style {
        if percent >= 75.0 {
            self.load_high
        } else if percent >= 50.0 {
            self.load_medium
        } else {
            self.load_normal
        }
    }
}

pub const BLOCK_CHARS: [char; 10] = [
    ' ', '\u{2581}', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}',
    '\u{2587}', '\u{2588}',
];
pub const BLOCK_FULL: char = '\u{2588}';
pub const RECORDING_MARKER: char = '\u{25CF}';
