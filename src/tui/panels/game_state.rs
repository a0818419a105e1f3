// SPDX-License-Identifier: MIT
use num_format::{Locale, ToFormattedString};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::build_bar;
use crate::game::state::{GameState, WeaponSlot};
use crate::tui::theme::Theme;

fn flag<'a>(label: &'a str, on: bool, theme: &Theme) -> Span<'a> {
    Span::styled(label, if on { theme.flag_on } else { theme.flag_off })
}

#[allow(clippy::cast_precision_loss)]
fn health_line(state: &GameState, theme: &Theme, bar_width: usize) -> Line<'static> {
    let health = state.health.min(100) as f32;
    // Low health reads as high load.
    let style = theme.load_style(100.0 - health);
    Line::from(vec![
        Span::raw("Health "),
        Span::styled(format!("[{}]", build_bar(health, bar_width)), style),
        Span::raw(format!(" {}  armor {}", state.health, state.armor)),
    ])
}

pub fn render(frame: &mut ratatui::Frame, area: Rect, state: &GameState, theme: &Theme) {
    if area.height < 2 || area.width < 10 {
        return;
    }

    let bar_width = (area.width.saturating_sub(24) as usize).clamp(4, 32);
    let weapon = match state.weapon {
        WeaponSlot::Primary => "primary",
        WeaponSlot::Secondary => "secondary",
    };
    let tactical = &state.tactical;

    let lines = vec![
        health_line(state, theme, bar_width),
        Line::from(format!(
            "Position: x {:.2}  y {:.2}  z {:.2}",
            state.position.x, state.position.y, state.position.z
        )),
        Line::from(format!(
            "Rotation: pitch {:.1}  yaw {:.1}  roll {:.1}",
            state.rotation.pitch, state.rotation.yaw, state.rotation.roll
        )),
        Line::from(format!(
            "Weapon: {weapon}  ammo {}/{}",
            state.ammo.current, state.ammo.reserve
        )),
        Line::from(format!(
            "Shots: {}  hits {}  accuracy {:.1}%",
            state.shots_fired.to_formatted_string(&Locale::en),
            state.hits.to_formatted_string(&Locale::en),
            state.accuracy() * 100.0
        )),
        Line::from(format!(
            "Score: {}  K/D {}/{}  game time {:.1}s",
            state.score.to_formatted_string(&Locale::en),
            state.kills,
            state.deaths,
            state.game_time
        )),
        Line::from(vec![
            flag("SPRINT", tactical.sprinting, theme),
            Span::raw(" "),
            flag("CROUCH", tactical.crouching, theme),
            Span::raw(" "),
            flag("COVER", tactical.in_cover, theme),
            Span::raw(" "),
            flag("COMBAT", tactical.in_combat, theme),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}
