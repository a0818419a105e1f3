// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::config::KeyBindings;
use crate::recording::format::LogEntry;
use crate::tui::theme::Theme;

fn key_span(label: &str, held: bool, theme: &Theme) -> Span<'static> {
    let style = if held { theme.key_held } else { theme.key_idle };
    Span::styled(format!(" {label} "), style)
}

fn button(pressed: bool) -> &'static str {
    if pressed { "down" } else { "up" }
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    entry: &LogEntry,
    bindings: &KeyBindings,
    theme: &Theme,
) {
    if area.height < 2 || area.width < 10 {
        return;
    }

    let input = &entry.input;
    if !input.tracking_enabled {
        frame.render_widget(
            Paragraph::new("Input tracking disabled: logging idle input"),
            area,
        );
        return;
    }

    let held = |key: &str| input.is_pressed(key);
    let movement = Line::from(vec![
        key_span(&bindings.forward, held(&bindings.forward), theme),
        key_span(&bindings.left, held(&bindings.left), theme),
        key_span(&bindings.backward, held(&bindings.backward), theme),
        key_span(&bindings.right, held(&bindings.right), theme),
        Span::raw("  "),
        key_span(&bindings.sprint, held(&bindings.sprint), theme),
        key_span(&bindings.crouch, held(&bindings.crouch), theme),
        key_span(&bindings.jump, held(&bindings.jump), theme),
        key_span(&bindings.reload, held(&bindings.reload), theme),
    ]);

    let keys = if input.active_keys.is_empty() {
        "-".to_string()
    } else {
        input
            .active_keys
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };

    let (x, y) = input.mouse_position;
    let aim = &entry.aim;
    let lines = vec![
        movement,
        Line::from(format!("Held: {keys}")),
        Line::from(format!(
            "Mouse: ({x:.0}, {y:.0})  idle {:.1}s",
            input.secs_since_mouse_move
        )),
        Line::from(format!(
            "Buttons: left {}  right {}  middle {}",
            button(input.mouse_buttons.left),
            button(input.mouse_buttons.right),
            button(input.mouse_buttons.middle),
        )),
        Line::from(format!(
            "Aim: {:.1} px from center at {:.1}\u{00B0}{}",
            aim.distance_from_center,
            aim.angle_degrees,
            if aim.is_ads { "  [ADS]" } else { "" }
        )),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}
