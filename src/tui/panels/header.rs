// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::datasource::SessionMetadata;
use crate::tui::app::SessionStats;
use crate::tui::theme::{RECORDING_MARKER, Theme};

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    metadata: &SessionMetadata,
    stats: &SessionStats,
    theme: &Theme,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let version = env!("CARGO_PKG_VERSION");

    let (tracking, tracking_style) = if metadata.tracking_enabled {
        ("input: tracking", theme.status_bar)
    } else {
        ("input: DISABLED", theme.tracking_disabled)
    };

    let lead = format!(" {RECORDING_MARKER} REC ");
    let text = format!(
        " gametrace v{version} | session {} | {} Hz | ticks {} | buffered {} | saved {} | ",
        metadata.session_id, metadata.frequency_hz, stats.ticks, stats.buffered, stats.persisted,
    );
    let tail = " | Esc quits";
    let used = lead.chars().count() + text.chars().count() + tracking.len() + tail.len();
    let pad = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        Span::styled(lead, theme.recording_indicator),
        Span::styled(text, theme.status_bar),
        Span::styled(tracking, tracking_style),
        Span::styled(format!("{tail}{}", " ".repeat(pad)), theme.status_bar),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}
