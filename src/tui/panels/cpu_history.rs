// SPDX-License-Identifier: MIT
use std::collections::VecDeque;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::tui::theme::{BLOCK_CHARS, BLOCK_FULL, Theme};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuSample {
    pub process_percent: f32,
    pub system_percent: f32,
    pub over_limit: bool,
}

struct CpuHistoryWidget<'a> {
    samples: &'a VecDeque<CpuSample>,
    theme: &'a Theme,
}

/// Full cells and the partial-cell glyph index for `percent` drawn over
/// `rows` cells.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn column_fill(percent: f32, rows: usize) -> (usize, usize) {
    let scaled = percent.clamp(0.0, 100.0) / 100.0 * rows as f32;
    let full = (scaled.floor() as usize).min(rows);
    let partial = ((scaled - full as f32) * (BLOCK_CHARS.len() - 1) as f32) as usize;
    (full, partial.min(BLOCK_CHARS.len() - 1))
}

impl Widget for CpuHistoryWidget<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 || area.width < 2 {
            return;
        }

        let legend_height: u16 = 1;
        let chart_height = area.height.saturating_sub(legend_height);
        if chart_height == 0 {
            return;
        }

        let num_columns = (area.width as usize).min(self.samples.len());

        for j in 0..num_columns {
            let sample = &self.samples[self.samples.len() - 1 - j];
            let col_x = area.x + area.width - 1 - j as u16;

            let load = sample.process_percent;
            let bar_style = self.theme.load_style(load);
            let (full, partial) = column_fill(load, chart_height as usize);

            for i in 0..chart_height as usize {
                let cell_y = area.y + chart_height - 1 - i as u16;

                let (ch, style) = if i == 0 && sample.over_limit {
                    (BLOCK_FULL, self.theme.load_high)
                } else if i < full {
                    (BLOCK_FULL, bar_style)
                } else if i == full {
                    (BLOCK_CHARS[partial], bar_style)
                } else {
                    (' ', bar_style)
                };

                if ch != ' ' {
                    buf[(col_x, cell_y)].set_char(ch).set_style(style);
                }
            }
        }

        let legend_y = area.y + chart_height;
        let legend_area = Rect::new(area.x, legend_y, area.width, 1);
        let system = self
            .samples
            .back()
            .map_or(0.0, |s| s.system_percent);
        let legend = Line::from(vec![
            Span::styled("\u{2586} process CPU %", self.theme.load_normal),
            Span::raw("  "),
            Span::styled("\u{25A0} over limit", self.theme.load_high),
            Span::raw(format!("  system {system:.1}%")),
        ]);
        Paragraph::new(legend).render(legend_area, buf);
    }
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    samples: &VecDeque<CpuSample>,
    theme: &Theme,
) {
    if area.height < 2 || area.width < 2 {
        return;
    }

    if samples.is_empty() {
        frame.render_widget(Paragraph::new("Waiting for data..."), area);
        return;
    }

    let widget = CpuHistoryWidget { samples, theme };
    frame.render_widget(widget, area);
}
