// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::build_bar;
use crate::sampler::perf_stats::PerformanceMetrics;
use crate::tui::theme::Theme;

fn format_megabytes(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.2} GB", mb / 1024.0)
    } else {
        format!("{mb:.1} MB")
    }
}

fn format_runtime(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

fn cpu_line(label: &str, percent: f32, theme: &Theme, bar_width: usize) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{label:<8}")),
        Span::styled(
            format!("[{}]", build_bar(percent, bar_width)),
            theme.load_style(percent),
        ),
        Span::raw(format!(" {percent:.1}%")),
    ])
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    metrics: &PerformanceMetrics,
    max_memory_mb: f64,
    theme: &Theme,
) {
    if area.height < 2 || area.width < 10 {
        return;
    }

    if metrics.sampled_at.is_none() {
        frame.render_widget(Paragraph::new("Waiting for performance data..."), area);
        return;
    }

    let bar_width = (area.width.saturating_sub(20) as usize).clamp(4, 40);
    #[allow(clippy::cast_possible_truncation)]
    let memory_percent = if max_memory_mb > 0.0 {
        (metrics.memory_mb / max_memory_mb * 100.0) as f32
    } else {
        0.0
    };

    let lines = vec![
        cpu_line("Process", metrics.process_cpu_percent, theme, bar_width),
        cpu_line("System", metrics.system_cpu_percent, theme, bar_width),
        Line::from(vec![
            Span::raw(format!("{:<8}", "Memory")),
            Span::styled(
                format!("[{}]", build_bar(memory_percent, bar_width)),
                theme.load_style(memory_percent),
            ),
            Span::raw(format!(
                " {} of {}",
                format_megabytes(metrics.memory_mb),
                format_megabytes(max_memory_mb)
            )),
        ]),
        Line::from(format!("Runtime: {}", format_runtime(metrics.runtime_secs))),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megabyte_units() {
        assert_eq!(format_megabytes(0.0), "0.0 MB");
        assert_eq!(format_megabytes(42.24), "42.2 MB");
        assert_eq!(format_megabytes(2048.0), "2.00 GB");
    }

    #[test]
    fn runtime_clock() {
        assert_eq!(format_runtime(0.4), "00:00:00");
        assert_eq!(format_runtime(3725.0), "01:02:05");
        assert_eq!(format_runtime(-3.0), "00:00:00");
    }
}
