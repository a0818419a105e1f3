// SPDX-License-Identifier: MIT
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::layout::{PanelKind, PanelState, build_layout};
use super::panels::cpu_history::CpuSample;
use super::panels::{cpu_history, game_state, header, input, performance};
use super::theme::Theme;
use crate::config::Settings;
use crate::datasource::SessionMetadata;
use crate::recording::format::LogEntry;

const CPU_HISTORY_CAPACITY: usize = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub buffered: usize,
    pub persisted: usize,
}

pub struct App {
    pub panels: Vec<PanelState>,
    pub latest: Option<LogEntry>,
    pub cpu_history: VecDeque<CpuSample>,
    pub metadata: SessionMetadata,
    pub stats: SessionStats,
    pub theme: Theme,
    settings: Settings,
    last_sampled_at: Option<DateTime<Utc>>,
}

impl App {
    #[must_use]
    pub fn new(metadata: SessionMetadata, settings: Settings) -> Self {
        let panels = vec![
            PanelState {
                kind: PanelKind::Input,
                name: "Input",
                min_height: 7,
            },
            PanelState {
                kind: PanelKind::GameState,
                name: "Game state",
                min_height: 9,
            },
            PanelState {
                kind: PanelKind::Performance,
                name: "Performance",
                min_height: 6,
            },
            PanelState {
                kind: PanelKind::CpuHistory,
                name: "CPU history",
                min_height: 8,
            },
        ];

        Self {
            panels,
            latest: None,
            cpu_history: VecDeque::with_capacity(CPU_HISTORY_CAPACITY),
            metadata,
            stats: SessionStats::default(),
            theme: Theme::default(),
            settings,
            last_sampled_at: None,
        }
    }

    /// Takes the newest entry. The CPU history only grows when the entry
    /// carries a performance sample not seen before.
    pub fn update(&mut self, entry: &LogEntry, stats: SessionStats) {
        self.stats = stats;
        self.metadata.tracking_enabled = entry.input.tracking_enabled;

        let perf = &entry.performance;
        if perf.sampled_at.is_some() && perf.sampled_at != self.last_sampled_at {
            self.last_sampled_at = perf.sampled_at;
            if self.cpu_history.len() >= CPU_HISTORY_CAPACITY {
                self.cpu_history.pop_front();
            }
            self.cpu_history.push_back(CpuSample {
                process_percent: perf.process_cpu_percent,
                system_percent: perf.system_cpu_percent,
                over_limit: perf.process_cpu_percent > self.settings.performance.max_cpu_percent,
            });
        }

        self.latest = Some(entry.clone());
    }

    pub fn render(&self, frame: &mut ratatui::Frame) {
        let outer = frame.area();
        if outer.height < 2 || outer.width < 5 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(outer);

        header::render(frame, vertical[0], &self.metadata, &self.stats, &self.theme);

        for (kind, area) in build_layout(&self.panels, vertical[1]) {
            let name = self
                .panels
                .iter()
                .find(|p| p.kind == kind)
                .map_or("", |p| p.name);

            let block = Block::default()
                .title(format!(" {name} "))
                .borders(Borders::ALL)
                .border_style(self.theme.border)
                .title_style(self.theme.title);
            let inner = block.inner(area);
            frame.render_widget(block, area);

            if inner.width < 2 || inner.height < 1 {
                continue;
            }

            match (kind, &self.latest) {
                (PanelKind::Input, Some(entry)) => {
                    input::render(frame, inner, entry, &self.settings.keybinds, &self.theme);
                }
                (PanelKind::GameState, Some(entry)) => {
                    game_state::render(frame, inner, &entry.game_state, &self.theme);
                }
                (PanelKind::Performance, Some(entry)) => {
                    performance::render(
                        frame,
                        inner,
                        &entry.performance,
                        self.settings.performance.max_memory_mb,
                        &self.theme,
                    );
                }
                (PanelKind::CpuHistory, _) => {
                    cpu_history::render(frame, inner, &self.cpu_history, &self.theme);
                }
                _ => {
                    frame.render_widget(Paragraph::new("Waiting for data..."), inner);
                }
            }
        }
    }
}
