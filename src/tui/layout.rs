// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKind {
    Input,
    GameState,
    Performance,
    CpuHistory,
}

pub struct PanelState {
    pub kind: PanelKind,
    pub name: &'static str,
    pub min_height: u16,
}

/// Splits `area` into two columns: input and game state on the left,
/// performance panels on the right. Panels stack top to bottom in the order
/// given.
#[must_use]
pub fn build_layout(panels: &[PanelState], area: Rect) -> Vec<(PanelKind, Rect)> {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let (left, right): (Vec<&PanelState>, Vec<&PanelState>) = panels
        .iter()
        .partition(|p| matches!(p.kind, PanelKind::Input | PanelKind::GameState));

    let mut out = Vec::with_capacity(panels.len());
    for (column, stack) in [(columns[0], left), (columns[1], right)] {
        let constraints: Vec<Constraint> =
            stack.iter().map(|p| Constraint::Min(p.min_height)).collect();
        let areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(column);
        out.extend(stack.iter().map(|p| p.kind).zip(areas.iter().copied()));
    }
    out
}
