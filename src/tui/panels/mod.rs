// SPDX-License-Identifier: MIT
pub mod cpu_history;
pub mod game_state;
pub mod header;
pub mod input;
pub mod performance;

use super::theme::{BLOCK_CHARS, BLOCK_FULL};

/// Horizontal bar `bar_width` cells wide filled to `percent`, with a partial
/// block for the remainder of the last cell.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn build_bar(percent: f32, bar_width: usize) -> String {
    if bar_width == 0 {
        return String::new();
    }
    let clamped = percent.clamp(0.0, 100.0);
    let per_cell = 100.0 / bar_width as f32;
    let full = ((clamped / per_cell).floor() as usize).min(bar_width);
    let remainder = clamped - full as f32 * per_cell;
    let partial = ((remainder / per_cell) * (BLOCK_CHARS.len() - 1) as f32) as usize;

    let mut bar = String::with_capacity(bar_width * 4);
    for i in 0..bar_width {
        if i < full {
            bar.push(BLOCK_FULL);
        } else if i == full && partial > 0 {
            bar.push(BLOCK_CHARS[partial.min(BLOCK_CHARS.len() - 1)]);
        } else {
            bar.push(' ');
        }
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_widths() {
        assert_eq!(build_bar(0.0, 10).chars().count(), 10);
        assert_eq!(build_bar(100.0, 10), BLOCK_FULL.to_string().repeat(10));
        assert_eq!(build_bar(250.0, 4), BLOCK_FULL.to_string().repeat(4));
        assert_eq!(build_bar(50.0, 4), format!("{BLOCK_FULL}{BLOCK_FULL}  "));
        assert!(build_bar(42.0, 0).is_empty());
    }

    #[test]
    fn bar_has_partial_cell() {
        let bar: Vec<char> = build_bar(15.0, 10).chars().collect();
        assert_eq!(bar[0], BLOCK_FULL);
        assert_eq!(bar[1], BLOCK_CHARS[4]);
        assert_eq!(bar[2], ' ');
    }
}
