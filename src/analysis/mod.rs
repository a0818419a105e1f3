// SPDX-License-Identifier: MIT
pub mod features;
pub mod recommend;
pub mod report;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::KeyBindings;
use crate::recording::reader::{LoadedCorpus, load_directory};

use self::features::{EntryFeatures, MovementStyle, Positioning, extract_features};
use self::recommend::generate_recommendations;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatSummary {
    pub accuracy: f64,
    pub total_shots: u64,
    pub total_hits: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TacticalSummary {
    pub aggression_level: f64,
    pub preferred_positioning: Positioning,
}

/// Aggregate over a whole log corpus, recomputed from scratch on every pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub movement_style: MovementStyle,
    pub combat_effectiveness: CombatSummary,
    /// Mean score change between consecutive entries.
    pub resource_efficiency: f64,
    pub tactical_profile: TacticalSummary,
    pub entries_analyzed: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
}

/// Result of one load + analyze + recommend pass over a log directory.
#[derive(Debug)]
pub struct PassOutcome {
    pub result: Option<AnalysisResult>,
    pub recommendations: Vec<&'static str>,
}

/// Loads every log file in `dir` and analyzes the combined entries. Never
/// fails: unreadable files are skipped and an empty corpus yields no result.
#[must_use]
pub fn run_pass(dir: &Path, bindings: &KeyBindings) -> PassOutcome {
    let corpus = load_directory(dir);
    let result = analyze(&corpus, bindings);
    let recommendations = generate_recommendations(result.as_ref());
    PassOutcome {
        result,
        recommendations,
    }
}

/// Aggregates the corpus. Returns `None` when there is nothing to analyze.
#[must_use]
pub fn analyze(corpus: &LoadedCorpus, bindings: &KeyBindings) -> Option<AnalysisResult> {
    if corpus.entries.is_empty() {
        log::warn!("no gameplay data available for analysis");
        return None;
    }

    for skipped in &corpus.skipped {
        log::debug!("not analyzed: {} ({})", skipped.path.display(), skipped.reason);
    }
    let features = extract_features(&corpus.entries, bindings);

    let movement_style = mode(features.iter().map(|f| f.movement))?;
    let preferred_positioning = mode(features.iter().map(|f| f.tactics.positioning))?;

    let result = AnalysisResult {
        movement_style,
        combat_effectiveness: CombatSummary {
            accuracy: mean(features.iter().map(|f| f.accuracy)),
            total_shots: counter_total(features.iter().map(|f| f.shots_fired)),
            total_hits: counter_total(features.iter().map(|f| f.hits)),
        },
        resource_efficiency: score_trend(&features),
        tactical_profile: TacticalSummary {
            aggression_level: mean(features.iter().map(|f| f.tactics.aggression_level)),
            preferred_positioning,
        },
        entries_analyzed: features.len(),
        files_loaded: corpus.files_loaded,
        files_skipped: corpus.skipped.len(),
    };

    log::info!(
        "analysis: movement={} accuracy={:.2} aggression={:.2} over {} entries",
        result.movement_style,
        result.combat_effectiveness.accuracy,
        result.tactical_profile.aggression_level,
        result.entries_analyzed
    );
    Some(result)
}

/// Most frequent value. Ties go to the smallest value.
fn mode<T: Ord + Copy>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0usize) += 1;
    }
    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Total growth of a cumulative counter across consecutive entries. A value
/// lower than its predecessor marks a new session and counts from zero.
fn counter_total(values: impl Iterator<Item = u64>) -> u64 {
    let mut total = 0u64;
    let mut prev = 0u64;
    for value in values {
        total = total.saturating_add(if value >= prev { value - prev } else { value });
        prev = value;
    }
    total
}

#[allow(clippy::cast_precision_loss)]
fn score_trend(features: &[EntryFeatures]) -> f64 {
    mean(
        features
            .windows(2)
            .map(|pair| pair[1].score as f64 - pair[0].score as f64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::fixtures::{entry, entry_with_keys};

    fn corpus(entries: Vec<crate::recording::format::LogEntry>) -> LoadedCorpus {
        LoadedCorpus {
            entries,
            files_loaded: 1,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn empty_corpus_is_insufficient_data() {
        assert!(analyze(&LoadedCorpus::default(), &KeyBindings::default()).is_none());
    }

    #[test]
    fn aggregates_over_entries() {
        let mut entries = vec![
            entry_with_keys(0, &["w"]),
            entry_with_keys(1, &["w", "shift"]),
            entry_with_keys(2, &["w", "shift"]),
            entry_with_keys(3, &[]),
        ];
        entries[1].game_state.tactical.sprinting = true;
        entries[2].game_state.tactical.sprinting = true;
        entries[2].game_state.tactical.in_combat = true;
        entries[2].game_state.shots_fired = 4;
        entries[2].game_state.hits = 1;
        entries[3].game_state.shots_fired = 6;
        entries[3].game_state.hits = 3;
        // Scores 0, 1, 2, 3 by default: drop the last one.
        entries[3].game_state.score = -1;

        let result = analyze(&corpus(entries), &KeyBindings::default()).unwrap();
        assert_eq!(result.movement_style, MovementStyle::Rushing);
        assert_eq!(result.combat_effectiveness.total_shots, 6);
        assert_eq!(result.combat_effectiveness.total_hits, 3);
        // Accuracy per entry: 0, 0, 0.25, 0.5.
        assert!((result.combat_effectiveness.accuracy - 0.1875).abs() < 1e-9);
        // Diffs 1, 1, -3.
        assert!((result.resource_efficiency - (-1.0 / 3.0)).abs() < 1e-9);
        // Aggression per entry: 0, 0.8, 0.75, 0.
        assert!((result.tactical_profile.aggression_level - 0.3875).abs() < 1e-9);
        assert_eq!(
            result.tactical_profile.preferred_positioning,
            Positioning::Aggressive
        );
        assert_eq!(result.entries_analyzed, 4);
        assert_eq!(result.files_loaded, 1);
    }

    #[test]
    fn single_entry_has_flat_trend() {
        let result = analyze(&corpus(vec![entry(5)]), &KeyBindings::default()).unwrap();
        assert!(result.resource_efficiency.abs() < f64::EPSILON);
        assert_eq!(result.movement_style, MovementStyle::Stationary);
    }

    #[test]
    fn pass_over_directory() {
        use crate::recording::format::log_file_name;
        use crate::recording::writer::append_entries;

        let dir = tempfile::tempdir().unwrap();
        let empty = run_pass(dir.path(), &KeyBindings::default());
        assert!(empty.result.is_none());
        assert_eq!(empty.recommendations, vec![recommend::INSUFFICIENT_DATA]);

        append_entries(&dir.path().join(log_file_name("a")), &[entry(0), entry(1)]).unwrap();
        append_entries(&dir.path().join(log_file_name("b")), &[entry(2)]).unwrap();
        std::fs::write(dir.path().join(log_file_name("c")), "not json").unwrap();

        let outcome = run_pass(dir.path(), &KeyBindings::default());
        let result = outcome.result.unwrap();
        assert_eq!(result.entries_analyzed, 3);
        assert_eq!(result.files_loaded, 2);
        assert_eq!(result.files_skipped, 1);
        // Idle entries: stationary, no shots, no aggression.
        assert!(outcome.recommendations.contains(&recommend::MOVE_MORE));
    }

    #[test]
    fn mode_breaks_ties_toward_smallest() {
        let values = [MovementStyle::Stationary, MovementStyle::Rushing];
        assert_eq!(mode(values.into_iter()), Some(MovementStyle::Rushing));
        assert_eq!(mode(std::iter::empty::<MovementStyle>()), None);
    }

    #[test]
    fn counters_restart_with_new_sessions() {
        assert_eq!(counter_total([0, 2, 5, 1, 4].into_iter()), 9);
        assert_eq!(counter_total(std::iter::empty()), 0);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let mut entries = vec![entry(0), entry(1), entry(2)];
        entries[0].game_state.score = i64::MIN;
        entries[1].game_state.score = i64::MAX;
        entries[0].game_state.shots_fired = u64::MAX;
        entries[1].game_state.shots_fired = 0;
        entries[2].game_state.shots_fired = u64::MAX;

        let result = analyze(&corpus(entries), &KeyBindings::default()).unwrap();
        assert_eq!(result.combat_effectiveness.total_shots, u64::MAX);
        assert!(result.resource_efficiency.is_finite());
    }
}
