// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::state::GameState;
use crate::input::snapshot::{AimMetrics, InputSnapshot};
use crate::sampler::perf_stats::PerformanceMetrics;

pub const LOG_FILE_PREFIX: &str = "game_logs_";
pub const ANALYSIS_FILE_PREFIX: &str = "analysis_";
pub const CLI_REPORT_PREFIX: &str = "analysis_cli_";
pub const FILE_SUFFIX: &str = ".json";

/// One tick of the sampling loop. Log files hold a JSON array of these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub input: InputSnapshot,
    pub aim: AimMetrics,
    pub game_state: GameState,
    pub performance: PerformanceMetrics,
}

#[must_use]
pub fn log_file_name(session_id: &str) -> String {
    format!("{LOG_FILE_PREFIX}{session_id}{FILE_SUFFIX}")
}

#[must_use]
pub fn analysis_file_name(session_id: &str) -> String {
    format!("{ANALYSIS_FILE_PREFIX}{session_id}{FILE_SUFFIX}")
}

/// Report name for an on-demand pass over a whole directory. Session ids
/// start with a digit, so these never replace a session's own report.
#[must_use]
pub fn cli_report_file_name(run_id: &str) -> String {
    format!("{CLI_REPORT_PREFIX}{run_id}{FILE_SUFFIX}")
}

/// True for names produced by `log_file_name`.
#[must_use]
pub fn is_log_file_name(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
        .is_some_and(|id| !id.is_empty())
}
