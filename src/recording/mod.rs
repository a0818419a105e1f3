// SPDX-License-Identifier: MIT
pub mod buffer;
pub mod export;
pub mod format;
pub mod reader;
pub mod writer;

#[cfg(test)]
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::game::state::GameState;
    use crate::input::snapshot::{AimMetrics, InputSnapshot};
    use crate::recording::format::LogEntry;
    use crate::sampler::perf_stats::PerformanceMetrics;

    pub fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub fn entry_with_keys(index: i64, keys: &[&str]) -> LogEntry {
        let timestamp = base_time() + Duration::milliseconds(index * 16);
        let mut input = InputSnapshot::idle(timestamp, (960.0, 540.0));
        input.tracking_enabled = true;
        input.active_keys = keys.iter().map(|k| (*k).to_string()).collect();
        let mut game_state = GameState::new(30, 90);
        game_state.score = index;
        LogEntry {
            timestamp,
            aim: AimMetrics::from_snapshot(&input, (960.0, 540.0)),
            input,
            game_state,
            performance: PerformanceMetrics {
                sampled_at: Some(timestamp),
                process_cpu_percent: 3.5,
                system_cpu_percent: 20.0,
                memory_mb: 42.0,
                runtime_secs: 1.0,
            },
        }
    }

    pub fn entry(index: i64) -> LogEntry {
        entry_with_keys(index, &[])
    }
}
