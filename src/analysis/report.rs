// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AnalysisResult;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Contents of an `analysis_<session>.json` file. `analysis` is null when
/// there was not enough data.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timestamp: DateTime<Utc>,
    pub analysis: Option<AnalysisResult>,
    pub recommendations: Vec<String>,
}

/// Writes the report to `path`, replacing any earlier pass of the same
/// session.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_report(
    path: &Path,
    timestamp: DateTime<Utc>,
    analysis: Option<&AnalysisResult>,
    recommendations: &[&str],
) -> Result<(), ReportError> {
    let report = AnalysisReport {
        timestamp,
        analysis: analysis.cloned(),
        recommendations: recommendations.iter().map(|r| (*r).to_string()).collect(),
    };

    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &report)?;
    out.flush().map_err(io_err)?;

    log::info!("analysis report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::analysis::recommend::{INSUFFICIENT_DATA, generate_recommendations};
    use crate::config::KeyBindings;
    use crate::recording::fixtures::{base_time, entry};
    use crate::recording::reader::LoadedCorpus;

    #[test]
    fn report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_s1.json");
        let corpus = LoadedCorpus {
            entries: vec![entry(0), entry(1)],
            files_loaded: 1,
            skipped: Vec::new(),
        };
        let result = analyze(&corpus, &KeyBindings::default());
        let recs = generate_recommendations(result.as_ref());

        write_report(&path, base_time(), result.as_ref(), &recs).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let report: AnalysisReport = serde_json::from_str(&text).unwrap();
        assert_eq!(report.timestamp, base_time());
        assert_eq!(report.analysis, result);
        assert_eq!(report.recommendations.len(), recs.len());
    }

    #[test]
    fn insufficient_data_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_s1.json");
        let recs = generate_recommendations(None);

        write_report(&path, base_time(), None, &recs).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["analysis"].is_null());
        assert_eq!(value["recommendations"][0], INSUFFICIENT_DATA);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("analysis_s1.json");
        assert!(matches!(
            write_report(&path, base_time(), None, &[]),
            Err(ReportError::Io { .. })
        ));
    }
}
