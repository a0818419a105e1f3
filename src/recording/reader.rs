// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use super::format::{LogEntry, is_log_file_name};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed log file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Entries gathered from every log file in a directory.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub entries: Vec<LogEntry>,
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Reads one log file. The file normally holds a single JSON array; a bare
/// entry object, or several top-level values written back to back, are read
/// as well.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any value in it is not a
/// log entry.
pub fn read_log_file(path: &Path) -> Result<Vec<LogEntry>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for value in serde_json::Deserializer::from_str(&text).into_iter::<serde_json::Value>() {
        match value.map_err(malformed)? {
            serde_json::Value::Array(items) => {
                for item in items {
                    entries.push(serde_json::from_value(item).map_err(malformed)?);
                }
            }
            other => entries.push(serde_json::from_value(other).map_err(malformed)?),
        }
    }
    Ok(entries)
}

/// Loads every `game_logs_*.json` file under `dir` in file-name order.
/// Unreadable or malformed files are skipped with a warning and recorded in
/// `LoadedCorpus::skipped`; a missing directory yields an empty corpus.
#[must_use]
pub fn load_directory(dir: &Path) -> LoadedCorpus {
    let mut corpus = LoadedCorpus::default();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("log directory {} does not exist", dir.display());
            return corpus;
        }
        Err(e) => {
            log::warn!("cannot list log directory {}: {e}", dir.display());
            return corpus;
        }
    };

    let mut paths: Vec<PathBuf> = read_dir
        .flatten()
        .filter(|entry| is_log_file_name(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    for path in paths {
        match read_log_file(&path) {
            Ok(entries) => {
                corpus.files_loaded += 1;
                corpus.entries.extend(entries);
            }
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                corpus.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "loaded {} entries from {} files ({} skipped)",
        corpus.entries.len(),
        corpus.files_loaded,
        corpus.skipped.len()
    );
    corpus
}
