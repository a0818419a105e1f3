// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::format::LogEntry;

#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize log entries: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FlushError + '_ {
    move |source| FlushError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Appends `entries` to the JSON array stored at `path` by reading the
/// existing array, extending it and rewriting the whole file. The rewrite goes
/// through a sibling temporary file so a failed write leaves the previous
/// contents intact.
///
/// A file that does not hold a JSON array is moved aside to
/// `<name>.corrupt-<timestamp>` and a fresh array is started.
///
/// # Errors
///
/// Returns an error if the file cannot be read, written or renamed. Nothing
/// is written in that case.
pub fn append_entries(path: &Path, entries: &[LogEntry]) -> Result<usize, FlushError> {
    let mut persisted = read_existing(path)?;
    let before = persisted.len();
    for entry in entries {
        persisted.push(serde_json::to_value(entry)?);
    }

    let tmp = tmp_path(path);
    let file = File::create(&tmp).map_err(io_err(&tmp))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, &persisted)?;
    out.flush().map_err(io_err(&tmp))?;
    drop(out);
    std::fs::rename(&tmp, path).map_err(io_err(path))?;

    Ok(persisted.len() - before)
}

fn read_existing(path: &Path) -> Result<Vec<serde_json::Value>, FlushError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(path)(e)),
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(serde_json::Value::Array(values)) => Ok(values),
        Err(e) if e.is_io() => Err(io_err(path)(e.into())),
        Ok(_) | Err(_) => {
            let aside = corrupt_path(path);
            log::warn!(
                "{} is not a JSON array of entries; moving it to {}",
                path.display(),
                aside.display()
            );
            std::fs::rename(path, &aside).map_err(io_err(path))?;
            Ok(Vec::new())
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d_%H%M%S")));
    path.with_file_name(name)
}
