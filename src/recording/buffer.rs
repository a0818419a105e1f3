// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::format::LogEntry;
use super::writer::{FlushError, append_entries};

const WORKER_WAKE_INTERVAL: Duration = Duration::from_millis(100);
const FLUSH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// In-memory entries waiting to be persisted to a single JSON log file.
///
/// The entry lock is only held to push or to swap the vector out; file I/O
/// happens outside it. A failed flush puts the entries back in front of
/// anything appended meanwhile, so order is preserved and nothing is lost.
/// Background retries after a failure wait `FLUSH_RETRY_DELAY`.
pub struct LogBuffer {
    entries: Mutex<Vec<LogEntry>>,
    threshold_hit: Condvar,
    // Serializes flushes from the worker and the final shutdown flush.
    flush_lock: Mutex<()>,
    last_flush: Mutex<Instant>,
    retry_at: Mutex<Option<Instant>>,
    path: PathBuf,
    threshold: usize,
    interval: Duration,
    persisted: AtomicUsize,
    failures: AtomicU64,
}

impl LogBuffer {
    #[must_use]
    pub fn new(path: PathBuf, threshold: usize, interval: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(threshold)),
            threshold_hit: Condvar::new(),
            flush_lock: Mutex::new(()),
            last_flush: Mutex::new(Instant::now()),
            retry_at: Mutex::new(None),
            path,
            threshold: threshold.max(1),
            interval,
            persisted: AtomicUsize::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn append(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        entries.push(entry);
        if entries.len() >= self.threshold {
            self.threshold_hit.notify_one();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written to disk by this buffer so far.
    #[must_use]
    pub fn persisted(&self) -> usize {
        self.persisted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// True once the buffer holds `threshold` entries or the flush interval
    /// has passed with at least one entry waiting. Always false while a
    /// failed flush is backing off.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        if self.retry_pending() {
            return false;
        }
        let len = self.len();
        len >= self.threshold || (len > 0 && self.last_flush.lock().elapsed() >= self.interval)
    }

    /// Writes every buffered entry to the log file and clears the buffer.
    ///
    /// # Errors
    ///
    /// Returns the I/O or serialization error. The entries stay buffered for
    /// the next attempt.
    pub fn flush(&self) -> Result<usize, FlushError> {
        let _serial = self.flush_lock.lock();

        let pending = std::mem::take(&mut *self.entries.lock());
        if pending.is_empty() {
            *self.last_flush.lock() = Instant::now();
            return Ok(0);
        }

        match append_entries(&self.path, &pending) {
            Ok(written) => {
                self.persisted.fetch_add(written, Ordering::Relaxed);
                *self.last_flush.lock() = Instant::now();
                *self.retry_at.lock() = None;
                log::info!(
                    "flushed {written} entries to {} ({} total)",
                    self.path.display(),
                    self.persisted()
                );
                Ok(written)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                *self.retry_at.lock() = Some(Instant::now() + FLUSH_RETRY_DELAY);
                let mut entries = self.entries.lock();
                let newer = std::mem::replace(&mut *entries, pending);
                entries.extend(newer);
                Err(e)
            }
        }
    }

    fn retry_pending(&self) -> bool {
        self.retry_at
            .lock()
            .is_some_and(|retry_at| Instant::now() < retry_at)
    }

    fn wait_for_threshold(&self, timeout: Duration) {
        let backing_off = self.retry_pending();
        let mut entries = self.entries.lock();
        if backing_off || entries.len() < self.threshold {
            let _ = self.threshold_hit.wait_for(&mut entries, timeout);
        }
    }

    fn wake(&self) {
        self.threshold_hit.notify_all();
    }
}

/// Background thread that flushes a `LogBuffer` whenever it reaches its size
/// or time threshold.
pub struct FlushWorker {
    buffer: Arc<LogBuffer>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FlushWorker {
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(buffer: Arc<LogBuffer>) -> anyhow::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let buffer_clone = Arc::clone(&buffer);
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("log-flush".into())
            .spawn(move || {
                while !shutdown_clone.load(Ordering::Relaxed) {
                    buffer_clone.wait_for_threshold(WORKER_WAKE_INTERVAL);
                    if shutdown_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    if buffer_clone.should_flush()
                        && let Err(e) = buffer_clone.flush()
                    {
                        log::error!(
                            "flush failed, keeping {} entries for retry: {e}",
                            buffer_clone.len()
                        );
                    }
                }
            })
            .map_err(|e| anyhow::anyhow!("failed to spawn log-flush thread: {e}"))?;

        Ok(Self {
            buffer,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for any in-flight flush to finish.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.buffer.wake();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
