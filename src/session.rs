// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::analysis::report::write_report;
use crate::analysis::{AnalysisResult, run_pass};
use crate::config::{KeyBindings, Settings};
use crate::datasource::{GameStateSource, SessionMetadata};
use crate::game::estimator::GameStateEstimator;
use crate::input::hook::InputHook;
use crate::input::sampler::InputSampler;
use crate::input::snapshot::AimMetrics;
use crate::recording::buffer::{FlushWorker, LogBuffer};
use crate::recording::format::{LogEntry, analysis_file_name, log_file_name};
use crate::sampler::perf_stats::{PerformanceSampler, sleep_unless};
use crate::sampler::process::ProcessProbe;

const STATS_EVERY_TICKS: u64 = 1000;
const FINAL_FLUSH_ATTEMPTS: u32 = 3;
const FINAL_FLUSH_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Wall-clock timestamps that never go backwards, even if the system clock
/// is stepped during a session.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    pub fn now(&mut self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    fn observe(&mut self, t: DateTime<Utc>) -> DateTime<Utc> {
        let t = match self.last {
            Some(last) if t < last => last,
            _ => t,
        };
        self.last = Some(t);
        t
    }
}

#[derive(Debug)]
pub struct SessionSummary {
    pub ticks: u64,
    pub persisted: usize,
    pub log_path: PathBuf,
    pub analysis: Option<AnalysisResult>,
}

/// One recording session: input, game state and performance sampled on a
/// fixed-rate loop into a `LogBuffer`, flushed and analyzed in the
/// background.
pub struct Session {
    metadata: SessionMetadata,
    settings: Settings,
    shutdown: Arc<AtomicBool>,
    input: InputSampler,
    game: Box<dyn GameStateSource>,
    perf: PerformanceSampler,
    buffer: Arc<LogBuffer>,
    flush_worker: FlushWorker,
    analysis_worker: Option<AnalysisWorker>,
    clock: MonotonicClock,
    last_tick: Option<Instant>,
    ticks: u64,
}

impl Session {
    /// Creates the log directory and starts every component. A hook that
    /// cannot be installed leaves the session in tracking-disabled mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory cannot be created or a
    /// background thread cannot be spawned.
    pub fn start(
        settings: Settings,
        hook: Option<Box<dyn InputHook>>,
        probe: Box<dyn ProcessProbe>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let log_dir = settings.buffer.log_dir.clone();
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

        let game: Box<dyn GameStateSource> = Box::new(GameStateEstimator::new(
            settings.movement.clone(),
            settings.keybinds.clone(),
        ));
        let mut metadata =
            SessionMetadata::new(Utc::now(), game.name(), settings.sampling.frequency_hz);

        let mut input = InputSampler::new(hook, &settings.input, settings.movement.screen_center());
        if let Err(e) = input.start() {
            log::warn!("input tracking disabled: {e}");
        }
        metadata.tracking_enabled = input.is_tracking();

        let perf =
            PerformanceSampler::spawn(probe, settings.perf_interval(), &settings.performance)?;

        let log_path = log_dir.join(log_file_name(&metadata.session_id));
        let buffer = Arc::new(LogBuffer::new(
            log_path,
            settings.buffer.flush_threshold,
            settings.flush_interval(),
        ));
        let flush_worker = FlushWorker::spawn(Arc::clone(&buffer))?;

        let analysis_worker = match settings.analysis_interval() {
            Some(interval) => Some(AnalysisWorker::spawn(
                log_dir.clone(),
                log_dir.join(analysis_file_name(&metadata.session_id)),
                settings.keybinds.clone(),
                interval,
            )?),
            None => None,
        };

        log::info!(
            "session {} started on {}/{} (root: {}, input tracking: {}, game source: {})",
            metadata.session_id,
            metadata.os,
            metadata.arch,
            metadata.running_as_root,
            metadata.tracking_enabled,
            metadata.game_source
        );
        log::info!(
            "sampling at {} Hz into {}",
            settings.sampling.frequency_hz,
            buffer.path().display()
        );

        Ok(Self {
            metadata,
            settings,
            shutdown,
            input,
            game,
            perf,
            buffer,
            flush_worker,
            analysis_worker,
            clock: MonotonicClock::default(),
            last_tick: None,
            ticks: 0,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.buffer.path()
    }

    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Samples every component once and buffers the resulting entry.
    pub fn tick(&mut self) -> LogEntry {
        let now = Instant::now();
        let delta_secs = match self.last_tick {
            Some(prev) => now.duration_since(prev).as_secs_f64(),
            None => self.settings.tick_period().as_secs_f64(),
        };
        self.last_tick = Some(now);

        let timestamp = self.clock.now();
        let input = self.input.snapshot();
        self.game.advance(&input, delta_secs);

        let entry = LogEntry {
            timestamp,
            aim: AimMetrics::from_snapshot(&input, self.settings.movement.screen_center()),
            input,
            game_state: self.game.state(),
            performance: self.perf.metrics(),
        };
        self.buffer.append(entry.clone());
        self.ticks += 1;

        if self.ticks % STATS_EVERY_TICKS == 0 {
            self.log_statistics(&entry);
        }
        entry
    }

    /// Runs the fixed-rate loop until a stop is requested. `on_tick` sees
    /// every entry; its errors are logged and the loop carries on.
    pub fn run(&mut self, mut on_tick: impl FnMut(&Self, &LogEntry) -> Result<()>) {
        let period = self.settings.tick_period();
        let warn_after = Duration::from_millis(self.settings.sampling.loop_warn_ms);

        while !self.stop_requested() {
            let started = Instant::now();

            let entry = self.tick();
            if let Err(e) = on_tick(self, &entry) {
                if self.stop_requested() {
                    break;
                }
                log::error!("tick {} failed: {e:#}", self.ticks);
            }

            let elapsed = started.elapsed();
            if elapsed > warn_after {
                log::warn!(
                    "tick {} took {:.1} ms",
                    self.ticks,
                    elapsed.as_secs_f64() * 1000.0
                );
            }
            thread::sleep(period.saturating_sub(elapsed));
        }
    }

    /// Stops every component, flushes what is left and runs a final analysis
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns an error if every final flush attempt fails. The unflushed
    /// entries are lost in that case.
    pub fn stop(mut self) -> Result<SessionSummary> {
        log::info!("stopping session {}", self.metadata.session_id);

        self.input.stop();
        if let Some(mut worker) = self.analysis_worker.take() {
            worker.shutdown();
        }
        self.flush_worker.shutdown();
        self.perf.shutdown();

        let pending = self.buffer.len();
        if !self.buffer.is_empty() {
            log::info!("flushing {pending} remaining entries");
        }
        self.final_flush(pending)?;

        let log_dir = &self.settings.buffer.log_dir;
        let analysis = analysis_pass(
            log_dir,
            &log_dir.join(analysis_file_name(&self.metadata.session_id)),
            &self.settings.keybinds,
        );

        log::info!(
            "session {} finished: {} ticks, {} entries in {}",
            self.metadata.session_id,
            self.ticks,
            self.buffer.persisted(),
            self.buffer.path().display()
        );

        Ok(SessionSummary {
            ticks: self.ticks,
            persisted: self.buffer.persisted(),
            log_path: self.buffer.path().to_path_buf(),
            analysis,
        })
    }

    fn final_flush(&self, pending: usize) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.buffer.flush() {
                Ok(_) => return Ok(()),
                Err(e) if attempt < FINAL_FLUSH_ATTEMPTS => {
                    log::warn!("final flush attempt {attempt} failed, retrying: {e}");
                    thread::sleep(FINAL_FLUSH_RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("final flush of {pending} entries failed after {attempt} attempts")
                    });
                }
            }
        }
    }

    fn log_statistics(&self, entry: &LogEntry) {
        let state = &entry.game_state;
        log::info!(
            "tick {}: {} buffered, {} persisted, {} failed flushes, health {}, ammo {}/{}, position ({:.1}, {:.1}, {:.1})",
            self.ticks,
            self.buffer.len(),
            self.buffer.persisted(),
            self.buffer.failures(),
            state.health,
            state.ammo.current,
            state.ammo.reserve,
            state.position.x,
            state.position.y,
            state.position.z
        );
    }
}

/// Analyzes everything in `log_dir` and writes the report when there was
/// enough data.
fn analysis_pass(
    log_dir: &Path,
    report_path: &Path,
    bindings: &KeyBindings,
) -> Option<AnalysisResult> {
    let outcome = run_pass(log_dir, bindings);
    let Some(result) = outcome.result else {
        log::warn!("no analysis results available, insufficient data");
        return None;
    };

    for recommendation in &outcome.recommendations {
        log::info!("recommendation: {recommendation}");
    }
    if let Err(e) = write_report(report_path, Utc::now(), Some(&result), &outcome.recommendations) {
        log::error!("{e}");
    }
    Some(result)
}

/// Runs an analysis pass over the log directory every `interval`.
struct AnalysisWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AnalysisWorker {
    fn spawn(
        log_dir: PathBuf,
        report_path: PathBuf,
        bindings: KeyBindings,
        interval: Duration,
    ) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("analysis".into())
            .spawn(move || {
                loop {
                    sleep_unless(&shutdown_clone, interval);
                    if shutdown_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    log::info!("running periodic analysis");
                    let _ = analysis_pass(&log_dir, &report_path, &bindings);
                }
            })
            .map_err(|e| anyhow::anyhow!("failed to spawn analysis thread: {e}"))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::hook::{HookError, InputEvent, InputSink};
    use crate::input::sampler::KeyRelease;
    use crate::recording::reader::read_log_file;
    use crate::sampler::process::{ProbeError, ProcessSample};

    struct FixedProbe;

    impl ProcessProbe for FixedProbe {
        fn sample(&mut self) -> Result<ProcessSample, ProbeError> {
            Ok(ProcessSample {
                process_cpu_percent: 1.0,
                system_cpu_percent: 10.0,
                memory_mb: 20.0,
            })
        }
    }

    /// Holds the forward key for the whole session.
    struct HoldForward;

    impl InputHook for HoldForward {
        fn install(&mut self, sink: InputSink) -> Result<(), HookError> {
            sink.set_release_mode(KeyRelease::Reported);
            sink.apply(InputEvent::KeyDown("w".into()));
            Ok(())
        }

        fn uninstall(&mut self) {}
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.buffer.log_dir = dir.join("logs");
        settings.sampling.frequency_hz = 200;
        settings.performance.sample_interval_ms = 10;
        settings.analysis.interval_secs = 0;
        settings
    }

    fn run_for(session: &mut Session, ticks: u64) {
        session.run(|s, _| {
            if s.ticks() >= ticks {
                s.request_stop();
            }
            Ok(())
        });
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut clock = MonotonicClock::default();
        let t0 = Utc::now();
        assert_eq!(clock.observe(t0), t0);
        assert_eq!(clock.observe(t0 - chrono::Duration::seconds(5)), t0);
        let later = t0 + chrono::Duration::milliseconds(1);
        assert_eq!(clock.observe(later), later);
    }

    #[test]
    fn session_records_every_tick() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut session = Session::start(
            settings(dir.path()),
            Some(Box::new(HoldForward)),
            Box::new(FixedProbe),
            shutdown,
        )
        .unwrap();
        assert!(session.metadata().tracking_enabled);
        let session_id = session.metadata().session_id.clone();

        run_for(&mut session, 25);
        let summary = session.stop().unwrap();

        assert_eq!(summary.ticks, 25);
        assert_eq!(summary.persisted, 25);
        let entries = read_log_file(&summary.log_path).unwrap();
        assert_eq!(entries.len(), 25);
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(entries.iter().all(|e| e.input.is_pressed("w")));
        let last = &entries[24].game_state;
        assert!(last.position.z > 0.0);

        let analysis = summary.analysis.unwrap();
        assert_eq!(analysis.entries_analyzed, 25);
        assert!(
            dir.path()
                .join("logs")
                .join(analysis_file_name(&session_id))
                .exists()
        );
    }

    #[test]
    fn missing_hook_degrades_to_idle_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(
            settings(dir.path()),
            None,
            Box::new(FixedProbe),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert!(!session.metadata().tracking_enabled);

        let entry = session.tick();
        assert!(!entry.input.tracking_enabled);
        assert!(entry.input.active_keys.is_empty());
        assert!(entry.game_state.position.z.abs() < f64::EPSILON);
        assert_eq!(session.buffer().len(), 1);
        session.stop().unwrap();
    }

    #[test]
    fn tick_errors_do_not_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(
            settings(dir.path()),
            None,
            Box::new(FixedProbe),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        let mut failures = 0;
        session.run(|s, _| {
            if s.ticks() >= 10 {
                s.request_stop();
                return Ok(());
            }
            failures += 1;
            anyhow::bail!("render failed")
        });

        assert_eq!(failures, 9);
        assert_eq!(session.stop().unwrap().persisted, 10);
    }

    #[test]
    fn external_stop_flag_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = Arc::new(AtomicBool::new(true));
        let mut session = Session::start(
            settings(dir.path()),
            None,
            Box::new(FixedProbe),
            Arc::clone(&shutdown),
        )
        .unwrap();

        session.run(|_, _| Ok(()));
        let summary = session.stop().unwrap();
        assert_eq!(summary.ticks, 0);
        assert!(summary.analysis.is_none());
    }

    #[test]
    fn final_flush_retries_transient_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(
            settings(dir.path()),
            None,
            Box::new(FixedProbe),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        for _ in 0..3 {
            session.tick();
        }

        let log_dir = dir.path().join("logs");
        std::fs::remove_dir_all(&log_dir).unwrap();
        let restore = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            std::fs::create_dir_all(&log_dir).unwrap();
        });

        let summary = session.stop().unwrap();
        restore.join().unwrap();
        assert_eq!(summary.persisted, 3);
        assert_eq!(read_log_file(&summary.log_path).unwrap().len(), 3);
    }

    #[test]
    fn final_flush_gives_up_eventually() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(
            settings(dir.path()),
            None,
            Box::new(FixedProbe),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        session.tick();

        let log_dir = dir.path().join("logs");
        std::fs::remove_dir_all(&log_dir).unwrap();
        std::fs::write(&log_dir, "not a directory").unwrap();

        assert!(session.stop().is_err());
    }

    #[test]
    fn unusable_log_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let mut settings = settings(dir.path());
        settings.buffer.log_dir = blocker.join("logs");

        let result = Session::start(
            settings,
            None,
            Box::new(FixedProbe),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(result.is_err());
    }
}
