// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::process::{ProcessProbe, ProcessSample};
use crate::config::PerformanceSettings;

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// When the underlying sample was taken; `None` until the first sample.
    pub sampled_at: Option<DateTime<Utc>>,
    pub process_cpu_percent: f32,
    pub system_cpu_percent: f32,
    pub memory_mb: f64,
    pub runtime_secs: f64,
}

#[derive(Clone, Copy)]
struct Latest {
    sample: ProcessSample,
    at: DateTime<Utc>,
}

/// Samples process CPU and memory on its own thread. Readers never wait for a
/// sample; they get the last one taken.
pub struct PerformanceSampler {
    latest: Arc<Mutex<Option<Latest>>>,
    started: Instant,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PerformanceSampler {
    /// Spawns the sampling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        mut probe: Box<dyn ProcessProbe>,
        interval: Duration,
        limits: &PerformanceSettings,
    ) -> anyhow::Result<Self> {
        let latest = Arc::new(Mutex::new(None));
        let shutdown = Arc::new(AtomicBool::new(false));

        let latest_clone = Arc::clone(&latest);
        let shutdown_clone = Arc::clone(&shutdown);
        let mut watch = LimitWatch::new(limits);

        let handle = thread::Builder::new()
            .name("perf-sampler".into())
            .spawn(move || {
                while !shutdown_clone.load(Ordering::Relaxed) {
                    match probe.sample() {
                        Ok(sample) => {
                            watch.check(&sample);
                            *latest_clone.lock() = Some(Latest {
                                sample,
                                at: Utc::now(),
                            });
                        }
                        Err(e) => log::debug!("performance sample skipped: {e}"),
                    }
                    sleep_unless(&shutdown_clone, interval);
                }
            })
            .map_err(|e| anyhow::anyhow!("failed to spawn perf-sampler thread: {e}"))?;

        Ok(Self {
            latest,
            started: Instant::now(),
            shutdown,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn metrics(&self) -> PerformanceMetrics {
        let latest = *self.latest.lock();
        let runtime_secs = self.started.elapsed().as_secs_f64();
        match latest {
            Some(Latest { sample, at }) => PerformanceMetrics {
                sampled_at: Some(at),
                process_cpu_percent: sample.process_cpu_percent,
                system_cpu_percent: sample.system_cpu_percent,
                memory_mb: sample.memory_mb,
                runtime_secs,
            },
            None => PerformanceMetrics {
                sampled_at: None,
                process_cpu_percent: 0.0,
                system_cpu_percent: 0.0,
                memory_mb: 0.0,
                runtime_secs,
            },
        }
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PerformanceSampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleeps for `total`, waking early once `flag` is set.
pub(crate) fn sleep_unless(flag: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !flag.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SHUTDOWN_POLL.min(deadline - now));
    }
}

/// Warns once each time usage crosses a configured limit.
struct LimitWatch {
    max_cpu_percent: f32,
    max_memory_mb: f64,
    cpu_over: bool,
    memory_over: bool,
}

impl LimitWatch {
    fn new(limits: &PerformanceSettings) -> Self {
        Self {
            max_cpu_percent: limits.max_cpu_percent,
            max_memory_mb: limits.max_memory_mb,
            cpu_over: false,
            memory_over: false,
        }
    }

    fn check(&mut self, sample: &ProcessSample) {
        let cpu_over = sample.process_cpu_percent > self.max_cpu_percent;
        if cpu_over && !self.cpu_over {
            log::warn!(
                "CPU usage {:.1}% above limit {:.1}%",
                sample.process_cpu_percent,
                self.max_cpu_percent
            );
        }
        self.cpu_over = cpu_over;

        let memory_over = sample.memory_mb > self.max_memory_mb;
        if memory_over && !self.memory_over {
            log::warn!(
                "resident memory {:.1} MB above limit {:.1} MB",
                sample.memory_mb,
                self.max_memory_mb
            );
        }
        self.memory_over = memory_over;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::sampler::process::ProbeError;

    struct ScriptedProbe {
        calls: Arc<AtomicUsize>,
        fail_after: usize,
    }

    impl ProcessProbe for ScriptedProbe {
        fn sample(&mut self) -> Result<ProcessSample, ProbeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_after {
                return Err(ProbeError::ProcessGone(1));
            }
            #[allow(clippy::cast_precision_loss)]
            let memory_mb = 100.0 + n as f64;
            Ok(ProcessSample {
                process_cpu_percent: 12.5,
                system_cpu_percent: 40.0,
                memory_mb,
            })
        }
    }

    fn wait_for(calls: &AtomicUsize, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while calls.load(Ordering::SeqCst) < n && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn metrics_before_first_sample_are_empty() {
        struct NeverProbe;
        impl ProcessProbe for NeverProbe {
            fn sample(&mut self) -> Result<ProcessSample, ProbeError> {
                Err(ProbeError::Unavailable("test".into()))
            }
        }

        let mut sampler = PerformanceSampler::spawn(
            Box::new(NeverProbe),
            Duration::from_millis(10),
            &PerformanceSettings::default(),
        )
        .unwrap();
        let metrics = sampler.metrics();
        assert!(metrics.sampled_at.is_none());
        assert!(metrics.memory_mb.abs() < f64::EPSILON);
        assert!(metrics.runtime_secs >= 0.0);
        sampler.shutdown();
    }

    #[test]
    fn failed_samples_keep_last_known_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            calls: Arc::clone(&calls),
            fail_after: 2,
        };
        let mut sampler = PerformanceSampler::spawn(
            Box::new(probe),
            Duration::from_millis(5),
            &PerformanceSettings::default(),
        )
        .unwrap();

        wait_for(&calls, 4);
        let metrics = sampler.metrics();
        sampler.shutdown();

        assert!(metrics.sampled_at.is_some());
        assert!((metrics.process_cpu_percent - 12.5).abs() < f32::EPSILON);
        assert!((metrics.memory_mb - 101.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shutdown_does_not_wait_for_full_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            calls: Arc::clone(&calls),
            fail_after: usize::MAX,
        };
        let mut sampler = PerformanceSampler::spawn(
            Box::new(probe),
            Duration::from_secs(30),
            &PerformanceSettings::default(),
        )
        .unwrap();
        wait_for(&calls, 1);

        let start = Instant::now();
        sampler.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn limit_watch_tracks_crossings() {
        let mut watch = LimitWatch::new(&PerformanceSettings::default());
        let hot = ProcessSample {
            process_cpu_percent: 95.0,
            system_cpu_percent: 95.0,
            memory_mb: 800.0,
        };
        watch.check(&hot);
        assert!(watch.cpu_over);
        assert!(watch.memory_over);
        watch.check(&ProcessSample::default());
        assert!(!watch.cpu_over);
        assert!(!watch.memory_over);
    }
}
