// SPDX-License-Identifier: MIT
use sysinfo::{Pid, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProcessSample {
    pub process_cpu_percent: f32,
    pub system_cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("process metrics unavailable: {0}")]
    Unavailable(String),
    #[error("process {0} is no longer visible")]
    ProcessGone(u32),
}

pub trait ProcessProbe: Send {
    /// # Errors
    ///
    /// Returns an error if the platform stops reporting the process.
    fn sample(&mut self) -> Result<ProcessSample, ProbeError>;
}

/// Reads CPU and resident memory of the current process through `sysinfo`.
pub struct SysinfoProbe {
    system: System,
    pid: Pid,
}

impl SysinfoProbe {
    /// # Errors
    ///
    /// Returns an error if the current PID cannot be determined on this
    /// platform.
    pub fn current() -> Result<Self, ProbeError> {
        let pid = sysinfo::get_current_pid().map_err(|e| ProbeError::Unavailable(e.to_string()))?;
        let mut system = System::new();
        // CPU usage is a delta between refreshes; prime the first one.
        system.refresh_cpu();
        system.refresh_process(pid);
        Ok(Self { system, pid })
    }
}

impl ProcessProbe for SysinfoProbe {
    fn sample(&mut self) -> Result<ProcessSample, ProbeError> {
        self.system.refresh_cpu();
        if !self.system.refresh_process(self.pid) {
            return Err(ProbeError::ProcessGone(self.pid.as_u32()));
        }
        let process = self
            .system
            .process(self.pid)
            .ok_or(ProbeError::ProcessGone(self.pid.as_u32()))?;

        #[allow(clippy::cast_precision_loss)]
        let memory_mb = process.memory() as f64 / BYTES_PER_MB;

        Ok(ProcessSample {
            process_cpu_percent: process.cpu_usage(),
            system_cpu_percent: self.system.global_cpu_info().cpu_usage(),
            memory_mb,
        })
    }
}
