use crate::domain::model::RunSummary;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Timing and memory for one pipeline phase.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub rows: usize,
    pub elapsed: Duration,
    pub rows_per_second: f64,
    pub resident_mb: Option<u64>,
}

/// Resident memory of this process, sampled through `sysinfo`.
#[cfg(feature = "cli")]
struct MemorySampler {
    system: System,
    pid: Pid,
    peak_mb: u64,
}

#[cfg(feature = "cli")]
impl MemorySampler {
    fn new() -> Option<Self> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                tracing::warn!("Could not resolve current PID, memory stats disabled: {}", e);
                return None;
            }
        };
        Some(Self {
            system: System::new(),
            pid,
            peak_mb: 0,
        })
    }

    fn sample(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let mb = self.system.process(self.pid)?.memory() / 1024 / 1024;
        self.peak_mb = self.peak_mb.max(mb);
        Some(mb)
    }
}

#[cfg(not(feature = "cli"))]
struct MemorySampler {
    peak_mb: u64,
}

#[cfg(not(feature = "cli"))]
impl MemorySampler {
    fn new() -> Option<Self> {
        None
    }

    fn sample(&mut self) -> Option<u64> {
        None
    }
}

/// Per-phase row throughput and memory for a listing run. Silent unless enabled.
pub struct SystemMonitor {
    enabled: bool,
    started: Instant,
    phase_started: Mutex<Instant>,
    memory: Mutex<Option<MemorySampler>>,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let memory = if enabled { MemorySampler::new() } else { None };
        let now = Instant::now();
        Self {
            enabled,
            started: now,
            phase_started: Mutex::new(now),
            memory: Mutex::new(memory),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Close the current phase after it handled `rows` listings and start the next one.
    pub fn phase_done(&self, phase: &'static str, rows: usize) -> Option<PhaseReport> {
        if !self.enabled {
            return None;
        }

        let elapsed = {
            let mut phase_started = self.phase_started.lock().ok()?;
            let elapsed = phase_started.elapsed();
            *phase_started = Instant::now();
            elapsed
        };
        let resident_mb = self
            .memory
            .lock()
            .ok()?
            .as_mut()
            .and_then(MemorySampler::sample);

        let report = PhaseReport {
            phase,
            rows,
            elapsed,
            rows_per_second: rows_per_second(rows, elapsed),
            resident_mb,
        };

        match report.resident_mb {
            Some(mb) => tracing::info!(
                "📊 {} - {} rows in {:?} ({:.2} rows/s), memory: {}MB",
                report.phase,
                report.rows,
                report.elapsed,
                report.rows_per_second,
                mb
            ),
            None => tracing::info!(
                "📊 {} - {} rows in {:?} ({:.2} rows/s)",
                report.phase,
                report.rows,
                report.elapsed,
                report.rows_per_second
            ),
        }
        Some(report)
    }

    /// Log the run totals: wall time, time per title and peak memory.
    pub fn log_run_totals(&self, summary: &RunSummary) {
        if !self.enabled {
            return;
        }

        let total = self.started.elapsed();
        let per_title = match u32::try_from(summary.total_rows) {
            Ok(rows) if rows > 0 => total / rows,
            _ => Duration::ZERO,
        };
        let peak_mb = self
            .memory
            .lock()
            .ok()
            .and_then(|memory| memory.as_ref().map(|m| m.peak_mb));

        tracing::info!(
            "📊 Run totals - {} titles in {:?} ({:?} per title), {} fallbacks, peak memory: {}",
            summary.total_rows,
            total,
            per_title,
            summary.fallback_rows,
            peak_mb.map_or_else(|| "n/a".to_string(), |mb| format!("{}MB", mb))
        );
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

fn rows_per_second(rows: usize, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        rows as f64 / seconds
    } else {
        0.0
    }
}
