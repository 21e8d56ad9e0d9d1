//! Process resource usage for the `process_*` series.
//!
//! Sampled with `sysinfo` on every scrape of `/metrics`. sysinfo only reports
//! CPU usage between two refreshes, so total CPU seconds are accumulated here
//! from the usage over each interval between scrapes.

use super::metrics::{ExporterMetrics, ProcessStats};
use std::sync::Mutex;
use std::time::Instant;
use sysinfo::{Pid, System};
use tracing::debug;

/// Running total of CPU time, integrated over refresh intervals.
#[derive(Debug, Default)]
struct CpuClock {
    last_refresh: Option<Instant>,
    seconds_total: f64,
}

impl CpuClock {
    /// Add the time spent at `usage_percent` (100 = one core) since the last
    /// refresh. The first call only starts the clock.
    fn advance(&mut self, usage_percent: f32, now: Instant) -> f64 {
        if let Some(last) = self.last_refresh {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            self.seconds_total += f64::from(usage_percent.max(0.0)) / 100.0 * elapsed;
        }
        self.last_refresh = Some(now);
        self.seconds_total
    }
}

struct Sampler {
    system: System,
    cpu: CpuClock,
}

/// Samples this process's memory, CPU and start time.
pub struct ProcessCollector {
    pid: Option<Pid>,
    sampler: Mutex<Sampler>,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| debug!(target: "exporter.observability", error = %e, "Process id unavailable"))
            .ok();

        Self {
            pid,
            sampler: Mutex::new(Sampler {
                system: System::new(),
                cpu: CpuClock::default(),
            }),
        }
    }

    /// Take a fresh sample, or `None` if the platform does not expose one.
    pub fn sample(&self) -> Option<ProcessStats> {
        let pid = self.pid?;
        let mut sampler = self
            .sampler
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Sampler { system, cpu } = &mut *sampler;

        if !system.refresh_process(pid) {
            return None;
        }
        let now = Instant::now();

        system.process(pid).map(|process| ProcessStats {
            resident_memory_bytes: process.memory(),
            virtual_memory_bytes: process.virtual_memory(),
            start_time_seconds: process.start_time(),
            cpu_seconds_total: cpu.advance(process.cpu_usage(), now),
        })
    }

    /// Sample and publish into the registry.
    pub fn collect(&self, metrics: &ExporterMetrics) {
        if let Some(stats) = self.sample() {
            metrics.set_process_stats(&stats);
        }
    }
}
