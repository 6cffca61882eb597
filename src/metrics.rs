// Run metrics module
//
// Lightweight counters for a coverage run, logged as a summary when the run ends

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one coverage run
///
/// Uses atomics so the counters can be recorded through a shared reference from any
/// step of the pipeline.
#[derive(Debug)]
pub struct RunMetrics {
    /// Demos whose build+run cycle completed
    pub demos_completed: AtomicUsize,

    /// Coverage files moved into artifact directories
    pub artifacts_collected: AtomicUsize,

    /// Stale coverage files removed before the first cycle
    pub stale_artifacts_purged: AtomicUsize,

    /// External commands run to completion
    pub commands_run: AtomicU64,

    /// Total time spent in demo cycles in milliseconds
    pub total_cycle_time_ms: AtomicU64,

    start_time: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            demos_completed: AtomicUsize::new(0),
            artifacts_collected: AtomicUsize::new(0),
            stale_artifacts_purged: AtomicUsize::new(0),
            commands_run: AtomicU64::new(0),
            total_cycle_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished demo cycle
    pub fn record_demo(&self, artifacts: usize, duration: Duration) {
        self.demos_completed.fetch_add(1, Ordering::Relaxed);
        self.artifacts_collected
            .fetch_add(artifacts, Ordering::Relaxed);
        self.total_cycle_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_purged(&self, count: usize) {
        self.stale_artifacts_purged
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_commands(&self, count: u64) {
        self.commands_run.fetch_add(count, Ordering::Relaxed);
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average demo cycle time in milliseconds
    pub fn avg_cycle_time_ms(&self) -> f64 {
        let total = self.total_cycle_time_ms.load(Ordering::Relaxed);
        let count = self.demos_completed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Coverage Run Summary ===");
        tracing::info!("Elapsed: {:.2}s", self.elapsed().as_secs_f64());
        tracing::info!(
            "Demos: {} completed (avg cycle {:.0}ms)",
            self.demos_completed.load(Ordering::Relaxed),
            self.avg_cycle_time_ms()
        );
        tracing::info!(
            "Artifacts: {} collected, {} stale purged",
            self.artifacts_collected.load(Ordering::Relaxed),
            self.stale_artifacts_purged.load(Ordering::Relaxed)
        );
        tracing::info!(
            "External commands run: {}",
            self.commands_run.load(Ordering::Relaxed)
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
