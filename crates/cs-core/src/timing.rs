//! Lightweight performance timing utilities.
//!
//! Opt-in wall-clock timers for the simulation hot paths (derivative and
//! Jacobian evaluation, sparse solves, whole frames). Enabled through the
//! `CS_TIMING` environment variable or programmatically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable performance timing globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Disable performance timing globally.
pub fn disable_timing() {
    ENABLED.store(false, Ordering::Relaxed);
}

/// Check if timing is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("CS_TIMING").is_ok()
}

/// A simple timer that measures elapsed time.
pub struct Timer {
    label: &'static str,
    start: Instant,
    enabled: bool,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
            enabled: is_enabled(),
        }
    }

    /// Stop the timer and return elapsed time in seconds.
    /// If timing is disabled, returns None.
    pub fn stop(self) -> Option<f64> {
        if self.enabled {
            Some(self.start.elapsed().as_secs_f64())
        } else {
            None
        }
    }

    /// Stop the timer, log the result if enabled and feed it into `acc`.
    pub fn stop_into(self, acc: &AccumulatingTimer) {
        let label = self.label;
        if let Some(elapsed) = self.stop() {
            tracing::trace!(label, elapsed_us = elapsed * 1e6, "timer");
            acc.record(elapsed);
        }
    }
}

/// Run `f`, charging its wall time to `acc` when timing is enabled.
pub fn timed<T>(label: &'static str, acc: &AccumulatingTimer, f: impl FnOnce() -> T) -> T {
    let timer = Timer::start(label);
    let out = f();
    timer.stop_into(acc);
    out
}

/// Accumulating timer for tracking total time across multiple calls.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    /// Create a new accumulating timer.
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, duration_s: f64) {
        let nanos = (duration_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    /// Reset the timer.
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Timers for the pieces every integrator step is made of.
pub mod step_timing {
    use super::AccumulatingTimer;

    /// Time spent in derivative evaluations
    pub static DERIVATIVE_EVALS: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent assembling Jacobians
    pub static JACOBIAN_EVALS: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent factorizing and solving the Newton systems
    pub static LINEAR_SOLVES: AccumulatingTimer = AccumulatingTimer::new();

    /// Reset all step timers.
    pub fn reset_all() {
        DERIVATIVE_EVALS.reset();
        JACOBIAN_EVALS.reset();
        LINEAR_SOLVES.reset();
    }

    /// Log a step timing summary.
    pub fn log_summary() {
        if !super::is_enabled() {
            return;
        }

        for (name, acc) in [
            ("derivative", &DERIVATIVE_EVALS),
            ("jacobian", &JACOBIAN_EVALS),
            ("linear solve", &LINEAR_SOLVES),
        ] {
            if acc.count() > 0 {
                tracing::info!(
                    "{name}: {} calls, {:.3}s total, {:.4}ms avg",
                    acc.count(),
                    acc.total_seconds(),
                    acc.average_seconds() * 1000.0
                );
            }
        }
    }
}
