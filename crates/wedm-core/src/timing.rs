//! Lightweight wall-clock timing utilities.
//!
//! The kernel is judged by how much simulated time it advances per unit of
//! wall time. These helpers measure that ratio without touching the hot loop:
//! callers start a [`Timer`] around a batch of steps and feed the simulated
//! span into [`RealTimeFactor`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A simple timer that measures elapsed wall time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed time in seconds.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and pair it with the simulated span it covered.
    pub fn stop(self, simulated_us: u64) -> RealTimeFactor {
        RealTimeFactor {
            simulated_us,
            wall_s: self.elapsed_s(),
        }
    }
}

/// Simulated-time / wall-time ratio for a finished batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealTimeFactor {
    pub simulated_us: u64,
    pub wall_s: f64,
}

impl RealTimeFactor {
    /// Simulated seconds per wall second. Infinite when no wall time elapsed.
    pub fn ratio(&self) -> f64 {
        let simulated_s = self.simulated_us as f64 * 1e-6;
        if self.wall_s > 0.0 {
            simulated_s / self.wall_s
        } else {
            f64::INFINITY
        }
    }

    /// Base steps per wall second.
    pub fn steps_per_second(&self) -> f64 {
        if self.wall_s > 0.0 {
            self.simulated_us as f64 / self.wall_s
        } else {
            f64::INFINITY
        }
    }
}

/// Accumulating counter for total wall time across several batches,
/// shareable between worker threads.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    simulated_us: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            simulated_us: AtomicU64::new(0),
        }
    }

    /// Record one finished batch.
    pub fn record(&self, rtf: RealTimeFactor) {
        let nanos = (rtf.wall_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.simulated_us
            .fetch_add(rtf.simulated_us, Ordering::Relaxed);
    }

    pub fn total(&self) -> RealTimeFactor {
        RealTimeFactor {
            simulated_us: self.simulated_us.load(Ordering::Relaxed),
            wall_s: self.total_ns.load(Ordering::Relaxed) as f64 / 1e9,
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.simulated_us.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_from_known_span() {
        let rtf = RealTimeFactor {
            simulated_us: 2_000_000,
            wall_s: 0.5,
        };
        assert!((rtf.ratio() - 4.0).abs() < 1e-12);
        assert!((rtf.steps_per_second() - 4.0e6).abs() < 1e-6);
    }

    #[test]
    fn zero_wall_time_is_infinite() {
        let rtf = RealTimeFactor {
            simulated_us: 10,
            wall_s: 0.0,
        };
        assert!(rtf.ratio().is_infinite());
    }

    #[test]
    fn accumulating_timer_sums_batches() {
        let acc = AccumulatingTimer::new();
        acc.record(RealTimeFactor {
            simulated_us: 1000,
            wall_s: 0.25,
        });
        acc.record(RealTimeFactor {
            simulated_us: 3000,
            wall_s: 0.25,
        });
        let total = acc.total();
        assert_eq!(total.simulated_us, 4000);
        assert!((total.wall_s - 0.5).abs() < 1e-6);

        acc.reset();
        assert_eq!(acc.total().simulated_us, 0);
    }

    #[test]
    fn timer_measures_non_negative_time() {
        let t = Timer::start("noop");
        assert_eq!(t.label(), "noop");
        let rtf = t.stop(5);
        assert!(rtf.wall_s >= 0.0);
        assert_eq!(rtf.simulated_us, 5);
    }
}
