//! Monotonic Timing
//!
//! Wall-clock timing for trials and in-process operations. Everything goes
//! through `std::time::Instant`, which never runs backwards, so an elapsed
//! time is always non-negative.

use std::time::{Duration, Instant};

/// Running stopwatch around one timed region
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start timing
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop timing and return the elapsed duration
    #[inline(always)]
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time so far, in seconds
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Time a closure, returning its result and the elapsed seconds
    #[inline]
    pub fn time<R>(f: impl FnOnce() -> R) -> (R, f64) {
        let timer = Timer::start();
        let result = std::hint::black_box(f());
        (result, timer.stop().as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_basic() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();
        assert!(elapsed >= Duration::from_millis(10));
    }

    #[test]
    fn test_time_closure() {
        let (value, secs) = Timer::time(|| 21 * 2);
        assert_eq!(value, 42);
        assert!(secs >= 0.0);
    }
}
