//! Audio clocks: the scheduler's wall-clock reference, in seconds.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A monotonically non-decreasing time source.
pub trait AudioClock {
    /// Seconds since the clock's origin.
    fn current_time(&self) -> f64;
}

/// Real time, measured from when the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The [`Instant`] corresponding to `seconds` on this clock.
    pub fn instant_at(&self, seconds: f64) -> Instant {
        self.origin + Duration::from_secs_f64(seconds.max(0.0))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Used for offline runs and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    time: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward. Negative amounts are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.time.set(self.time.get() + seconds);
        }
    }

    /// Jump to an absolute time, never going backwards.
    pub fn set(&self, seconds: f64) {
        if seconds > self.time.get() {
            self.time.set(seconds);
        }
    }
}

impl AudioClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time.get()
    }
}
