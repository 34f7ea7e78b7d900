//! Monotonic time source.
//!
//! The decoder timestamps requests and subtracts on response decode; it
//! only needs "now" as a [`Duration`] from a fixed origin, which keeps the
//! seam trivially mockable in tests.

use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait TimeSource {
    /// Time elapsed since the source's origin.
    fn monotonic_time(&self) -> Duration;
}

/// Production clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn monotonic_time(&self) -> Duration {
        self.origin.elapsed()
    }
}
