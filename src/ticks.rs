//! Millisecond tick counter with wraparound-safe differences.
//!
//! Ticks are a `u32` that wraps roughly every 49.7 days. Only differences
//! between two ticks are meaningful, and those are computed with wrapping
//! subtraction, so an animation gate keeps working across the wrap.

use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Ticks(pub u32);

impl Ticks {
    /// Milliseconds elapsed from `earlier` to `self`.
    pub fn since(self, earlier: Ticks) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    pub fn wrapping_add_ms(self, ms: u32) -> Ticks {
        Ticks(self.0.wrapping_add(ms))
    }
}

/// Monotonic clock that hands out [`Ticks`] relative to its creation.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> Ticks {
        // Truncation is the wrap.
        Ticks(self.start.elapsed().as_millis() as u32)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
