//! Monotonic time sources.
//!
//! The engine reads time only through [`Clock`], in whole milliseconds since
//! an arbitrary origin. Wall-clock timestamps for history entries come from
//! `chrono` separately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub trait Clock {
    /// Milliseconds since the clock's origin. Never decreases.
    fn now_ms(&self) -> u64;
}

/// `Instant`-backed clock anchored at construction.
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

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock. Clones share the same time, so a test can keep
/// one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs.saturating_mul(1000));
    }

    /// Move to `ms` if it is ahead of the current time.
    pub fn set_ms(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Milliseconds to fractional seconds.
pub fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Fractional seconds to milliseconds, rounded. Negative input maps to 0.
pub fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance_secs(3);
        assert_eq!(clock.now_ms(), 3000);
        clock.set_ms(1000);
        assert_eq!(handle.now_ms(), 3000, "set_ms never moves backwards");
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn secs_conversion_rounds_and_clamps() {
        assert_eq!(secs_to_ms(4.0), 4000);
        assert_eq!(secs_to_ms(0.1), 100);
        assert_eq!(secs_to_ms(-2.0), 0);
        assert_eq!(secs_to_ms(f64::NAN), 0);
        assert_eq!(ms_to_secs(1500), 1.5);
    }
}
