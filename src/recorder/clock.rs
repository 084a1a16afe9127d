//! Monotonic clock shared across sensors
//!
//! Every sensor stream in a capture session stamps its samples from the same
//! monotonic origin so they can be correlated later, independent of wall-clock
//! adjustments.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Supplies monotonic nanosecond timestamps
pub trait ClockSource: Send + Sync {
    /// Nanoseconds since the clock's origin. Never decreases.
    fn now_ns(&self) -> i64;
}

/// Process-wide origin shared by every `MonotonicClock`
fn process_origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

/// Monotonic clock backed by `Instant`.
///
/// All instances share one origin, so two sensors holding separate
/// `MonotonicClock` values still produce comparable timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        // Pin the origin as early as possible
        let _ = process_origin();
        Self
    }

    /// A clock ready to hand to several sensors
    pub fn shared() -> Arc<dyn ClockSource> {
        Arc::new(Self::new())
    }
}

impl ClockSource for MonotonicClock {
    fn now_ns(&self) -> i64 {
        let elapsed = process_origin().elapsed().as_nanos();
        i64::try_from(elapsed).unwrap_or(i64::MAX)
    }
}

/// Manually driven clock for replay and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ns: i64) -> Self {
        Self {
            now_ns: AtomicI64::new(start_ns),
        }
    }

    /// Move the clock forward. Negative steps are ignored.
    pub fn advance(&self, delta_ns: i64) {
        if delta_ns > 0 {
            self.now_ns.fetch_add(delta_ns, Ordering::SeqCst);
        }
    }
}

impl ClockSource for ManualClock {
    fn now_ns(&self) -> i64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_decreases() {
        let clock = MonotonicClock::new();
        let mut last = clock.now_ns();
        for _ in 0..1000 {
            let now = clock.now_ns();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_instances_share_origin() {
        let a = MonotonicClock::new();
        let first = a.now_ns();
        let b = MonotonicClock::new();
        // A fresh instance must not restart from zero
        assert!(b.now_ns() >= first);
    }

    #[test]
    fn test_manual_clock_ignores_backwards_steps() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now_ns(), 1_500);
        clock.advance(-200);
        assert_eq!(clock.now_ns(), 1_500);
    }
}
