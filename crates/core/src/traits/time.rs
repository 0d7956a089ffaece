//! Clock abstraction for sample timing.
//!
//! Sensor drivers and the estimation front end read time through
//! [`TimeSource`] so the pipeline can run against a hardware timer on the
//! vehicle and against [`MockTime`] on the host.

#[cfg(target_has_atomic = "64")]
use core::sync::atomic::{AtomicU64, Ordering};

/// Monotonic microsecond clock.
///
/// # Example
///
/// ```
/// use inertial_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// time.advance(2_500);
/// assert_eq!(time.now_us(), 2_500);
/// assert_eq!(time.elapsed_since(1_000), 1_500);
/// ```
pub trait TimeSource: Send + Sync {
    /// Microseconds since system start.
    fn now_us(&self) -> u64;

    /// Milliseconds since system start.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1_000
    }

    /// Microseconds elapsed since `reference_us`, saturating at zero for
    /// references in the future.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Host-side clock advanced explicitly by tests.
///
/// Backed by an atomic so a single instance can be shared between a
/// producer thread and a consumer thread.
#[cfg(target_has_atomic = "64")]
#[derive(Default)]
pub struct MockTime {
    current_us: AtomicU64,
}

#[cfg(target_has_atomic = "64")]
impl MockTime {
    /// Clock starting at time 0.
    pub const fn new() -> Self {
        Self {
            current_us: AtomicU64::new(0),
        }
    }

    /// Clock starting at `us`.
    pub const fn with_initial(us: u64) -> Self {
        Self {
            current_us: AtomicU64::new(us),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, us: u64) {
        self.current_us.store(us, Ordering::Release);
    }

    /// Move the clock forward by `us`.
    pub fn advance(&self, us: u64) {
        self.current_us.fetch_add(us, Ordering::AcqRel);
    }
}

#[cfg(target_has_atomic = "64")]
impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let time = MockTime::new();
        assert_eq!(time.now_us(), 0);
        assert_eq!(time.now_ms(), 0);
    }

    #[test]
    fn test_with_initial_and_set() {
        let time = MockTime::with_initial(30_000_000);
        assert_eq!(time.now_ms(), 30_000);

        time.set(1_999);
        assert_eq!(time.now_ms(), 1);
    }

    #[test]
    fn test_advance_accumulates() {
        let time = MockTime::new();
        for _ in 0..1000 {
            time.advance(1_000);
        }
        assert_eq!(time.now_us(), 1_000_000);
    }

    #[test]
    fn test_elapsed_since_saturates() {
        let time = MockTime::with_initial(1_000);
        assert_eq!(time.elapsed_since(400), 600);
        assert_eq!(time.elapsed_since(5_000), 0);
    }
}
