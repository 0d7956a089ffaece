//! Per-cycle timing context.
//!
//! Whether the sensors are still converging on their true sample rate, and
//! which instance is primary, are decided once per cycle by the caller and
//! passed into every pipeline call as a [`SystemTimingContext`].

use crate::instance::InstanceId;
use crate::traits::TimeSource;

/// Length of the startup window during which rate and filter estimates
/// adapt quickly (30 s).
pub const SENSOR_CONVERGENCE_US: u64 = 30_000_000;

/// Snapshot of the system state the pipeline needs for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemTimingContext {
    /// Host time when the snapshot was taken (µs)
    pub now_us: u64,
    /// Still inside the startup window and not armed
    pub is_converging: bool,
    /// Instance the external arbiter currently trusts
    pub primary: Option<InstanceId>,
}

impl SystemTimingContext {
    /// Build the context from raw inputs.
    ///
    /// Sensors converge until [`SENSOR_CONVERGENCE_US`] has elapsed, or until
    /// the vehicle arms, whichever comes first.
    pub fn new(now_us: u64, armed: bool, primary: Option<InstanceId>) -> Self {
        Self {
            now_us,
            is_converging: now_us < SENSOR_CONVERGENCE_US && !armed,
            primary,
        }
    }

    /// Capture the context from a clock.
    pub fn capture<T: TimeSource>(time: &T, armed: bool, primary: Option<InstanceId>) -> Self {
        Self::new(time.now_us(), armed, primary)
    }

    pub fn is_primary(&self, instance: InstanceId) -> bool {
        self.primary == Some(instance)
    }
}
