//! Platform seams for the inertial pipeline.
//!
//! - Trait definitions carry no feature gates
//! - Mock implementations are always available for host testing
//! - Hardware timers implement [`TimeSource`] in the platform layer

pub mod time;

pub use time::TimeSource;

#[cfg(target_has_atomic = "64")]
pub use time::MockTime;
