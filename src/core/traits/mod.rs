//! Platform seams: the per-backend lock and the clock.
//!
//! # Features
//!
//! - **`embassy`**: Enables `EmbassyState<T>`
//! - Mock implementations are always available for host testing

pub mod sync;

pub use inertial_core::traits::TimeSource;
#[cfg(target_has_atomic = "64")]
pub use inertial_core::traits::MockTime;
pub use sync::{MockState, SharedState};

#[cfg(feature = "embassy")]
pub use sync::EmbassyState;
