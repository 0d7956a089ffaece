//! inertial_core - Pure no_std inertial sample processing
//!
//! Platform-agnostic algorithms that turn raw or pre-integrated
//! accelerometer and gyroscope samples into corrected, filtered,
//! rate-synchronised motion data. Everything here is host-testable; locks,
//! collaborator callbacks and logging live in the `inertial_sensor` crate.
//!
//! # Design Principles
//!
//! - **Pure no_std**: No std library dependencies, no allocation
//! - **Explicit context**: Convergence and primary state arrive in a
//!   [`timing::SystemTimingContext`] instead of global lookups
//! - **Trait abstractions**: Platform services injected via traits
//!
//! # Modules
//!
//! - [`traits`]: Platform-agnostic trait abstractions (TimeSource)
//! - [`instance`]: Typed instance ids, per-instance arena, lifecycle flag
//! - [`timing`]: Per-cycle timing context
//! - [`rate`]: Sample-rate estimation and per-sample `dt`
//! - [`integrator`]: Delta-angle / delta-velocity accumulation with coning
//! - [`rotation`]: Mounting orientations
//! - [`correction`]: Orientation, temperature, offset and scale correction
//! - [`filter`]: Low-pass, notch, harmonic notch, FFT tap, filter chains
//! - [`primary`]: Primary-instance notification heartbeat
//! - [`parameters`]: Parameter store and sensor parameter sets

#![no_std]

pub mod correction;
pub mod filter;
pub mod instance;
pub mod integrator;
pub mod parameters;
pub mod primary;
pub mod rate;
pub mod rotation;
pub mod timing;
pub mod traits;
