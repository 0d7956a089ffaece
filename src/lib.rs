#![cfg_attr(not(test), no_std)]

//! inertial_sensor - Inertial sensor sample pipeline for autopilot IMUs
//!
//! Turns raw and sensor-integrated accel/gyro samples into the delta
//! angles, delta velocities and filtered rates the estimation front end
//! consumes. Algorithms live in `inertial_core`; this crate adds the
//! per-backend lock, the sampling and publishing handles, the collaborator
//! interfaces and the instance registry.

// Logging macros and platform seams
pub mod core;

// Per-backend lock and the producer/consumer handles
pub mod backend;

// Collaborators fed by the pipeline (loggers, batch sampler, heater, ...)
pub mod sinks;

// Instance registry and per-cycle timing context
pub mod frontend;

pub use inertial_core;

pub use backend::{
    ImuBackend, ImuPublisher, ImuSampler, PublishedSample, RawLogConfig, SampleState, SamplerConfig,
};
pub use frontend::{InertialSensor, SensorInfo};
