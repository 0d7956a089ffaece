//! Per-sensor backend: the lock shared by the sampling and publishing
//! contexts, and the handles each context works through.
//!
//! # Critical sections
//!
//! All mutation of [`SampleState`] happens inside `SharedState::with_mut`:
//!
//! - [`ImuSampler`] holds the lock only to integrate, filter and raise
//!   `new_data` for one sample.
//! - [`ImuPublisher`] holds the lock only to move the accumulated delta
//!   into the published sample, drain the accumulator and retune filters.
//!
//! Both are bounded and never call a collaborator. Rate estimation, sample
//! timing, correction and primary notification stay in the sampler and
//! need no lock.
//!
//! A killed sensor stays killed; every later call for it is a no-op.
//!
//! A backend has at most one live [`ImuSampler`]. The accel calibrator
//! attached to the publisher reports whether it is collecting through an
//! atomic flag the sampler reads before correcting each sample.

mod publisher;
mod sampler;

pub use publisher::ImuPublisher;
pub use sampler::{ImuSampler, RawLogConfig, SamplerConfig};

use crate::core::traits::SharedState;
use inertial_core::filter::{AccelFilterChain, FilterConfig, GyroFilterChain};
use inertial_core::instance::{InstanceId, LifecycleFlag};
use core::sync::atomic::{AtomicBool, Ordering};
use inertial_core::integrator::DeltaAccumulator;
use nalgebra::Vector3;

/// Front-end visible result of one publish cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedSample {
    /// Latest filtered reading (rad/s or m/s²)
    pub value: Vector3<f32>,
    /// Delta angle (rad) or delta velocity (m/s) since the previous publish
    pub delta: Vector3<f32>,
    /// Time covered by `delta` (s)
    pub delta_dt: f32,
    pub delta_valid: bool,
    pub healthy: bool,
    /// Incremented on every publish that carried new data
    pub sequence: u32,
}

impl PublishedSample {
    pub const fn new() -> Self {
        Self {
            value: Vector3::new(0.0, 0.0, 0.0),
            delta: Vector3::new(0.0, 0.0, 0.0),
            delta_dt: 0.0,
            delta_valid: false,
            healthy: false,
            sequence: 0,
        }
    }
}

impl Default for PublishedSample {
    fn default() -> Self {
        Self::new()
    }
}

/// Gyro half of the locked state.
pub struct GyroState {
    pub(crate) accumulator: DeltaAccumulator,
    pub(crate) filters: GyroFilterChain,
    pub(crate) published: PublishedSample,
    pub(crate) new_data: bool,
    pub(crate) sample_rate_hz: f32,
    pub(crate) fft_sample: Vector3<f32>,
    pub(crate) error_count: u32,
}

/// Accel half of the locked state.
pub struct AccelState {
    pub(crate) accumulator: DeltaAccumulator,
    pub(crate) filters: AccelFilterChain,
    pub(crate) published: PublishedSample,
    pub(crate) new_data: bool,
    pub(crate) sample_rate_hz: f32,
    pub(crate) error_count: u32,
}

/// Everything guarded by a backend's lock.
pub struct SampleState {
    pub(crate) gyro: GyroState,
    pub(crate) accel: AccelState,
    pub(crate) filter_config: FilterConfig,
    pub(crate) temperature_c: Option<f32>,
}

impl GyroState {
    fn new() -> Self {
        Self {
            accumulator: DeltaAccumulator::new(),
            filters: GyroFilterChain::new(),
            published: PublishedSample::new(),
            new_data: false,
            sample_rate_hz: 0.0,
            fft_sample: Vector3::zeros(),
            error_count: 0,
        }
    }
}

impl AccelState {
    const fn new() -> Self {
        Self {
            accumulator: DeltaAccumulator::new(),
            filters: AccelFilterChain::new(),
            published: PublishedSample::new(),
            new_data: false,
            sample_rate_hz: 0.0,
            error_count: 0,
        }
    }
}

impl SampleState {
    pub fn new(filter_config: FilterConfig) -> Self {
        Self {
            gyro: GyroState::new(),
            accel: AccelState::new(),
            filter_config,
            temperature_c: None,
        }
    }
}

impl Default for SampleState {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

/// One physical IMU: a gyro instance and an accel instance sharing a lock.
pub struct ImuBackend<S> {
    gyro_instance: InstanceId,
    accel_instance: InstanceId,
    state: S,
    gyro_lifecycle: LifecycleFlag,
    accel_lifecycle: LifecycleFlag,
    sampler_claimed: AtomicBool,
    accel_calibrating: AtomicBool,
}

impl<S> ImuBackend<S> {
    pub(crate) fn release_sampler(&self) {
        self.sampler_claimed.store(false, Ordering::Release);
    }

    /// Whether an accel calibration capture wants uncorrected samples.
    pub fn accel_calibrating(&self) -> bool {
        self.accel_calibrating.load(Ordering::Acquire)
    }

    pub(crate) fn set_accel_calibrating(&self, collecting: bool) {
        self.accel_calibrating.store(collecting, Ordering::Release);
    }
}

impl<S: SharedState<SampleState>> ImuBackend<S> {
    pub fn new(gyro_instance: InstanceId, accel_instance: InstanceId, state: S) -> Self {
        Self {
            gyro_instance,
            accel_instance,
            state,
            gyro_lifecycle: LifecycleFlag::new(),
            accel_lifecycle: LifecycleFlag::new(),
            sampler_claimed: AtomicBool::new(false),
            accel_calibrating: AtomicBool::new(false),
        }
    }

    pub fn gyro_instance(&self) -> InstanceId {
        self.gyro_instance
    }

    pub fn accel_instance(&self) -> InstanceId {
        self.accel_instance
    }

    /// Handle for the sampling context.
    ///
    /// Returns `None` while another sampler for this backend is alive; the
    /// claim is released when that sampler is dropped.
    pub fn sampler<'a>(&'a self, config: SamplerConfig) -> Option<ImuSampler<'a, S>> {
        if self.sampler_claimed.swap(true, Ordering::AcqRel) {
            crate::log_warn!("imu gyro {} already has a sampler", self.gyro_instance.index());
            return None;
        }
        Some(ImuSampler::new(self, config))
    }

    /// Handle for the publishing context.
    pub fn publisher<'a>(&'a self) -> ImuPublisher<'a, S> {
        ImuPublisher::new(self)
    }

    /// Permanently disable the gyro instance.
    pub fn kill_gyro(&self) {
        if self.gyro_lifecycle.kill() {
            crate::log_warn!("gyro {} killed", self.gyro_instance.index());
        }
    }

    /// Permanently disable the accel instance.
    pub fn kill_accel(&self) {
        if self.accel_lifecycle.kill() {
            crate::log_warn!("accel {} killed", self.accel_instance.index());
        }
    }

    pub fn gyro_killed(&self) -> bool {
        self.gyro_lifecycle.is_killed()
    }

    pub fn accel_killed(&self) -> bool {
        self.accel_lifecycle.is_killed()
    }

    /// Replace the filter configuration. Filters retune on the next
    /// publish cycle.
    pub fn set_filter_config(&self, config: FilterConfig) {
        self.state.with_mut(|s| s.filter_config = config);
    }

    pub(crate) fn state(&self) -> &S {
        &self.state
    }
}
