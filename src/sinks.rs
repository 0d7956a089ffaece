//! Collaborator interfaces fed by the sample pipeline.
//!
//! Every method has a no-op default so a collaborator implements only what
//! it consumes. [`NoSink`] implements all of them and is what an absent
//! collaborator behaves like. Collaborators are always called outside the
//! backend lock.

use inertial_core::instance::{InstanceId, SensorKind};
use nalgebra::Vector3;

/// A register found holding an unexpected value by a driver's periodic
/// register check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterCheck {
    pub bank: u8,
    pub regnum: u8,
    pub value: u8,
}

/// Persistent log sink for raw sensor records.
pub trait RawSampleLogger {
    /// Whether raw IMU logging is currently requested.
    fn should_log_raw(&self) -> bool {
        false
    }

    /// `log_instance` is the instance index, offset by the gyro count for
    /// post-filter records written alongside pre-filter ones.
    fn write_gyro(&mut self, _log_instance: u8, _sample_us: u64, _gyro: &Vector3<f32>) {}

    fn write_accel(&mut self, _log_instance: u8, _sample_us: u64, _accel: &Vector3<f32>) {}

    fn write_register_change(&mut self, _now_us: u64, _bus_id: u32, _reg: &RegisterCheck) {}
}

/// Rate-synchronised batch sampler.
pub trait BatchSampler {
    /// Sampling the sensor-rate stream rather than the pipeline stream.
    fn doing_sensor_rate_logging(&self) -> bool {
        false
    }

    /// Wants filtered rather than raw pipeline samples.
    fn doing_post_filter_logging(&self) -> bool {
        false
    }

    fn sample(&mut self, _instance: InstanceId, _kind: SensorKind, _sample_us: u64, _v: &Vector3<f32>) {}
}

/// External module hook seeing every accepted sample.
pub trait SampleHook {
    fn gyro_sample(&mut self, _instance: InstanceId, _dt: f32, _gyro: &Vector3<f32>) {}

    fn accel_sample(&mut self, _instance: InstanceId, _dt: f32, _accel: &Vector3<f32>, _fsync: bool) {}
}

/// Optical-flow sensor consuming body rates for its own compensation.
pub trait OpticalFlowGyro {
    fn push_gyro(&mut self, _x: f32, _y: f32, _dt: f32) {}
}

/// Board heater regulating IMU temperature.
pub trait HeaterControl {
    fn set_imu_temp(&mut self, _temperature_c: f32) {}
}

/// Accelerometer calibration capture.
pub trait AccelCalibrator {
    fn is_collecting(&self) -> bool {
        false
    }

    /// Board-derotated delta velocity, offsets and scale not applied.
    fn new_sample(&mut self, _delta_velocity: &Vector3<f32>, _dt: f32) {}
}

/// Driver-side reaction to the backend's primary status.
pub trait PrimaryListener {
    fn set_primary(&mut self, _is_primary: bool) {}
}

/// Collaborator that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSink;

impl RawSampleLogger for NoSink {}
impl BatchSampler for NoSink {}
impl SampleHook for NoSink {}
impl OpticalFlowGyro for NoSink {}
impl HeaterControl for NoSink {}
impl AccelCalibrator for NoSink {}
impl PrimaryListener for NoSink {}
