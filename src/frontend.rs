//! Instance registry and per-cycle context for the inertial sensors
//!
//! `InertialSensor` is the front end that drivers register with. It hands
//! out accel and gyro [`InstanceId`]s, holds the loaded configuration, and
//! builds the plain value structs each backend is constructed from.
//!
//! ## Usage
//!
//! ```ignore
//! let mut ins = InertialSensor::from_store(&store);
//! let gyro = ins.register_gyro(1000.0, Rotation::Yaw90)?;
//! let accel = ins.register_accel(1000.0, Rotation::Yaw90)?;
//!
//! let backend = ImuBackend::new(gyro, accel, EmbassyState::new(SampleState::new(ins.filter_config())));
//! let mut sampler = backend
//!     .sampler(ins.sampler_config(gyro, accel, &store)?)
//!     .expect("sampler already claimed");
//!
//! let ctx = ins.timing_context(&clock);
//! sampler.notify_raw_gyro(&ctx, sample, timestamp_us);
//! ```

use crate::backend::{RawLogConfig, SamplerConfig};
use inertial_core::correction::CorrectionStage;
use inertial_core::filter::FilterConfig;
use inertial_core::instance::{InstanceId, InstanceSlots, RegistryError, SensorKind};
use inertial_core::parameters::{CalibrationParams, InsParams, ParameterStore};
use inertial_core::rotation::Rotation;
use inertial_core::timing::SystemTimingContext;
use inertial_core::traits::TimeSource;

/// What a driver declares when it registers a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorInfo {
    /// Rate the sensor was configured for (Hz)
    pub nominal_rate_hz: f32,
    /// Mounting orientation of the sensor on the board
    pub orientation: Rotation,
}

/// Front end of the inertial sensor set.
pub struct InertialSensor {
    gyros: InstanceSlots<SensorInfo>,
    accels: InstanceSlots<SensorInfo>,
    params: InsParams,
    primary_gyro: Option<InstanceId>,
    armed: bool,
}

impl InertialSensor {
    pub fn new(params: InsParams) -> Self {
        Self {
            gyros: InstanceSlots::new(),
            accels: InstanceSlots::new(),
            params,
            primary_gyro: Some(InstanceId::FIRST),
            armed: false,
        }
    }

    /// Front end configured from `store`. Missing values fall back to
    /// their defaults.
    pub fn from_store(store: &ParameterStore) -> Self {
        Self::new(InsParams::from_store(store))
    }

    pub fn register_gyro(&mut self, nominal_rate_hz: f32, orientation: Rotation) -> Result<InstanceId, RegistryError> {
        let info = SensorInfo {
            nominal_rate_hz,
            orientation,
        };
        let id = self
            .gyros
            .push(info)
            .map_err(|_| RegistryError::Full(SensorKind::Gyro))?;
        crate::log_info!("gyro {} registered at {} Hz", id.index(), nominal_rate_hz);
        Ok(id)
    }

    pub fn register_accel(&mut self, nominal_rate_hz: f32, orientation: Rotation) -> Result<InstanceId, RegistryError> {
        let info = SensorInfo {
            nominal_rate_hz,
            orientation,
        };
        let id = self
            .accels
            .push(info)
            .map_err(|_| RegistryError::Full(SensorKind::Accel))?;
        crate::log_info!("accel {} registered at {} Hz", id.index(), nominal_rate_hz);
        Ok(id)
    }

    pub fn gyro_count(&self) -> u8 {
        self.gyros.len() as u8
    }

    pub fn accel_count(&self) -> u8 {
        self.accels.len() as u8
    }

    pub fn gyro_info(&self, id: InstanceId) -> Option<&SensorInfo> {
        self.gyros.get(id)
    }

    pub fn accel_info(&self, id: InstanceId) -> Option<&SensorInfo> {
        self.accels.get(id)
    }

    /// Set by the external arbiter choosing which gyro to trust.
    pub fn set_primary_gyro(&mut self, primary: Option<InstanceId>) {
        if self.primary_gyro != primary {
            crate::log_info!("primary gyro {}", primary.map_or(-1, |id| i32::from(id.index())));
        }
        self.primary_gyro = primary;
    }

    pub fn primary_gyro(&self) -> Option<InstanceId> {
        self.primary_gyro
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn params(&self) -> &InsParams {
        &self.params
    }

    /// Reload configuration. Backends pick up the filter part through
    /// `ImuBackend::set_filter_config`.
    pub fn reload(&mut self, store: &ParameterStore) {
        self.params = InsParams::from_store(store);
    }

    /// Snapshot for one cycle. Take it once and pass it to every pipeline
    /// call of that cycle.
    pub fn timing_context<T: TimeSource>(&self, time: &T) -> SystemTimingContext {
        SystemTimingContext::capture(time, self.armed, self.primary_gyro)
    }

    pub fn filter_config(&self) -> FilterConfig {
        self.params.filter_config()
    }

    pub fn raw_log_config(&self) -> RawLogConfig {
        RawLogConfig {
            options: self.params.raw_log_options,
            gyro_count: self.gyro_count(),
        }
    }

    /// Sampling configuration for the backend pairing `gyro` and `accel`,
    /// with calibration loaded from `store`.
    pub fn sampler_config(
        &self,
        gyro: InstanceId,
        accel: InstanceId,
        store: &ParameterStore,
    ) -> Result<SamplerConfig, RegistryError> {
        let gyro_info = self
            .gyros
            .get(gyro)
            .ok_or(RegistryError::Unregistered(SensorKind::Gyro, gyro))?;
        let accel_info = self
            .accels
            .get(accel)
            .ok_or(RegistryError::Unregistered(SensorKind::Accel, accel))?;

        let mut correction = CorrectionStage::new();
        correction.gyro_orientation = gyro_info.orientation;
        correction.accel_orientation = accel_info.orientation;
        correction.board_orientation = self.params.board_orientation;

        let accel_cal = CalibrationParams::from_store(store, accel);
        correction.accel_offset = accel_cal.accel_offset;
        correction.accel_scale = accel_cal.accel_scale;
        correction.gyro_offset = CalibrationParams::from_store(store, gyro).gyro_offset;

        let mut config = SamplerConfig::new(gyro_info.nominal_rate_hz, accel_info.nominal_rate_hz);
        config.correction = correction;
        config.raw_log = self.raw_log_config();
        config.drives_heater = self.params.heater_instance == Some(accel.index());
        Ok(config)
    }
}
