//! Per-instance calibration parameters
//!
//! Offsets and scales produced by the accel/gyro calibration procedures.
//! Naming follows ArduPilot: the first instance has no number, later
//! instances are numbered from 2 (`INS_ACCOFFS_X`, `INS_ACC2OFFS_X`, ...).

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};
use crate::instance::{InstanceId, MAX_INSTANCES};
use nalgebra::Vector3;

type AxisNames = [&'static str; 3];

const ACCEL_OFFSET: [AxisNames; MAX_INSTANCES] = [
    ["INS_ACCOFFS_X", "INS_ACCOFFS_Y", "INS_ACCOFFS_Z"],
    ["INS_ACC2OFFS_X", "INS_ACC2OFFS_Y", "INS_ACC2OFFS_Z"],
    ["INS_ACC3OFFS_X", "INS_ACC3OFFS_Y", "INS_ACC3OFFS_Z"],
];

const ACCEL_SCALE: [AxisNames; MAX_INSTANCES] = [
    ["INS_ACCSCAL_X", "INS_ACCSCAL_Y", "INS_ACCSCAL_Z"],
    ["INS_ACC2SCAL_X", "INS_ACC2SCAL_Y", "INS_ACC2SCAL_Z"],
    ["INS_ACC3SCAL_X", "INS_ACC3SCAL_Y", "INS_ACC3SCAL_Z"],
];

const GYRO_OFFSET: [AxisNames; MAX_INSTANCES] = [
    ["INS_GYROFFS_X", "INS_GYROFFS_Y", "INS_GYROFFS_Z"],
    ["INS_GYR2OFFS_X", "INS_GYR2OFFS_Y", "INS_GYR2OFFS_Z"],
    ["INS_GYR3OFFS_X", "INS_GYR3OFFS_Y", "INS_GYR3OFFS_Z"],
];

/// Calibration values for one accel/gyro instance pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    /// Accelerometer offset (m/s²)
    pub accel_offset: Vector3<f32>,
    /// Accelerometer scale factors (dimensionless, near 1.0)
    pub accel_scale: Vector3<f32>,
    /// Gyroscope offset (rad/s)
    pub gyro_offset: Vector3<f32>,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            accel_offset: Vector3::zeros(),
            accel_scale: Vector3::new(1.0, 1.0, 1.0),
            gyro_offset: Vector3::zeros(),
        }
    }
}

fn register_axes(store: &mut ParameterStore, names: &AxisNames, value: f32) -> Result<(), ParameterError> {
    for name in names {
        store.register(name, ParamValue::Float(value), ParamFlags::empty())?;
    }
    Ok(())
}

fn read_axes(store: &ParameterStore, names: &AxisNames, default: f32) -> Vector3<f32> {
    Vector3::new(
        store.get_f32(names[0], default),
        store.get_f32(names[1], default),
        store.get_f32(names[2], default),
    )
}

fn write_axes(store: &mut ParameterStore, names: &AxisNames, v: &Vector3<f32>) -> Result<(), ParameterError> {
    for (name, value) in names.iter().zip(v.iter()) {
        store.set(name, ParamValue::Float(*value))?;
    }
    Ok(())
}

impl CalibrationParams {
    /// Register calibration parameters for every instance
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        for i in 0..MAX_INSTANCES {
            register_axes(store, &ACCEL_OFFSET[i], 0.0)?;
            register_axes(store, &ACCEL_SCALE[i], 1.0)?;
            register_axes(store, &GYRO_OFFSET[i], 0.0)?;
        }
        Ok(())
    }

    /// Load calibration for `instance`
    pub fn from_store(store: &ParameterStore, instance: InstanceId) -> Self {
        let i = usize::from(instance.index());
        let mut accel_scale = read_axes(store, &ACCEL_SCALE[i], 1.0);
        // an unset or zeroed scale would erase the axis
        if accel_scale.iter().any(|s| *s <= 0.0) {
            accel_scale = Vector3::new(1.0, 1.0, 1.0);
        }
        Self {
            accel_offset: read_axes(store, &ACCEL_OFFSET[i], 0.0),
            accel_scale,
            gyro_offset: read_axes(store, &GYRO_OFFSET[i], 0.0),
        }
    }

    /// Store calibration results for `instance`
    pub fn save(&self, store: &mut ParameterStore, instance: InstanceId) -> Result<(), ParameterError> {
        let i = usize::from(instance.index());
        write_axes(store, &ACCEL_OFFSET[i], &self.accel_offset)?;
        write_axes(store, &ACCEL_SCALE[i], &self.accel_scale)?;
        write_axes(store, &GYRO_OFFSET[i], &self.gyro_offset)
    }
}
