//! Orientation and calibration correction of raw sensor vectors.
//!
//! Pipeline order is fixed:
//!
//! ```text
//! sensor rotation -> [temperature learning] -> temperature curve,
//! offset, scale (accel only) -> board rotation
//! ```
//!
//! Rotations always run. Offset, scale and temperature correction are
//! bypassed while the matching calibration is collecting samples.

use crate::parameters::CalibrationParams;
use crate::rotation::Rotation;
use nalgebra::Vector3;

/// Online temperature-calibration learner fed with sensor-frame samples.
pub trait TemperatureLearning {
    fn update_accel_learning(&mut self, accel: &Vector3<f32>, temperature_c: f32);
    fn update_gyro_learning(&mut self, gyro: &Vector3<f32>, temperature_c: f32);
}

/// Third-order polynomial temperature drift model about 35 °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureCurve {
    pub enabled: bool,
    /// First, second and third order coefficients per axis.
    pub coefficients: [Vector3<f32>; 3],
    /// Temperature at which offsets were calibrated.
    pub calibration_temp_c: f32,
    pub min_temp_c: f32,
    pub max_temp_c: f32,
}

impl TemperatureCurve {
    pub const REFERENCE_TEMP_C: f32 = 35.0;

    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            coefficients: [Vector3::new(0.0, 0.0, 0.0); 3],
            calibration_temp_c: Self::REFERENCE_TEMP_C,
            min_temp_c: -70.0,
            max_temp_c: 80.0,
        }
    }

    fn eval(&self, temperature_c: f32) -> Vector3<f32> {
        let t = temperature_c.clamp(self.min_temp_c, self.max_temp_c) - Self::REFERENCE_TEMP_C;
        let [c1, c2, c3] = self.coefficients;
        c1 * t + c2 * (t * t) + c3 * (t * t * t)
    }

    /// Drift at `temperature_c` relative to the calibration temperature.
    pub fn drift(&self, temperature_c: f32) -> Vector3<f32> {
        if !self.enabled {
            return Vector3::zeros();
        }
        self.eval(temperature_c) - self.eval(self.calibration_temp_c)
    }
}

impl Default for TemperatureCurve {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Per-backend correction configuration and calibration state.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionStage {
    pub accel_orientation: Rotation,
    pub gyro_orientation: Rotation,
    pub board_orientation: Rotation,
    /// Accelerometer offset (m/s²), subtracted before scaling.
    pub accel_offset: Vector3<f32>,
    pub accel_scale: Vector3<f32>,
    /// Gyroscope offset (rad/s).
    pub gyro_offset: Vector3<f32>,
    pub accel_temp_curve: TemperatureCurve,
    pub gyro_temp_curve: TemperatureCurve,
    pub calibrating_accel: bool,
    pub calibrating_gyro: bool,
    /// Latest sensor temperature (°C).
    pub temperature_c: f32,
}

impl Default for CorrectionStage {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectionStage {
    /// Identity correction: no rotation, zero offsets, unit scale.
    pub const fn new() -> Self {
        Self {
            accel_orientation: Rotation::None,
            gyro_orientation: Rotation::None,
            board_orientation: Rotation::None,
            accel_offset: Vector3::new(0.0, 0.0, 0.0),
            accel_scale: Vector3::new(1.0, 1.0, 1.0),
            gyro_offset: Vector3::new(0.0, 0.0, 0.0),
            accel_temp_curve: TemperatureCurve::disabled(),
            gyro_temp_curve: TemperatureCurve::disabled(),
            calibrating_accel: false,
            calibrating_gyro: false,
            temperature_c: TemperatureCurve::REFERENCE_TEMP_C,
        }
    }

    /// Load offsets and scales from stored calibration.
    pub fn apply_calibration(&mut self, cal: &CalibrationParams) {
        self.accel_offset = cal.accel_offset;
        self.accel_scale = cal.accel_scale;
        self.gyro_offset = cal.gyro_offset;
    }

    pub fn correct_accel(
        &self,
        accel: &Vector3<f32>,
        learner: Option<&mut (dyn TemperatureLearning + '_)>,
    ) -> Vector3<f32> {
        let mut v = self.accel_orientation.rotate(accel);

        if let Some(learner) = learner {
            learner.update_accel_learning(&v, self.temperature_c);
        }

        if !self.calibrating_accel {
            v -= self.accel_temp_curve.drift(self.temperature_c);
            v -= self.accel_offset;
            v.component_mul_assign(&self.accel_scale);
        }

        self.board_orientation.rotate(&v)
    }

    pub fn correct_gyro(
        &self,
        gyro: &Vector3<f32>,
        learner: Option<&mut (dyn TemperatureLearning + '_)>,
    ) -> Vector3<f32> {
        let mut v = self.gyro_orientation.rotate(gyro);

        if let Some(learner) = learner {
            learner.update_gyro_learning(&v, self.temperature_c);
        }

        if !self.calibrating_gyro {
            v -= self.gyro_temp_curve.drift(self.temperature_c);
            v -= self.gyro_offset;
        }

        self.board_orientation.rotate(&v)
    }

    /// Sensor-frame rotation only, for taps that want oriented but
    /// uncorrected data.
    pub fn orient_accel(&self, accel: &Vector3<f32>) -> Vector3<f32> {
        self.accel_orientation.rotate(accel)
    }

    pub fn orient_gyro(&self, gyro: &Vector3<f32>) -> Vector3<f32> {
        self.gyro_orientation.rotate(gyro)
    }

    /// Remove the board rotation from a body-frame vector.
    pub fn derotate_board(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.board_orientation.rotate_inverse(v)
    }
}
