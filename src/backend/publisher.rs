//! Publishing-context handle: moves pending samples into the published
//! state once per front-end cycle.

use super::{ImuBackend, PublishedSample, SampleState};
use crate::core::traits::SharedState;
use crate::sinks::AccelCalibrator;
use inertial_core::rotation::Rotation;
use inertial_core::timing::SystemTimingContext;
use nalgebra::Vector3;

/// Consumer handle of an [`ImuBackend`].
pub struct ImuPublisher<'a, S> {
    backend: &'a ImuBackend<S>,
    calibrator: Option<&'a mut dyn AccelCalibrator>,
    board_orientation: Rotation,
}

impl<S> Drop for ImuPublisher<'_, S> {
    fn drop(&mut self) {
        if self.calibrator.is_some() {
            self.backend.set_accel_calibrating(false);
        }
    }
}

impl<'a, S: SharedState<SampleState>> ImuPublisher<'a, S> {
    pub(super) fn new(backend: &'a ImuBackend<S>) -> Self {
        Self {
            backend,
            calibrator: None,
            board_orientation: Rotation::None,
        }
    }

    /// Feed published delta velocities to an accel calibration capture.
    /// The calibrator sees them with the board rotation removed, and the
    /// sampler skips offsets and scale while it is collecting.
    pub fn with_accel_calibrator(
        mut self,
        calibrator: &'a mut dyn AccelCalibrator,
        board_orientation: Rotation,
    ) -> Self {
        self.backend.set_accel_calibrating(calibrator.is_collecting());
        self.calibrator = Some(calibrator);
        self.board_orientation = board_orientation;
        self
    }

    /// Publish pending gyro data, then retune the gyro filters.
    pub fn update_gyro(&mut self, ctx: &SystemTimingContext) {
        let backend = self.backend;
        let retuned = backend.state().with_mut(|s| {
            if backend.gyro_killed() {
                return false;
            }
            let gyro = &mut s.gyro;
            if gyro.new_data {
                let (delta, delta_dt) = gyro.accumulator.drain();
                gyro.published = PublishedSample {
                    value: gyro.filters.filtered(),
                    delta,
                    delta_dt,
                    delta_valid: true,
                    healthy: true,
                    sequence: gyro.published.sequence.wrapping_add(1),
                };
                gyro.fft_sample = gyro.filters.fft().last_sample();
                gyro.new_data = false;
            }
            gyro.filters
                .update_filters(&s.filter_config, gyro.sample_rate_hz, ctx.is_converging)
        });

        if retuned && !ctx.is_converging {
            crate::log_debug!("gyro {} filters retuned", self.backend.gyro_instance().index());
        }
    }

    /// Publish pending accel data, then retune the accel filter.
    pub fn update_accel(&mut self, ctx: &SystemTimingContext) {
        let backend = self.backend;
        let collecting = match self.calibrator.as_deref() {
            Some(calibrator) => {
                let collecting = calibrator.is_collecting();
                backend.set_accel_calibrating(collecting);
                collecting
            }
            None => false,
        };
        let board = self.board_orientation;

        let (calibration_sample, retuned) = backend.state().with_mut(|s| {
            if backend.accel_killed() {
                return (None, false);
            }
            let accel = &mut s.accel;
            let mut calibration_sample = None;
            if accel.new_data {
                let (delta, delta_dt) = accel.accumulator.drain();
                accel.published = PublishedSample {
                    value: accel.filters.filtered(),
                    delta,
                    delta_dt,
                    delta_valid: true,
                    healthy: true,
                    sequence: accel.published.sequence.wrapping_add(1),
                };
                accel.new_data = false;
                if collecting {
                    calibration_sample = Some((board.rotate_inverse(&delta), delta_dt));
                }
            }
            let retuned = accel
                .filters
                .update_filters(&s.filter_config, accel.sample_rate_hz, ctx.is_converging);
            (calibration_sample, retuned)
        });

        if let (Some((delta, dt)), Some(calibrator)) = (calibration_sample, self.calibrator.as_deref_mut()) {
            calibrator.new_sample(&delta, dt);
        }
        if retuned && !ctx.is_converging {
            crate::log_debug!("accel {} filter retuned", self.backend.accel_instance().index());
        }
    }

    pub fn gyro(&self) -> PublishedSample {
        self.backend.state().with(|s| s.gyro.published)
    }

    pub fn accel(&self) -> PublishedSample {
        self.backend.state().with(|s| s.accel.published)
    }

    /// Sample last captured for vibration analysis, as of the latest
    /// gyro publish.
    pub fn gyro_fft_sample(&self) -> Vector3<f32> {
        self.backend.state().with(|s| s.gyro.fft_sample)
    }

    /// Latest die temperature, if the driver reports one.
    pub fn temperature(&self) -> Option<f32> {
        self.backend.state().with(|s| s.temperature_c)
    }

    pub fn gyro_rate_hz(&self) -> f32 {
        self.backend.state().with(|s| s.gyro.sample_rate_hz)
    }

    pub fn accel_rate_hz(&self) -> f32 {
        self.backend.state().with(|s| s.accel.sample_rate_hz)
    }

    pub fn gyro_error_count(&self) -> u32 {
        self.backend.state().with(|s| s.gyro.error_count)
    }

    pub fn accel_error_count(&self) -> u32 {
        self.backend.state().with(|s| s.accel.error_count)
    }
}
