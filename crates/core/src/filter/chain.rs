//! Per-instance gyro and accel filter cascades.
//!
//! Gyro: FFT tap, harmonic notch sets (each followed by a tap), low-pass.
//! Accel: low-pass only. Either chain resets every stage and holds its
//! previous output when a cycle produces a non-finite value.

use super::fft::{FftCapture, FftConfig};
use super::harmonic::{HarmonicNotchFilter, HarmonicNotchParams, MAX_NOTCH_SETS};
use super::lowpass::LowPassFilter2p;
use crate::integrator::is_finite;
use nalgebra::Vector3;

/// Filter configuration shared by every instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    pub gyro_cutoff_hz: f32,
    pub accel_cutoff_hz: f32,
    pub notches: [HarmonicNotchParams; MAX_NOTCH_SETS],
    pub fft: FftConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gyro_cutoff_hz: 20.0,
            accel_cutoff_hz: 20.0,
            notches: [HarmonicNotchParams::disabled(); MAX_NOTCH_SETS],
            fft: FftConfig::default(),
        }
    }
}

/// Result of pushing one sample through a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOutput {
    pub value: Vector3<f32>,
    /// The chain produced a non-finite value and was reset; `value` is
    /// the previous output.
    pub recovered: bool,
}

pub struct GyroFilterChain {
    lpf: LowPassFilter2p,
    notches: [HarmonicNotchFilter; MAX_NOTCH_SETS],
    fft: FftCapture,
    filtered: Vector3<f32>,
    last_cutoff_hz: Option<f32>,
}

impl Default for GyroFilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl GyroFilterChain {
    pub fn new() -> Self {
        Self {
            lpf: LowPassFilter2p::new(),
            notches: [HarmonicNotchFilter::new(); MAX_NOTCH_SETS],
            fft: FftCapture::new(),
            filtered: Vector3::zeros(),
            last_cutoff_hz: None,
        }
    }

    pub fn apply(&mut self, config: &FilterConfig, is_primary: bool, gyro: Vector3<f32>) -> FilterOutput {
        let mut phase = 0u8;
        self.fft.capture(&config.fft, phase, gyro);

        let mut value = gyro;
        for (params, notch) in config.notches.iter().zip(self.notches.iter_mut()) {
            if !params.enabled {
                continue;
            }
            if params.runs_on(is_primary) {
                value = notch.apply(value);
            } else {
                // restart from the first input when it becomes active again
                notch.reset();
            }
            phase += 1;
            self.fft.capture(&config.fft, phase, value);
        }

        value = self.lpf.apply(value);

        if !is_finite(&value) {
            self.reset();
            return FilterOutput {
                value: self.filtered,
                recovered: true,
            };
        }
        self.filtered = value;
        FilterOutput {
            value,
            recovered: false,
        }
    }

    /// Retune the low-pass when its cutoff changed or sensors are still
    /// converging; retune enabled notches on the same terms. Returns
    /// whether the low-pass was retuned.
    pub fn update_filters(&mut self, config: &FilterConfig, sample_rate_hz: f32, converging: bool) -> bool {
        let mut retuned = false;
        if self.last_cutoff_hz != Some(config.gyro_cutoff_hz) || converging {
            self.lpf.set_cutoff_frequency(sample_rate_hz, config.gyro_cutoff_hz);
            self.fft.set_cutoff_frequency(sample_rate_hz, config.gyro_cutoff_hz);
            self.last_cutoff_hz = Some(config.gyro_cutoff_hz);
            retuned = true;
        }

        for (params, notch) in config.notches.iter().zip(self.notches.iter_mut()) {
            if params.enabled {
                notch.update_params(params, sample_rate_hz, converging);
            }
        }
        retuned
    }

    pub fn reset(&mut self) {
        self.lpf.reset();
        self.fft.reset();
        for notch in &mut self.notches {
            notch.reset();
        }
    }

    /// Last finite output.
    pub fn filtered(&self) -> Vector3<f32> {
        self.filtered
    }

    pub fn fft(&self) -> &FftCapture {
        &self.fft
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccelFilterChain {
    lpf: LowPassFilter2p,
    filtered: Vector3<f32>,
    last_cutoff_hz: Option<f32>,
}

impl Default for AccelFilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelFilterChain {
    pub const fn new() -> Self {
        Self {
            lpf: LowPassFilter2p::new(),
            filtered: Vector3::new(0.0, 0.0, 0.0),
            last_cutoff_hz: None,
        }
    }

    pub fn apply(&mut self, accel: Vector3<f32>) -> FilterOutput {
        let value = self.lpf.apply(accel);
        if !is_finite(&value) {
            self.lpf.reset();
            return FilterOutput {
                value: self.filtered,
                recovered: true,
            };
        }
        self.filtered = value;
        FilterOutput {
            value,
            recovered: false,
        }
    }

    pub fn update_filters(&mut self, config: &FilterConfig, sample_rate_hz: f32, converging: bool) -> bool {
        if self.last_cutoff_hz == Some(config.accel_cutoff_hz) && !converging {
            return false;
        }
        self.lpf.set_cutoff_frequency(sample_rate_hz, config.accel_cutoff_hz);
        self.last_cutoff_hz = Some(config.accel_cutoff_hz);
        true
    }

    pub fn filtered(&self) -> Vector3<f32> {
        self.filtered
    }
}
