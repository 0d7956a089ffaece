//! Second-order Butterworth low-pass filter over 3-axis samples.

use core::f32::consts::{FRAC_PI_4, PI};
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoefficients {
    fn butterworth(sample_freq_hz: f32, cutoff_freq_hz: f32) -> Self {
        let fr = sample_freq_hz / cutoff_freq_hz;
        let ohm = libm::tanf(PI / fr);
        let ohm_sq = ohm * ohm;
        let k = 2.0 * libm::cosf(FRAC_PI_4) * ohm;
        let c = 1.0 + k + ohm_sq;

        let b0 = ohm_sq / c;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (ohm_sq - 1.0) / c,
            a2: (1.0 - k + ohm_sq) / c,
        }
    }

    /// Delay-element value at steady state for a constant input of 1.
    fn dc_delay(&self) -> f32 {
        1.0 / (1.0 + self.a1 + self.a2)
    }
}

/// Low-pass stage of the filter chain.
///
/// A cutoff of zero, or one at or above Nyquist, turns the filter into a
/// passthrough. After [`reset`](Self::reset) the next input primes the
/// delay line so the output starts at that input.
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter2p {
    coefficients: Option<BiquadCoefficients>,
    cutoff_freq_hz: f32,
    sample_freq_hz: f32,
    delay1: Vector3<f32>,
    delay2: Vector3<f32>,
    primed: bool,
}

impl Default for LowPassFilter2p {
    fn default() -> Self {
        Self::new()
    }
}

impl LowPassFilter2p {
    pub const fn new() -> Self {
        Self {
            coefficients: None,
            cutoff_freq_hz: 0.0,
            sample_freq_hz: 0.0,
            delay1: Vector3::new(0.0, 0.0, 0.0),
            delay2: Vector3::new(0.0, 0.0, 0.0),
            primed: false,
        }
    }

    pub fn set_cutoff_frequency(&mut self, sample_freq_hz: f32, cutoff_freq_hz: f32) {
        self.sample_freq_hz = sample_freq_hz;
        self.cutoff_freq_hz = cutoff_freq_hz;
        self.coefficients = if cutoff_freq_hz > 0.0
            && sample_freq_hz > 0.0
            && cutoff_freq_hz < 0.5 * sample_freq_hz
        {
            Some(BiquadCoefficients::butterworth(sample_freq_hz, cutoff_freq_hz))
        } else {
            None
        };
    }

    pub fn cutoff_frequency(&self) -> f32 {
        self.cutoff_freq_hz
    }

    pub fn sample_frequency(&self) -> f32 {
        self.sample_freq_hz
    }

    pub fn is_passthrough(&self) -> bool {
        self.coefficients.is_none()
    }

    pub fn apply(&mut self, sample: Vector3<f32>) -> Vector3<f32> {
        let Some(c) = self.coefficients else {
            return sample;
        };

        if !self.primed {
            let steady = sample * c.dc_delay();
            self.delay1 = steady;
            self.delay2 = steady;
            self.primed = true;
        }

        let delay0 = sample - self.delay1 * c.a1 - self.delay2 * c.a2;
        let output = delay0 * c.b0 + self.delay1 * c.b1 + self.delay2 * c.b2;
        self.delay2 = self.delay1;
        self.delay1 = delay0;
        output
    }

    pub fn reset(&mut self) {
        self.primed = false;
    }
}
