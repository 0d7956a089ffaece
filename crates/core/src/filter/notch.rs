//! Single notch (band-stop) biquad over 3-axis samples.

use core::f32::consts::PI;
use nalgebra::Vector3;

/// Attenuation gain and quality factor for a notch of the given centre,
/// bandwidth and depth. `q` is zero when the bandwidth is too wide for
/// the centre frequency.
pub fn attenuation_and_q(center_freq_hz: f32, bandwidth_hz: f32, attenuation_db: f32) -> (f32, f32) {
    let a = libm::powf(10.0, -attenuation_db / 40.0);
    let half_bw = bandwidth_hz * 0.5;
    let q = if center_freq_hz > half_bw {
        let octaves = libm::log2f(center_freq_hz / (center_freq_hz - half_bw)) * 2.0;
        let pow = libm::powf(2.0, octaves);
        libm::sqrtf(pow) / (pow - 1.0)
    } else {
        0.0
    };
    (a, q)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NotchCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    a0_inv: f32,
}

/// Notch filter stage.
///
/// An uninitialised or reset filter copies its input straight to the
/// output and seeds its history with it, so the first filtered sample
/// after activation matches the input.
#[derive(Debug, Clone, Copy)]
pub struct NotchFilter {
    coefficients: Option<NotchCoefficients>,
    center_freq_hz: f32,
    needs_reset: bool,
    input: [Vector3<f32>; 3],
    output: [Vector3<f32>; 2],
}

impl Default for NotchFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotchFilter {
    pub const fn new() -> Self {
        Self {
            coefficients: None,
            center_freq_hz: 0.0,
            needs_reset: false,
            input: [Vector3::new(0.0, 0.0, 0.0); 3],
            output: [Vector3::new(0.0, 0.0, 0.0); 2],
        }
    }

    /// Configure from centre, bandwidth and attenuation.
    pub fn init(&mut self, sample_freq_hz: f32, center_freq_hz: f32, bandwidth_hz: f32, attenuation_db: f32) {
        let (a, q) = attenuation_and_q(center_freq_hz, bandwidth_hz, attenuation_db);
        self.init_with_a_and_q(sample_freq_hz, center_freq_hz, a, q);
    }

    /// Configure from precomputed gain and quality factor. Existing
    /// history is kept so retuning does not glitch the output.
    pub fn init_with_a_and_q(&mut self, sample_freq_hz: f32, center_freq_hz: f32, a: f32, q: f32) {
        if center_freq_hz > 0.0 && center_freq_hz < 0.5 * sample_freq_hz && q > 0.0 {
            let omega = 2.0 * PI * center_freq_hz / sample_freq_hz;
            let alpha = libm::sinf(omega) / (2.0 * q);
            let b1 = -2.0 * libm::cosf(omega);
            self.coefficients = Some(NotchCoefficients {
                b0: 1.0 + alpha * a * a,
                b1,
                b2: 1.0 - alpha * a * a,
                a1: b1,
                a2: 1.0 - alpha,
                a0_inv: 1.0 / (1.0 + alpha),
            });
            self.center_freq_hz = center_freq_hz;
        } else {
            self.coefficients = None;
            self.center_freq_hz = 0.0;
        }
    }

    pub fn is_active(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn center_freq_hz(&self) -> f32 {
        self.center_freq_hz
    }

    pub fn apply(&mut self, sample: Vector3<f32>) -> Vector3<f32> {
        let c = match self.coefficients {
            Some(c) if !self.needs_reset => c,
            _ => {
                self.input = [sample; 3];
                self.output = [sample; 2];
                self.needs_reset = false;
                return sample;
            }
        };

        self.input = [sample, self.input[0], self.input[1]];
        let [x0, x1, x2] = self.input;
        let [y1, y2] = self.output;
        let out = (x0 * c.b0 + x1 * c.b1 + x2 * c.b2 - y1 * c.a1 - y2 * c.a2) * c.a0_inv;
        self.output = [out, y1];
        out
    }

    pub fn reset(&mut self) {
        self.needs_reset = true;
    }
}
