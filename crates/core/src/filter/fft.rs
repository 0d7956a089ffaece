//! Gyro capture window feeding an external spectral analyser.

use super::lowpass::LowPassFilter2p;
use heapless::HistoryBuf;
use nalgebra::Vector3;

/// Largest capture window per instance.
pub const FFT_WINDOW_CAPACITY: usize = 128;

/// Where and how gyro samples are tapped for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FftConfig {
    pub enabled: bool,
    /// Samples kept in the window; zero tracks only the latest sample.
    pub window_size: u16,
    /// Chain position of the tap: 0 before the notches, `n` after the
    /// n-th enabled notch.
    pub phase: u8,
    /// Run tapped samples through a dedicated low-pass first.
    pub post_filter: bool,
}

impl FftConfig {
    pub fn window_len(&self) -> usize {
        usize::from(self.window_size).min(FFT_WINDOW_CAPACITY)
    }
}

pub struct FftCapture {
    window: HistoryBuf<Vector3<f32>, FFT_WINDOW_CAPACITY>,
    lpf: LowPassFilter2p,
    last_sample: Vector3<f32>,
}

impl Default for FftCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl FftCapture {
    pub fn new() -> Self {
        Self {
            window: HistoryBuf::new(),
            lpf: LowPassFilter2p::new(),
            last_sample: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Record `sample` if `phase` is the configured tap point.
    pub fn capture(&mut self, config: &FftConfig, phase: u8, sample: Vector3<f32>) {
        if !config.enabled || config.phase != phase {
            return;
        }
        if config.window_len() == 0 {
            self.last_sample = sample;
            return;
        }
        let sample = if config.post_filter {
            self.lpf.apply(sample)
        } else {
            sample
        };
        self.window.write(sample);
        self.last_sample = sample;
    }

    pub fn last_sample(&self) -> Vector3<f32> {
        self.last_sample
    }

    /// Up to `config.window_len()` most recent samples, oldest first.
    pub fn window<'a>(&'a self, config: &FftConfig) -> impl Iterator<Item = &'a Vector3<f32>> + 'a {
        let skip = self.window.len().saturating_sub(config.window_len());
        self.window.oldest_ordered().skip(skip)
    }

    pub fn set_cutoff_frequency(&mut self, sample_freq_hz: f32, cutoff_freq_hz: f32) {
        self.lpf.set_cutoff_frequency(sample_freq_hz, cutoff_freq_hz);
    }

    pub fn reset(&mut self) {
        self.lpf.reset();
    }
}
