//! Gyro and accel filtering.

pub mod chain;
pub mod fft;
pub mod harmonic;
pub mod lowpass;
pub mod notch;

pub use chain::{AccelFilterChain, FilterConfig, FilterOutput, GyroFilterChain};
pub use fft::{FftCapture, FftConfig, FFT_WINDOW_CAPACITY};
pub use harmonic::{
    HarmonicNotchFilter, HarmonicNotchOptions, HarmonicNotchParams, MAX_HARMONICS, MAX_NOTCH_SETS,
};
pub use lowpass::LowPassFilter2p;
pub use notch::NotchFilter;
