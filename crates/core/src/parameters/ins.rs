//! Inertial Sensor Parameter Definitions
//!
//! # Parameters
//!
//! - `INS_GYRO_FILTER` / `INS_ACCEL_FILTER` - low-pass cutoffs (Hz)
//! - `INS_HNTCH_*` / `INS_HNTC2_*` - harmonic notch sets
//! - `INS_RAW_LOG_OPT` - raw sample logging options
//! - `FFT_ENABLE`, `FFT_WINDOW_SIZE`, `FFT_PHASE`, `FFT_LPF` - analysis tap
//! - `INS_HEAT_IMU` - instance whose temperature drives the heater (-1: none)
//! - `AHRS_ORIENTATION` - board mounting orientation

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};
use crate::filter::{FftConfig, FilterConfig, HarmonicNotchOptions, HarmonicNotchParams, MAX_NOTCH_SETS};
use crate::rotation::Rotation;
use bitflags::bitflags;

bitflags! {
    /// `INS_RAW_LOG_OPT` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RawLoggingOptions: u8 {
        const PRIMARY_GYRO_ONLY = 1 << 0;
        const ALL_GYROS = 1 << 1;
        const POST_FILTER = 1 << 2;
        const PRE_AND_POST_FILTER = 1 << 3;
    }
}

struct NotchNames {
    enable: &'static str,
    freq: &'static str,
    bandwidth: &'static str,
    attenuation: &'static str,
    harmonics: &'static str,
    options: &'static str,
}

const NOTCH_NAMES: [NotchNames; MAX_NOTCH_SETS] = [
    NotchNames {
        enable: "INS_HNTCH_ENABLE",
        freq: "INS_HNTCH_FREQ",
        bandwidth: "INS_HNTCH_BW",
        attenuation: "INS_HNTCH_ATT",
        harmonics: "INS_HNTCH_HMNCS",
        options: "INS_HNTCH_OPTS",
    },
    NotchNames {
        enable: "INS_HNTC2_ENABLE",
        freq: "INS_HNTC2_FREQ",
        bandwidth: "INS_HNTC2_BW",
        attenuation: "INS_HNTC2_ATT",
        harmonics: "INS_HNTC2_HMNCS",
        options: "INS_HNTC2_OPTS",
    },
];

const DEFAULT_FILTER_HZ: f32 = 20.0;
const DEFAULT_FFT_WINDOW: i32 = 32;

/// Inertial sensor parameters loaded from parameter store
#[derive(Debug, Clone, Copy)]
pub struct InsParams {
    pub gyro_filter_hz: f32,
    pub accel_filter_hz: f32,
    pub notches: [HarmonicNotchParams; MAX_NOTCH_SETS],
    pub raw_log_options: RawLoggingOptions,
    pub fft: FftConfig,
    pub heater_instance: Option<u8>,
    pub board_orientation: Rotation,
}

impl InsParams {
    /// Register inertial sensor parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register("INS_GYRO_FILTER", ParamValue::Float(DEFAULT_FILTER_HZ), ParamFlags::empty())?;
        store.register("INS_ACCEL_FILTER", ParamValue::Float(DEFAULT_FILTER_HZ), ParamFlags::empty())?;

        let defaults = HarmonicNotchParams::disabled();
        for names in &NOTCH_NAMES {
            store.register(names.enable, ParamValue::Int(0), ParamFlags::empty())?;
            store.register(names.freq, ParamValue::Float(defaults.center_freq_hz), ParamFlags::empty())?;
            store.register(names.bandwidth, ParamValue::Float(defaults.bandwidth_hz), ParamFlags::empty())?;
            store.register(names.attenuation, ParamValue::Float(defaults.attenuation_db), ParamFlags::empty())?;
            store.register(names.harmonics, ParamValue::Int(i32::from(defaults.harmonics)), ParamFlags::empty())?;
            store.register(names.options, ParamValue::Int(0), ParamFlags::empty())?;
        }

        store.register("INS_RAW_LOG_OPT", ParamValue::Int(0), ParamFlags::empty())?;

        store.register("FFT_ENABLE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("FFT_WINDOW_SIZE", ParamValue::Int(DEFAULT_FFT_WINDOW), ParamFlags::empty())?;
        store.register("FFT_PHASE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("FFT_LPF", ParamValue::Int(0), ParamFlags::empty())?;

        store.register("INS_HEAT_IMU", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("AHRS_ORIENTATION", ParamValue::Int(0), ParamFlags::empty())?;

        Ok(())
    }

    /// Load inertial sensor parameters, falling back to defaults for
    /// missing or out-of-range values
    pub fn from_store(store: &ParameterStore) -> Self {
        let mut notches = [HarmonicNotchParams::disabled(); MAX_NOTCH_SETS];
        for (notch, names) in notches.iter_mut().zip(NOTCH_NAMES.iter()) {
            let defaults = HarmonicNotchParams::disabled();
            *notch = HarmonicNotchParams {
                enabled: store.get_bool(names.enable, false),
                center_freq_hz: store.get_f32(names.freq, defaults.center_freq_hz),
                bandwidth_hz: store.get_f32(names.bandwidth, defaults.bandwidth_hz),
                attenuation_db: store.get_f32(names.attenuation, defaults.attenuation_db),
                harmonics: u8::try_from(store.get_i32(names.harmonics, 1)).unwrap_or(1),
                options: HarmonicNotchOptions::from_bits_retain(
                    u16::try_from(store.get_i32(names.options, 0)).unwrap_or(0),
                ),
                inactive: false,
            };
        }

        let raw_log_options = RawLoggingOptions::from_bits_retain(
            u8::try_from(store.get_i32("INS_RAW_LOG_OPT", 0)).unwrap_or(0),
        );

        let fft = FftConfig {
            enabled: store.get_bool("FFT_ENABLE", false),
            window_size: u16::try_from(store.get_i32("FFT_WINDOW_SIZE", DEFAULT_FFT_WINDOW))
                .unwrap_or(0),
            phase: u8::try_from(store.get_i32("FFT_PHASE", 0)).unwrap_or(0),
            post_filter: store.get_bool("FFT_LPF", false),
        };

        let heater_instance = u8::try_from(store.get_i32("INS_HEAT_IMU", 0)).ok();
        let board_orientation =
            Rotation::from_param(store.get_i32("AHRS_ORIENTATION", 0)).unwrap_or_default();

        Self {
            gyro_filter_hz: store.get_f32("INS_GYRO_FILTER", DEFAULT_FILTER_HZ),
            accel_filter_hz: store.get_f32("INS_ACCEL_FILTER", DEFAULT_FILTER_HZ),
            notches,
            raw_log_options,
            fft,
            heater_instance,
            board_orientation,
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            gyro_cutoff_hz: self.gyro_filter_hz,
            accel_cutoff_hz: self.accel_filter_hz,
            notches: self.notches,
            fft: self.fft,
        }
    }
}
