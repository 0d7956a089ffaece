//! Harmonic notch: one notch per selected harmonic of a fundamental.

use super::notch::{attenuation_and_q, NotchFilter};
use bitflags::bitflags;
use nalgebra::Vector3;

/// Highest harmonic a single harmonic notch can track.
pub const MAX_HARMONICS: usize = 8;

/// Number of independently configured harmonic notch sets.
pub const MAX_NOTCH_SETS: usize = 2;

bitflags! {
    /// `INS_HNTCH_OPTS` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HarmonicNotchOptions: u16 {
        /// Run on every instance instead of only the primary.
        const ENABLE_ON_ALL_IMUS = 1 << 3;
    }
}

/// Configuration of one harmonic notch set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicNotchParams {
    pub enabled: bool,
    pub center_freq_hz: f32,
    pub bandwidth_hz: f32,
    pub attenuation_db: f32,
    /// Bit `n` selects harmonic `n + 1`.
    pub harmonics: u8,
    pub options: HarmonicNotchOptions,
    /// Temporarily suspended by the tracking source.
    pub inactive: bool,
}

impl HarmonicNotchParams {
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            center_freq_hz: 80.0,
            bandwidth_hz: 40.0,
            attenuation_db: 40.0,
            harmonics: 1,
            options: HarmonicNotchOptions::empty(),
            inactive: false,
        }
    }

    /// Whether the notch filters this instance's data on this cycle.
    /// Enabled notches that do not run are reset instead.
    pub fn runs_on(&self, is_primary: bool) -> bool {
        self.enabled
            && !self.inactive
            && (is_primary || self.options.contains(HarmonicNotchOptions::ENABLE_ON_ALL_IMUS))
    }
}

impl Default for HarmonicNotchParams {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tuning {
    center_freq_hz: f32,
    bandwidth_hz: f32,
    attenuation_db: f32,
    harmonics: u8,
}

/// Per-instance runtime state of one harmonic notch set.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicNotchFilter {
    notches: [NotchFilter; MAX_HARMONICS],
    harmonics: u8,
    tuning: Option<Tuning>,
}

impl HarmonicNotchFilter {
    pub const fn new() -> Self {
        Self {
            notches: [NotchFilter::new(); MAX_HARMONICS],
            harmonics: 0,
            tuning: None,
        }
    }

    /// Retune to `params` at `sample_freq_hz`. Does nothing when the
    /// configured tuning is unchanged unless sensors are converging; drift
    /// of the sample rate estimate alone never retunes. Returns whether the
    /// notches were retuned.
    pub fn update_params(
        &mut self,
        params: &HarmonicNotchParams,
        sample_freq_hz: f32,
        converging: bool,
    ) -> bool {
        let tuning = Tuning {
            center_freq_hz: params.center_freq_hz,
            bandwidth_hz: params.bandwidth_hz,
            attenuation_db: params.attenuation_db,
            harmonics: params.harmonics,
        };
        if !converging && self.tuning == Some(tuning) {
            return false;
        }

        // Q is shared by every harmonic so bandwidth grows with the harmonic.
        let (a, q) = attenuation_and_q(
            params.center_freq_hz,
            params.bandwidth_hz,
            params.attenuation_db,
        );
        for (h, notch) in self.notches.iter_mut().enumerate() {
            if params.harmonics & (1 << h) != 0 {
                let center = params.center_freq_hz * (h + 1) as f32;
                notch.init_with_a_and_q(sample_freq_hz, center, a, q);
            }
        }
        self.harmonics = params.harmonics;
        self.tuning = Some(tuning);
        true
    }

    pub fn apply(&mut self, sample: Vector3<f32>) -> Vector3<f32> {
        let harmonics = self.harmonics;
        self.notches
            .iter_mut()
            .enumerate()
            .filter(|(h, _)| harmonics & (1 << h) != 0)
            .fold(sample, |v, (_, notch)| notch.apply(v))
    }

    pub fn reset(&mut self) {
        for notch in &mut self.notches {
            notch.reset();
        }
    }

    /// Number of harmonics currently filtering (below Nyquist).
    pub fn active_notches(&self) -> usize {
        self.notches
            .iter()
            .enumerate()
            .filter(|(h, n)| self.harmonics & (1 << h) != 0 && n.is_active())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    fn params(harmonics: u8) -> HarmonicNotchParams {
        HarmonicNotchParams {
            enabled: true,
            harmonics,
            ..HarmonicNotchParams::disabled()
        }
    }

    fn tone_peak(filter: &mut HarmonicNotchFilter, freq_hz: f32) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..4000 {
            let x = libm::sinf(2.0 * PI * freq_hz * i as f32 / 1000.0);
            let out = filter.apply(Vector3::new(0.0, x, 0.0));
            if i > 3000 {
                peak = peak.max(out.y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_rejects_selected_harmonics() {
        let mut filter = HarmonicNotchFilter::new();
        filter.update_params(&params(0b11), 1000.0, false);
        assert_eq!(filter.active_notches(), 2);
        assert!(tone_peak(&mut filter, 80.0) < 0.05);
        filter.reset();
        assert!(tone_peak(&mut filter, 160.0) < 0.05);
    }

    #[test]
    fn test_unselected_harmonic_passes() {
        let mut filter = HarmonicNotchFilter::new();
        filter.update_params(&params(0b01), 1000.0, false);
        assert!(tone_peak(&mut filter, 160.0) > 0.5);
    }

    #[test]
    fn test_harmonics_above_nyquist_are_disabled() {
        let mut filter = HarmonicNotchFilter::new();
        // 80, 160, 240 Hz at 400 Hz sample rate: only 80 and 160 fit
        filter.update_params(&params(0b111), 400.0, false);
        assert_eq!(filter.active_notches(), 2);
    }

    #[test]
    fn test_retunes_only_on_change_or_convergence() {
        let mut filter = HarmonicNotchFilter::new();
        let p = params(0b01);
        assert!(filter.update_params(&p, 1000.0, false));
        assert!(!filter.update_params(&p, 1000.0, false));
        assert!(filter.update_params(&p, 1000.0, true));

        let moved = HarmonicNotchParams { center_freq_hz: 90.0, ..p };
        assert!(filter.update_params(&moved, 1010.0, false));
    }

    #[test]
    fn test_rate_estimate_drift_does_not_retune() {
        let mut filter = HarmonicNotchFilter::new();
        let p = params(0b01);
        assert!(filter.update_params(&p, 1000.0, false));
        assert!(!filter.update_params(&p, 1000.02, false));
        assert!(!filter.update_params(&p, 1010.0, false));
        assert!(filter.update_params(&p, 1010.0, true));
    }

    #[test]
    fn test_runs_only_on_primary_unless_all_imus() {
        let p = params(1);
        assert!(p.runs_on(true));
        assert!(!p.runs_on(false));

        let all = HarmonicNotchParams {
            options: HarmonicNotchOptions::ENABLE_ON_ALL_IMUS,
            ..p
        };
        assert!(all.runs_on(false));

        let inactive = HarmonicNotchParams { inactive: true, ..all };
        assert!(!inactive.runs_on(true));
        assert!(!HarmonicNotchParams::disabled().runs_on(true));
    }
}
