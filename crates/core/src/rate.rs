//! Sample rate tracking and per-sample `dt` derivation.
//!
//! FIFO sensors produce samples at a fixed rate, but the sensor's clock
//! drifts against the host clock. [`SampleRateEstimator`] slowly pulls the
//! nominal rate toward the rate observed over one-second windows.
//! [`ChannelTiming`] turns each arriving sample into a [`SampleStep`],
//! choosing between timestamp deltas and the estimated rate.

/// Minimum observation window before the rate estimate moves (1 s).
pub const RATE_WINDOW_US: u64 = 1_000_000;

/// Samples that rely on the estimated rate are dropped below this (Hz).
pub const MIN_SAMPLE_RATE_HZ: f32 = 40.0;

/// A gap longer than this since the previous sample means the accumulated
/// data is stale (100 ms).
pub const STALE_SAMPLE_US: u64 = 100_000;

/// Blending and clamping used when folding one window into the estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RateTracking {
    filter_constant: f32,
    lower_limit: f32,
    upper_limit: f32,
}

const TRACKING_SETTLED: RateTracking = RateTracking {
    filter_constant: 0.98,
    lower_limit: 0.95,
    upper_limit: 1.05,
};

const TRACKING_CONVERGING: RateTracking = RateTracking {
    filter_constant: 0.8,
    lower_limit: 0.5,
    upper_limit: 2.0,
};

/// Adaptive estimate of one instance's true sample rate.
#[derive(Debug, Clone, Copy)]
pub struct SampleRateEstimator {
    sample_count: u16,
    window_start_us: Option<u64>,
    estimated_rate_hz: f32,
}

impl SampleRateEstimator {
    /// Start from the rate the driver configured the sensor for.
    pub const fn new(nominal_rate_hz: f32) -> Self {
        Self {
            sample_count: 0,
            window_start_us: None,
            estimated_rate_hz: nominal_rate_hz,
        }
    }

    pub fn rate_hz(&self) -> f32 {
        self.estimated_rate_hz
    }

    /// Count one sample arriving at `now_us`.
    ///
    /// The first call after construction or [`reset`](Self::reset) only opens
    /// a window. Once a window spans more than [`RATE_WINDOW_US`], the
    /// observed rate is clamped to a band around the current estimate and
    /// blended in, and a new window starts.
    pub fn update(&mut self, now_us: u64, converging: bool) {
        let start_us = match self.window_start_us {
            None => {
                self.sample_count = 0;
                self.window_start_us = Some(now_us);
                return;
            }
            Some(start_us) => start_us,
        };

        self.sample_count = self.sample_count.saturating_add(1);
        let elapsed_us = now_us.saturating_sub(start_us);
        if elapsed_us <= RATE_WINDOW_US {
            return;
        }

        let tracking = if converging {
            TRACKING_CONVERGING
        } else {
            TRACKING_SETTLED
        };
        let observed_hz = self.sample_count as f32 * 1.0e6 / elapsed_us as f32;
        let observed_hz = observed_hz.clamp(
            self.estimated_rate_hz * tracking.lower_limit,
            self.estimated_rate_hz * tracking.upper_limit,
        );
        self.estimated_rate_hz = tracking.filter_constant * self.estimated_rate_hz
            + (1.0 - tracking.filter_constant) * observed_hz;

        self.sample_count = 0;
        self.window_start_us = Some(now_us);
    }

    /// Discard the current window, e.g. after a FIFO reset, so that bad
    /// timing never reaches the estimate.
    pub fn reset(&mut self) {
        self.sample_count = 0;
        self.window_start_us = None;
    }
}

/// Time step assigned to one accepted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStep {
    /// Integration interval for this sample (s)
    pub dt: f32,
    /// Timestamp recorded for this sample (µs)
    pub sample_us: u64,
    /// Gap since the previous sample exceeded [`STALE_SAMPLE_US`]
    pub stale: bool,
}

/// Timing state of one sensor channel, owned by the sampling context.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTiming {
    pub rate: SampleRateEstimator,
    last_sample_us: u64,
}

impl ChannelTiming {
    pub const fn new(nominal_rate_hz: f32) -> Self {
        Self {
            rate: SampleRateEstimator::new(nominal_rate_hz),
            last_sample_us: 0,
        }
    }

    pub fn last_sample_us(&self) -> u64 {
        self.last_sample_us
    }

    /// Step for a raw sample.
    ///
    /// Sensors that timestamp each sample (`sample_us != 0`) vary in actual
    /// rate, so `dt` comes from the timestamp delta. FIFO sensors pass
    /// `sample_us == 0`; their samples arrive in bunches, so `dt` comes from
    /// the estimated rate and they are dropped below [`MIN_SAMPLE_RATE_HZ`].
    pub fn raw_step(&mut self, sample_us: u64, now_us: u64) -> Option<SampleStep> {
        let previous_us = self.last_sample_us;
        if sample_us != 0 && previous_us != 0 {
            self.last_sample_us = sample_us;
            let dt = sample_us.saturating_sub(previous_us) as f32 * 1.0e-6;
            Some(self.finish(dt, sample_us, previous_us, now_us))
        } else {
            self.fifo_step(now_us)
        }
    }

    /// Step for a FIFO or pre-integrated delta sample.
    pub fn fifo_step(&mut self, now_us: u64) -> Option<SampleStep> {
        let previous_us = self.last_sample_us;
        let rate_hz = self.rate.rate_hz();
        if rate_hz < MIN_SAMPLE_RATE_HZ {
            return None;
        }
        self.last_sample_us = now_us;
        Some(self.finish(1.0 / rate_hz, now_us, previous_us, now_us))
    }

    /// Mark the step stale after a long gap. A stale sample still carries
    /// information, but only for its own nominal interval, not for the gap.
    fn finish(&self, dt: f32, sample_us: u64, previous_us: u64, now_us: u64) -> SampleStep {
        let stale = now_us.saturating_sub(previous_us) > STALE_SAMPLE_US;
        let dt = if stale { self.nominal_dt() } else { dt };
        SampleStep {
            dt,
            sample_us,
            stale,
        }
    }

    fn nominal_dt(&self) -> f32 {
        let rate_hz = self.rate.rate_hz();
        if rate_hz >= MIN_SAMPLE_RATE_HZ {
            1.0 / rate_hz
        } else {
            0.0
        }
    }
}
