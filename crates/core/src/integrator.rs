//! Delta-angle and delta-velocity accumulation.
//!
//! Gyro samples are integrated with the trapezoidal rule plus a
//! second-order coning correction (Tian et al. 2010, "Three-loop
//! Integration of GPS and Strapdown INS with Coning and Sculling
//! Compensation", p. 26). Accelerometer samples are integrated with the
//! rectangle rule; coning is specific to rotation.
//!
//! The accumulator is owned by the backend lock: integration happens in the
//! sampling context, [`DeltaAccumulator::drain`] in the publishing context.

use crate::rate::SampleStep;
use nalgebra::Vector3;

/// Running integral for one instance since the last publish.
///
/// `delta_dt` is always the sum of the `dt` values folded into `delta`;
/// both are cleared together by [`drain`](Self::drain) and by a stale step.
#[derive(Debug, Clone, Copy)]
pub struct DeltaAccumulator {
    delta: Vector3<f32>,
    delta_dt: f32,
    last_raw: Vector3<f32>,
    last_delta: Vector3<f32>,
}

impl Default for DeltaAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaAccumulator {
    pub const fn new() -> Self {
        Self {
            delta: Vector3::new(0.0, 0.0, 0.0),
            delta_dt: 0.0,
            last_raw: Vector3::new(0.0, 0.0, 0.0),
            last_delta: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Accumulated delta since the last drain.
    pub fn delta(&self) -> Vector3<f32> {
        self.delta
    }

    /// Accumulated integration time since the last drain (s).
    pub fn delta_dt(&self) -> f32 {
        self.delta_dt
    }

    /// Fold one gyro sample (rad/s) into the delta angle.
    ///
    /// A non-finite sample carries no usable information and is skipped
    /// entirely, including its `dt`.
    pub fn integrate_angle(&mut self, gyro: Vector3<f32>, step: &SampleStep) {
        if !is_finite(&gyro) {
            return;
        }
        if step.stale {
            // history from before the gap must not shape the new sample
            self.clear_history(gyro);
        }

        let delta_angle = (gyro + self.last_raw) * 0.5 * step.dt;
        self.accumulate_angle(delta_angle, gyro, step.dt);
    }

    /// Fold a sensor-integrated delta angle (rad) into the accumulator.
    /// The sensor already integrated over `step.dt`, so only the coning
    /// term is added here.
    pub fn integrate_delta_angle(&mut self, delta_angle: Vector3<f32>, step: &SampleStep) {
        if !is_finite(&delta_angle) || step.dt <= 0.0 {
            return;
        }
        let rate = delta_angle / step.dt;
        if step.stale {
            self.clear_history(rate);
        }
        self.accumulate_angle(delta_angle, rate, step.dt);
    }

    fn accumulate_angle(&mut self, delta_angle: Vector3<f32>, rate: Vector3<f32>, dt: f32) {
        let coning = (self.delta + self.last_delta * (1.0 / 6.0)).cross(&delta_angle) * 0.5;

        self.delta += delta_angle + coning;
        self.delta_dt += dt;

        self.last_delta = delta_angle;
        self.last_raw = rate;
    }

    /// Fold one accelerometer sample (m/s²) into the delta velocity.
    pub fn integrate_velocity(&mut self, accel: Vector3<f32>, step: &SampleStep) {
        if !is_finite(&accel) {
            return;
        }
        if step.stale {
            self.clear_history(accel);
        }

        self.delta += accel * step.dt;
        self.delta_dt += step.dt;
        self.last_raw = accel;
    }

    /// Hand out the accumulated `(delta, dt)` and start a new interval.
    ///
    /// The previous raw sample and delta survive so that trapezoidal and
    /// coning terms stay continuous across publish boundaries.
    pub fn drain(&mut self) -> (Vector3<f32>, f32) {
        let drained = (self.delta, self.delta_dt);
        self.delta = Vector3::zeros();
        self.delta_dt = 0.0;
        drained
    }

    fn clear_history(&mut self, current: Vector3<f32>) {
        self.delta = Vector3::zeros();
        self.delta_dt = 0.0;
        self.last_delta = Vector3::zeros();
        self.last_raw = current;
    }
}

/// True when no component is NaN or infinite.
pub fn is_finite(v: &Vector3<f32>) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn step(dt: f32) -> SampleStep {
        SampleStep {
            dt,
            sample_us: 0,
            stale: false,
        }
    }

    fn stale(dt: f32) -> SampleStep {
        SampleStep {
            dt,
            sample_us: 0,
            stale: true,
        }
    }

    #[test]
    fn test_constant_rate_integrates_linearly() {
        let mut acc = DeltaAccumulator::new();
        let gyro = Vector3::new(0.1, 0.0, 0.0);

        acc.integrate_angle(gyro, &stale(0.001));
        for _ in 0..9 {
            acc.integrate_angle(gyro, &step(0.001));
        }

        let (delta, dt) = acc.drain();
        assert!((dt - 0.01).abs() < EPSILON);
        assert!((delta.x - 0.001).abs() < EPSILON, "delta.x {}", delta.x);
        assert!(delta.y.abs() < EPSILON && delta.z.abs() < EPSILON);
    }

    #[test]
    fn test_trapezoid_averages_consecutive_samples() {
        let mut acc = DeltaAccumulator::new();
        acc.integrate_angle(Vector3::new(0.0, 0.0, 1.0), &stale(0.01));
        acc.drain();

        acc.integrate_angle(Vector3::new(0.0, 0.0, 3.0), &step(0.01));
        let (delta, _) = acc.drain();
        // (3 + 1) / 2 * 0.01
        assert!((delta.z - 0.02).abs() < EPSILON);
    }

    #[test]
    fn test_coning_is_zero_for_parallel_rates() {
        let mut acc = DeltaAccumulator::new();
        acc.integrate_angle(Vector3::new(0.2, 0.4, -0.1), &stale(0.002));
        for _ in 0..20 {
            acc.integrate_angle(Vector3::new(0.2, 0.4, -0.1), &step(0.002));
        }
        let (delta, dt) = acc.drain();
        let expected = Vector3::new(0.2, 0.4, -0.1) * dt;
        assert!((delta - expected).norm() < EPSILON, "delta {:?}", delta);
    }

    #[test]
    fn test_coning_appears_when_rate_direction_changes() {
        let mut with_coning = DeltaAccumulator::new();
        let dt = 0.01;
        let rates = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];

        with_coning.integrate_angle(rates[0], &stale(dt));
        let mut first_order = Vector3::zeros();
        let mut last = rates[0];
        first_order += rates[0] * dt;
        for rate in &rates[1..] {
            with_coning.integrate_angle(*rate, &step(dt));
            first_order += (rate + last) * 0.5 * dt;
            last = *rate;
        }

        let (delta, _) = with_coning.drain();
        let coning = delta - first_order;
        // rotation from x to y produces a z-axis term
        assert!(coning.z.abs() > 1e-6, "coning {:?}", coning);
        assert!(coning.x.abs() < EPSILON && coning.y.abs() < EPSILON);
    }

    #[test]
    fn test_stale_step_restarts_from_zero() {
        let mut acc = DeltaAccumulator::new();
        let gyro = Vector3::new(0.0, 0.5, 0.0);
        acc.integrate_angle(gyro, &stale(0.001));
        for _ in 0..50 {
            acc.integrate_angle(gyro, &step(0.001));
        }

        acc.integrate_angle(gyro, &stale(0.001));
        assert!((acc.delta_dt() - 0.001).abs() < EPSILON);
        assert!((acc.delta().y - 0.0005).abs() < EPSILON);
    }

    #[test]
    fn test_velocity_uses_rectangle_rule() {
        let mut acc = DeltaAccumulator::new();
        acc.integrate_velocity(Vector3::new(0.0, 0.0, -9.8), &stale(0.01));
        acc.integrate_velocity(Vector3::new(0.0, 0.0, -10.0), &step(0.01));

        let (delta, dt) = acc.drain();
        assert!((dt - 0.02).abs() < EPSILON);
        assert!((delta.z - (-0.198)).abs() < 1e-5);
    }

    #[test]
    fn test_drain_clears_only_the_interval() {
        let mut acc = DeltaAccumulator::new();
        acc.integrate_angle(Vector3::new(1.0, 0.0, 0.0), &stale(0.01));
        let (delta, dt) = acc.drain();
        assert!(delta.x > 0.0 && dt > 0.0);

        assert_eq!(acc.delta(), Vector3::zeros());
        assert_eq!(acc.delta_dt(), 0.0);
        // next sample still averages with the pre-drain raw value
        acc.integrate_angle(Vector3::new(3.0, 0.0, 0.0), &step(0.01));
        assert!((acc.delta().x - 0.02).abs() < EPSILON);
    }

    #[test]
    fn test_delta_angle_is_taken_as_integrated() {
        let mut acc = DeltaAccumulator::new();
        let dangle = Vector3::new(0.0, 0.0, 0.002);
        acc.integrate_delta_angle(dangle, &stale(0.01));
        acc.integrate_delta_angle(dangle, &step(0.01));
        let (delta, dt) = acc.drain();
        assert!((delta - dangle * 2.0).norm() < EPSILON, "got {:?}", delta);
        assert!((dt - 0.02).abs() < EPSILON);
    }

    #[test]
    fn test_non_finite_samples_are_skipped() {
        let mut acc = DeltaAccumulator::new();
        acc.integrate_angle(Vector3::new(0.1, 0.0, 0.0), &stale(0.001));
        acc.integrate_angle(Vector3::new(f32::NAN, 0.0, 0.0), &step(0.001));
        acc.integrate_velocity(Vector3::new(f32::INFINITY, 0.0, 0.0), &step(0.001));

        assert!(is_finite(&acc.delta()));
        assert!((acc.delta_dt() - 0.001).abs() < EPSILON);
    }
}
