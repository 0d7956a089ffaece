//! Sampling-context handle: ingestion of driver samples.

use super::{ImuBackend, SampleState};
use crate::core::traits::SharedState;
use crate::sinks::{
    BatchSampler, HeaterControl, OpticalFlowGyro, PrimaryListener, RawSampleLogger, RegisterCheck,
    SampleHook,
};
use inertial_core::correction::{CorrectionStage, TemperatureLearning};
use inertial_core::instance::{InstanceId, SensorKind};
use inertial_core::parameters::RawLoggingOptions;
use inertial_core::primary::PrimarySelector;
use inertial_core::rate::{ChannelTiming, SampleStep};
use inertial_core::timing::SystemTimingContext;
use nalgebra::Vector3;

/// Raw logging policy for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawLogConfig {
    pub options: RawLoggingOptions,
    /// Number of registered gyros; post-filter records are logged under
    /// `instance + gyro_count`.
    pub gyro_count: u8,
}

/// Sampling-side configuration of one backend.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub gyro_rate_hz: f32,
    pub accel_rate_hz: f32,
    pub correction: CorrectionStage,
    pub raw_log: RawLogConfig,
    /// Forward this backend's temperature to the heater.
    pub drives_heater: bool,
    /// Apply [`CorrectionStage`] to delta samples too. Sensors that
    /// integrate internally usually deliver sensor-frame, uncalibrated
    /// deltas; leave unset when the driver corrects them itself.
    pub correct_delta_samples: bool,
}

impl SamplerConfig {
    pub fn new(gyro_rate_hz: f32, accel_rate_hz: f32) -> Self {
        Self {
            gyro_rate_hz,
            accel_rate_hz,
            correction: CorrectionStage::new(),
            raw_log: RawLogConfig::default(),
            drives_heater: false,
            correct_delta_samples: false,
        }
    }
}

#[derive(Default)]
struct Taps<'a> {
    logger: Option<&'a mut dyn RawSampleLogger>,
    batch: Option<&'a mut dyn BatchSampler>,
    hook: Option<&'a mut dyn SampleHook>,
    flow: Option<&'a mut dyn OpticalFlowGyro>,
    heater: Option<&'a mut dyn HeaterControl>,
    learner: Option<&'a mut dyn TemperatureLearning>,
    primary: Option<&'a mut dyn PrimaryListener>,
}

/// Producer handle of an [`ImuBackend`].
///
/// Owns the sampling-only state: rate estimators, sample timing,
/// correction, primary notification history and the collaborator taps.
/// Dropping it frees the backend for a new sampler.
pub struct ImuSampler<'a, S> {
    backend: &'a ImuBackend<S>,
    gyro_timing: ChannelTiming,
    accel_timing: ChannelTiming,
    primary: PrimarySelector,
    correction: CorrectionStage,
    raw_log: RawLogConfig,
    drives_heater: bool,
    correct_delta_samples: bool,
    taps: Taps<'a>,
}

impl<S> Drop for ImuSampler<'_, S> {
    fn drop(&mut self) {
        self.backend.release_sampler();
    }
}

impl<'a, S: SharedState<SampleState>> ImuSampler<'a, S> {
    pub(super) fn new(backend: &'a ImuBackend<S>, config: SamplerConfig) -> Self {
        backend.state().with_mut(|s| {
            s.gyro.sample_rate_hz = config.gyro_rate_hz;
            s.accel.sample_rate_hz = config.accel_rate_hz;
        });
        crate::log_info!(
            "imu gyro {} accel {} sampling at {} / {} Hz",
            backend.gyro_instance().index(),
            backend.accel_instance().index(),
            config.gyro_rate_hz,
            config.accel_rate_hz
        );
        Self {
            backend,
            gyro_timing: ChannelTiming::new(config.gyro_rate_hz),
            accel_timing: ChannelTiming::new(config.accel_rate_hz),
            primary: PrimarySelector::new(),
            correction: config.correction,
            raw_log: config.raw_log,
            drives_heater: config.drives_heater,
            correct_delta_samples: config.correct_delta_samples,
            taps: Taps::default(),
        }
    }

    pub fn with_logger(mut self, logger: &'a mut dyn RawSampleLogger) -> Self {
        self.taps.logger = Some(logger);
        self
    }

    pub fn with_batch_sampler(mut self, batch: &'a mut dyn BatchSampler) -> Self {
        self.taps.batch = Some(batch);
        self
    }

    pub fn with_sample_hook(mut self, hook: &'a mut dyn SampleHook) -> Self {
        self.taps.hook = Some(hook);
        self
    }

    pub fn with_optical_flow(mut self, flow: &'a mut dyn OpticalFlowGyro) -> Self {
        self.taps.flow = Some(flow);
        self
    }

    pub fn with_heater(mut self, heater: &'a mut dyn HeaterControl) -> Self {
        self.taps.heater = Some(heater);
        self
    }

    pub fn with_temperature_learning(mut self, learner: &'a mut dyn TemperatureLearning) -> Self {
        self.taps.learner = Some(learner);
        self
    }

    pub fn with_primary_listener(mut self, listener: &'a mut dyn PrimaryListener) -> Self {
        self.taps.primary = Some(listener);
        self
    }

    pub fn gyro_rate_hz(&self) -> f32 {
        self.gyro_timing.rate.rate_hz()
    }

    pub fn accel_rate_hz(&self) -> f32 {
        self.accel_timing.rate.rate_hz()
    }

    pub fn correction(&self) -> &CorrectionStage {
        &self.correction
    }

    /// Offsets, orientations and calibration flags are read on every
    /// sample, so changes apply from the next one.
    pub fn correction_mut(&mut self) -> &mut CorrectionStage {
        &mut self.correction
    }

    pub fn set_raw_log_config(&mut self, raw_log: RawLogConfig) {
        self.raw_log = raw_log;
    }

    // ------------------------------------------------------------------
    // Gyro
    // ------------------------------------------------------------------

    /// Raw gyro sample (rad/s, sensor frame). `sample_us` is the sensor
    /// timestamp, or 0 for FIFO sensors.
    pub fn notify_raw_gyro(&mut self, ctx: &SystemTimingContext, gyro: Vector3<f32>, sample_us: u64) {
        if self.backend.gyro_killed() {
            return;
        }
        self.gyro_timing.rate.update(ctx.now_us, ctx.is_converging);
        let Some(step) = self.gyro_timing.raw_step(sample_us, ctx.now_us) else {
            crate::log_trace!("gyro {} sample dropped", self.backend.gyro_instance().index());
            return;
        };

        let gyro = self
            .correction
            .correct_gyro(&gyro, self.taps.learner.as_deref_mut());
        self.accept_gyro(ctx, gyro, None, &step);
    }

    /// Sensor-integrated delta angle (rad) from a FIFO sensor.
    pub fn notify_delta_angle(&mut self, ctx: &SystemTimingContext, delta_angle: Vector3<f32>) {
        if self.backend.gyro_killed() {
            return;
        }
        self.gyro_timing.rate.update(ctx.now_us, ctx.is_converging);
        let Some(step) = self.gyro_timing.fifo_step(ctx.now_us) else {
            crate::log_trace!("gyro {} delta dropped", self.backend.gyro_instance().index());
            return;
        };

        let mut gyro = delta_angle / step.dt;
        if self.correct_delta_samples {
            gyro = self
                .correction
                .correct_gyro(&gyro, self.taps.learner.as_deref_mut());
        }
        self.accept_gyro(ctx, gyro, Some(gyro * step.dt), &step);
    }

    /// Shared tail of both gyro paths. `delta_angle` is set when the
    /// sensor integrated the sample itself.
    fn accept_gyro(
        &mut self,
        ctx: &SystemTimingContext,
        gyro: Vector3<f32>,
        delta_angle: Option<Vector3<f32>>,
        step: &SampleStep,
    ) {
        let instance = self.backend.gyro_instance();
        if let Some(hook) = self.taps.hook.as_deref_mut() {
            hook.gyro_sample(instance, step.dt, &gyro);
        }
        if let Some(flow) = self.taps.flow.as_deref_mut() {
            flow.push_gyro(gyro.x, gyro.y, step.dt);
        }

        let is_primary = ctx.is_primary(instance);
        let rate_hz = self.gyro_timing.rate.rate_hz();
        let filtered = self.backend.state().with_mut(|s| {
            match delta_angle {
                Some(delta) => s.gyro.accumulator.integrate_delta_angle(delta, step),
                None => s.gyro.accumulator.integrate_angle(gyro, step),
            }
            let out = s.gyro.filters.apply(&s.filter_config, is_primary, gyro);
            s.gyro.sample_rate_hz = rate_hz;
            s.gyro.new_data = true;
            out
        });

        if filtered.recovered {
            crate::log_warn!("gyro {} filter output not finite, filters reset", instance.index());
        }
        self.log_gyro_raw(instance, is_primary, step.sample_us, &gyro, &filtered.value);
        self.update_primary(ctx);
    }

    fn log_gyro_raw(
        &mut self,
        instance: InstanceId,
        is_primary: bool,
        sample_us: u64,
        raw: &Vector3<f32>,
        filtered: &Vector3<f32>,
    ) {
        let options = self.raw_log.options;
        let log_because_primary = options.contains(RawLoggingOptions::PRIMARY_GYRO_ONLY) && is_primary;
        let logger_wants_raw = self.taps.logger.as_deref().is_some_and(|l| l.should_log_raw());

        if options.contains(RawLoggingOptions::ALL_GYROS) || log_because_primary || logger_wants_raw {
            let Some(logger) = self.taps.logger.as_deref_mut() else {
                return;
            };
            let index = instance.index();
            if options.contains(RawLoggingOptions::PRE_AND_POST_FILTER) {
                logger.write_gyro(index, sample_us, raw);
                logger.write_gyro(index.saturating_add(self.raw_log.gyro_count), sample_us, filtered);
            } else if options.contains(RawLoggingOptions::POST_FILTER) {
                logger.write_gyro(index, sample_us, filtered);
            } else {
                logger.write_gyro(index, sample_us, raw);
            }
        } else if let Some(batch) = self.taps.batch.as_deref_mut() {
            if !batch.doing_sensor_rate_logging() {
                let v = if batch.doing_post_filter_logging() { filtered } else { raw };
                batch.sample(instance, SensorKind::Gyro, sample_us, v);
            }
        }
    }

    /// Sensor-rate gyro stream for the batch sampler (rad/s, sensor frame).
    pub fn notify_gyro_sensor_rate_sample(&mut self, ctx: &SystemTimingContext, gyro: Vector3<f32>) {
        let instance = self.backend.gyro_instance();
        let Some(batch) = self.taps.batch.as_deref_mut() else {
            return;
        };
        if batch.doing_sensor_rate_logging() {
            let gyro = self.correction.orient_gyro(&gyro);
            batch.sample(instance, SensorKind::Gyro, ctx.now_us, &gyro);
        }
    }

    // ------------------------------------------------------------------
    // Accel
    // ------------------------------------------------------------------

    /// Raw accel sample (m/s², sensor frame). `sample_us` is the sensor
    /// timestamp, or 0 for FIFO sensors.
    pub fn notify_raw_accel(
        &mut self,
        ctx: &SystemTimingContext,
        accel: Vector3<f32>,
        sample_us: u64,
        fsync: bool,
    ) {
        if self.backend.accel_killed() {
            return;
        }
        self.accel_timing.rate.update(ctx.now_us, ctx.is_converging);
        let Some(step) = self.accel_timing.raw_step(sample_us, ctx.now_us) else {
            crate::log_trace!("accel {} sample dropped", self.backend.accel_instance().index());
            return;
        };

        let accel = self.correct_accel(&accel);
        self.accept_accel(accel, fsync, &step);
    }

    /// Sensor-integrated delta velocity (m/s) from a FIFO sensor.
    pub fn notify_delta_velocity(&mut self, ctx: &SystemTimingContext, delta_velocity: Vector3<f32>) {
        if self.backend.accel_killed() {
            return;
        }
        self.accel_timing.rate.update(ctx.now_us, ctx.is_converging);
        let Some(step) = self.accel_timing.fifo_step(ctx.now_us) else {
            crate::log_trace!("accel {} delta dropped", self.backend.accel_instance().index());
            return;
        };

        let mut accel = delta_velocity / step.dt;
        if self.correct_delta_samples {
            accel = self.correct_accel(&accel);
        }
        self.accept_accel(accel, false, &step);
    }

    /// Offsets and scale are left out while a calibration capture is
    /// collecting.
    fn correct_accel(&mut self, accel: &Vector3<f32>) -> Vector3<f32> {
        let mut correction = self.correction;
        correction.calibrating_accel |= self.backend.accel_calibrating();
        correction.correct_accel(accel, self.taps.learner.as_deref_mut())
    }

    fn accept_accel(&mut self, accel: Vector3<f32>, fsync: bool, step: &SampleStep) {
        let instance = self.backend.accel_instance();
        if let Some(hook) = self.taps.hook.as_deref_mut() {
            hook.accel_sample(instance, step.dt, &accel, fsync);
        }

        let rate_hz = self.accel_timing.rate.rate_hz();
        let filtered = self.backend.state().with_mut(|s| {
            s.accel.accumulator.integrate_velocity(accel, step);
            let out = s.accel.filters.apply(accel);
            s.accel.sample_rate_hz = rate_hz;
            s.accel.new_data = true;
            out
        });

        if filtered.recovered {
            crate::log_warn!("accel {} filter output not finite, filter reset", instance.index());
        }
        self.log_accel_raw(instance, step.sample_us, &accel, &filtered.value);
    }

    fn log_accel_raw(&mut self, instance: InstanceId, sample_us: u64, raw: &Vector3<f32>, filtered: &Vector3<f32>) {
        let post_filter = self
            .taps
            .batch
            .as_deref()
            .is_some_and(|b| b.doing_post_filter_logging());
        let v = if post_filter { filtered } else { raw };

        if let Some(logger) = self.taps.logger.as_deref_mut() {
            if logger.should_log_raw() {
                logger.write_accel(instance.index(), sample_us, v);
                return;
            }
        }
        if let Some(batch) = self.taps.batch.as_deref_mut() {
            if !batch.doing_sensor_rate_logging() {
                batch.sample(instance, SensorKind::Accel, sample_us, v);
            }
        }
    }

    /// Sensor-rate accel stream for the batch sampler (m/s², sensor frame).
    pub fn notify_accel_sensor_rate_sample(&mut self, ctx: &SystemTimingContext, accel: Vector3<f32>) {
        let instance = self.backend.accel_instance();
        let Some(batch) = self.taps.batch.as_deref_mut() else {
            return;
        };
        if batch.doing_sensor_rate_logging() {
            let accel = self.correction.orient_accel(&accel);
            batch.sample(instance, SensorKind::Accel, ctx.now_us, &accel);
        }
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    /// The sensor's FIFO was reset; discard the partial rate window so the
    /// bad timing never reaches the estimate.
    pub fn notify_fifo_reset(&mut self, kind: SensorKind) {
        match kind {
            SensorKind::Gyro => self.gyro_timing.rate.reset(),
            SensorKind::Accel => self.accel_timing.rate.reset(),
        }
    }

    /// Latest die temperature (°C). Feeds temperature correction and,
    /// for the heater backend, the heater.
    pub fn notify_temperature(&mut self, temperature_c: f32) {
        if self.backend.accel_killed() {
            return;
        }
        self.correction.temperature_c = temperature_c;
        self.backend
            .state()
            .with_mut(|s| s.temperature_c = Some(temperature_c));

        if self.drives_heater {
            if let Some(heater) = self.taps.heater.as_deref_mut() {
                heater.set_imu_temp(temperature_c);
            }
        }
    }

    pub fn inc_gyro_error_count(&self) {
        self.backend
            .state()
            .with_mut(|s| s.gyro.error_count = s.gyro.error_count.saturating_add(1));
    }

    pub fn inc_accel_error_count(&self) {
        self.backend
            .state()
            .with_mut(|s| s.accel.error_count = s.accel.error_count.saturating_add(1));
    }

    /// Record a register that changed unexpectedly.
    pub fn log_register_change(&mut self, ctx: &SystemTimingContext, bus_id: u32, reg: &RegisterCheck) {
        crate::log_warn!(
            "imu bus {} register {} changed to {}",
            bus_id,
            reg.regnum,
            reg.value
        );
        if let Some(logger) = self.taps.logger.as_deref_mut() {
            logger.write_register_change(ctx.now_us, bus_id, reg);
        }
    }

    /// Tell the driver whether it is primary, on change and at least
    /// every refresh interval.
    fn update_primary(&mut self, ctx: &SystemTimingContext) {
        let instance = self.backend.gyro_instance();
        let Some(is_primary) = self.primary.reconcile(ctx.is_primary(instance), ctx.now_us) else {
            return;
        };
        crate::log_debug!("gyro {} primary={}", instance.index(), is_primary);
        if let Some(listener) = self.taps.primary.as_deref_mut() {
            listener.set_primary(is_primary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MockState;
    use inertial_core::filter::FilterConfig;
    use inertial_core::primary::PRIMARY_REFRESH_US;
    use inertial_core::rotation::Rotation;

    const EPSILON: f32 = 1e-5;
    const START_US: u64 = 1_000_000;

    type TestBackend = ImuBackend<MockState<SampleState>>;

    fn backend() -> TestBackend {
        ImuBackend::new(
            InstanceId::FIRST,
            InstanceId::FIRST,
            MockState::new(SampleState::new(FilterConfig::default())),
        )
    }

    fn ctx(now_us: u64) -> SystemTimingContext {
        SystemTimingContext::new(now_us, false, Some(InstanceId::FIRST))
    }

    fn secondary_ctx(now_us: u64) -> SystemTimingContext {
        SystemTimingContext::new(now_us, false, None)
    }

    #[derive(Default)]
    struct Logger {
        wants_raw: bool,
        gyro: Vec<(u8, Vector3<f32>)>,
        accel: Vec<(u8, Vector3<f32>)>,
        registers: Vec<(u32, RegisterCheck)>,
    }

    impl RawSampleLogger for Logger {
        fn should_log_raw(&self) -> bool {
            self.wants_raw
        }

        fn write_gyro(&mut self, log_instance: u8, _sample_us: u64, gyro: &Vector3<f32>) {
            self.gyro.push((log_instance, *gyro));
        }

        fn write_accel(&mut self, log_instance: u8, _sample_us: u64, accel: &Vector3<f32>) {
            self.accel.push((log_instance, *accel));
        }

        fn write_register_change(&mut self, _now_us: u64, bus_id: u32, reg: &RegisterCheck) {
            self.registers.push((bus_id, *reg));
        }
    }

    #[derive(Default)]
    struct Batch {
        sensor_rate: bool,
        post_filter: bool,
        samples: Vec<(SensorKind, u64, Vector3<f32>)>,
    }

    impl BatchSampler for Batch {
        fn doing_sensor_rate_logging(&self) -> bool {
            self.sensor_rate
        }

        fn doing_post_filter_logging(&self) -> bool {
            self.post_filter
        }

        fn sample(&mut self, _instance: InstanceId, kind: SensorKind, sample_us: u64, v: &Vector3<f32>) {
            self.samples.push((kind, sample_us, *v));
        }
    }

    #[derive(Default)]
    struct Listener {
        notifications: Vec<bool>,
    }

    impl PrimaryListener for Listener {
        fn set_primary(&mut self, is_primary: bool) {
            self.notifications.push(is_primary);
        }
    }

    #[derive(Default)]
    struct Hook {
        gyro: Vec<(f32, Vector3<f32>)>,
        accel_fsync: Vec<bool>,
    }

    impl SampleHook for Hook {
        fn gyro_sample(&mut self, _instance: InstanceId, dt: f32, gyro: &Vector3<f32>) {
            self.gyro.push((dt, *gyro));
        }

        fn accel_sample(&mut self, _instance: InstanceId, _dt: f32, _accel: &Vector3<f32>, fsync: bool) {
            self.accel_fsync.push(fsync);
        }
    }

    #[derive(Default)]
    struct Heater {
        temperatures: Vec<f32>,
    }

    impl HeaterControl for Heater {
        fn set_imu_temp(&mut self, temperature_c: f32) {
            self.temperatures.push(temperature_c);
        }
    }

    fn feed_gyro(sampler: &mut ImuSampler<'_, MockState<SampleState>>, gyro: Vector3<f32>, count: u64) {
        for i in 0..count {
            let now = START_US + i * 1_000;
            sampler.notify_raw_gyro(&ctx(now), gyro, now);
        }
    }

    #[test]
    fn test_raw_gyro_accumulates_delta_angle() {
        let backend = backend();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed");
        let gyro = Vector3::new(0.1, 0.0, 0.0);

        feed_gyro(&mut sampler, gyro, 10);

        let (new_data, delta, dt) = backend.state().with(|s| {
            (s.gyro.new_data, s.gyro.accumulator.delta(), s.gyro.accumulator.delta_dt())
        });
        assert!(new_data);
        assert!((dt - 0.010).abs() < EPSILON);
        assert!((delta.x - 0.1 * dt).abs() < EPSILON);
        assert!(delta.y.abs() < EPSILON);
    }

    #[test]
    fn test_killed_gyro_ignores_samples() {
        let backend = backend();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed");
        backend.kill_gyro();

        feed_gyro(&mut sampler, Vector3::new(0.1, 0.0, 0.0), 5);
        sampler.notify_delta_angle(&ctx(START_US), Vector3::new(0.001, 0.0, 0.0));

        assert!(!backend.state().with(|s| s.gyro.new_data));
        assert_eq!(backend.state().with(|s| s.gyro.accumulator.delta_dt()), 0.0);
    }

    #[test]
    fn test_fifo_samples_dropped_below_minimum_rate() {
        let backend = backend();
        let mut sampler = backend
            .sampler(SamplerConfig::new(20.0, 20.0))
            .expect("sampler already claimed");

        sampler.notify_raw_gyro(&ctx(START_US), Vector3::new(0.1, 0.0, 0.0), 0);
        sampler.notify_delta_velocity(&ctx(START_US), Vector3::new(0.0, 0.0, -0.5));

        assert!(!backend.state().with(|s| s.gyro.new_data));
        assert!(!backend.state().with(|s| s.accel.new_data));
    }

    #[test]
    fn test_gyro_offset_removed_before_integration() {
        let backend = backend();
        let mut config = SamplerConfig::new(1000.0, 1000.0);
        config.correction.gyro_offset = Vector3::new(0.02, 0.0, 0.0);
        let mut hook = Hook::default();
        let mut sampler = backend
            .sampler(config)
            .expect("sampler already claimed")
            .with_sample_hook(&mut hook);

        feed_gyro(&mut sampler, Vector3::new(0.12, 0.0, 0.0), 4);
        drop(sampler);

        assert_eq!(hook.gyro.len(), 4);
        for (dt, gyro) in &hook.gyro {
            assert!((dt - 0.001).abs() < EPSILON);
            assert!((gyro.x - 0.10).abs() < EPSILON);
        }
        let delta = backend.state().with(|s| s.gyro.accumulator.delta());
        assert!((delta.x - 0.10 * 0.004).abs() < EPSILON);
    }

    #[test]
    fn test_delta_angle_correction_is_optional() {
        let run = |correct: bool| {
            let backend = backend();
            let mut config = SamplerConfig::new(1000.0, 1000.0);
            config.correction.gyro_offset = Vector3::new(0.5, 0.0, 0.0);
            config.correct_delta_samples = correct;
            let mut sampler = backend.sampler(config).expect("sampler already claimed");
            sampler.notify_delta_angle(&ctx(START_US), Vector3::new(0.001, 0.0, 0.0));
            let delta = backend.state().with(|s| s.gyro.accumulator.delta());
            delta.x
        };

        assert!((run(false) - 0.001).abs() < EPSILON);
        assert!((run(true) - 0.0005).abs() < EPSILON);
    }

    #[test]
    fn test_accel_integrates_velocity_and_forwards_fsync() {
        let backend = backend();
        let mut hook = Hook::default();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed")
            .with_sample_hook(&mut hook);

        for i in 0..5 {
            let now = START_US + i * 1_000;
            sampler.notify_raw_accel(&ctx(now), Vector3::new(0.0, 0.0, -9.8), now, i == 2);
        }
        drop(sampler);

        assert_eq!(hook.accel_fsync, [false, false, true, false, false]);
        let (delta, dt) = backend
            .state()
            .with(|s| (s.accel.accumulator.delta(), s.accel.accumulator.delta_dt()));
        assert!((dt - 0.005).abs() < EPSILON);
        assert!((delta.z + 9.8 * 0.005).abs() < 1e-4);
    }

    #[test]
    fn test_primary_listener_notified_on_change_and_refresh() {
        let backend = backend();
        let mut listener = Listener::default();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed")
            .with_primary_listener(&mut listener);
        let gyro = Vector3::zeros();

        // first sample always notifies
        sampler.notify_raw_gyro(&ctx(START_US), gyro, START_US);
        sampler.notify_raw_gyro(&ctx(START_US + 1_000), gyro, START_US + 1_000);
        // change
        sampler.notify_raw_gyro(&secondary_ctx(START_US + 2_000), gyro, START_US + 2_000);
        // refresh
        let later = START_US + 2_000 + PRIMARY_REFRESH_US;
        sampler.notify_raw_gyro(&secondary_ctx(later), gyro, later);
        drop(sampler);

        assert_eq!(listener.notifications, [true, false, false]);
    }

    #[test]
    fn test_pre_and_post_filter_records_use_offset_instance() {
        let backend = backend();
        let mut logger = Logger::default();
        let mut config = SamplerConfig::new(1000.0, 1000.0);
        config.raw_log = RawLogConfig {
            options: RawLoggingOptions::ALL_GYROS | RawLoggingOptions::PRE_AND_POST_FILTER,
            gyro_count: 2,
        };
        let mut sampler = backend
            .sampler(config)
            .expect("sampler already claimed")
            .with_logger(&mut logger);

        feed_gyro(&mut sampler, Vector3::new(0.1, 0.0, 0.0), 1);
        drop(sampler);

        let instances: Vec<u8> = logger.gyro.iter().map(|(i, _)| *i).collect();
        assert_eq!(instances, [0, 2]);
        assert!((logger.gyro[0].1.x - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_primary_only_logging_skips_secondary() {
        let backend = backend();
        let mut logger = Logger::default();
        let mut batch = Batch::default();
        let mut config = SamplerConfig::new(1000.0, 1000.0);
        config.raw_log.options = RawLoggingOptions::PRIMARY_GYRO_ONLY;
        let mut sampler = backend
            .sampler(config)
            .expect("sampler already claimed")
            .with_logger(&mut logger)
            .with_batch_sampler(&mut batch);

        sampler.notify_raw_gyro(&secondary_ctx(START_US), Vector3::new(0.1, 0.0, 0.0), START_US);
        drop(sampler);

        assert!(logger.gyro.is_empty());
        assert_eq!(batch.samples.len(), 1);
        assert_eq!(batch.samples[0].0, SensorKind::Gyro);
    }

    #[test]
    fn test_accel_goes_to_logger_when_raw_requested() {
        let backend = backend();
        let mut logger = Logger {
            wants_raw: true,
            ..Logger::default()
        };
        let mut batch = Batch::default();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed")
            .with_logger(&mut logger)
            .with_batch_sampler(&mut batch);

        sampler.notify_raw_accel(&ctx(START_US), Vector3::new(1.0, 0.0, 0.0), START_US, false);
        drop(sampler);

        assert_eq!(logger.accel.len(), 1);
        assert!(batch.samples.is_empty());
    }

    #[test]
    fn test_sensor_rate_samples_only_while_batch_wants_them() {
        let backend = backend();
        let mut batch = Batch::default();
        let mut config = SamplerConfig::new(1000.0, 1000.0);
        config.correction.gyro_orientation = Rotation::Yaw180;
        config.correction.gyro_offset = Vector3::new(1.0, 1.0, 1.0);
        let mut sampler = backend
            .sampler(config)
            .expect("sampler already claimed")
            .with_batch_sampler(&mut batch);

        sampler.notify_gyro_sensor_rate_sample(&ctx(START_US), Vector3::new(0.1, 0.0, 0.0));
        drop(sampler);
        assert!(batch.samples.is_empty());

        batch.sensor_rate = true;
        let mut sampler = backend
            .sampler(config)
            .expect("sampler already claimed")
            .with_batch_sampler(&mut batch);
        sampler.notify_gyro_sensor_rate_sample(&ctx(START_US), Vector3::new(0.1, 0.0, 0.0));
        // pipeline samples are not batched meanwhile
        sampler.notify_raw_gyro(&ctx(START_US), Vector3::new(0.1, 0.0, 0.0), START_US);
        drop(sampler);

        assert_eq!(batch.samples.len(), 1);
        let (kind, sample_us, v) = batch.samples[0];
        assert_eq!(kind, SensorKind::Gyro);
        assert_eq!(sample_us, START_US);
        assert!((v.x + 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_temperature_feeds_heater_only_when_driving_it() {
        let backend = backend();
        let mut heater = Heater::default();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed")
            .with_heater(&mut heater);
        sampler.notify_temperature(41.5);
        assert_eq!(sampler.correction().temperature_c, 41.5);
        drop(sampler);
        assert!(heater.temperatures.is_empty());
        assert_eq!(backend.state().with(|s| s.temperature_c), Some(41.5));

        let mut config = SamplerConfig::new(1000.0, 1000.0);
        config.drives_heater = true;
        let mut sampler = backend
            .sampler(config)
            .expect("sampler already claimed")
            .with_heater(&mut heater);
        sampler.notify_temperature(42.0);
        drop(sampler);
        assert_eq!(heater.temperatures, [42.0]);
    }

    #[test]
    fn test_error_counts_and_register_changes() {
        let backend = backend();
        let mut logger = Logger::default();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed")
            .with_logger(&mut logger);

        sampler.inc_gyro_error_count();
        sampler.inc_gyro_error_count();
        sampler.inc_accel_error_count();
        let reg = RegisterCheck {
            bank: 0,
            regnum: 0x1a,
            value: 0x03,
        };
        sampler.log_register_change(&ctx(START_US), 7, &reg);
        drop(sampler);

        assert_eq!(backend.state().with(|s| (s.gyro.error_count, s.accel.error_count)), (2, 1));
        assert_eq!(logger.registers, [(7, reg)]);
    }

    #[test]
    fn test_fifo_reset_keeps_rate_estimate() {
        let backend = backend();
        let mut sampler = backend
            .sampler(SamplerConfig::new(1000.0, 1000.0))
            .expect("sampler already claimed");
        feed_gyro(&mut sampler, Vector3::zeros(), 500);
        sampler.notify_fifo_reset(SensorKind::Gyro);
        assert_eq!(sampler.gyro_rate_hz(), 1000.0);
    }
}
