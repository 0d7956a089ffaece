//! Producer and consumer on separate threads sharing one backend through
//! the critical-section lock.

#![cfg(feature = "embassy")]

use core::sync::atomic::{AtomicBool, Ordering};
use inertial_sensor::core::traits::EmbassyState;
use inertial_sensor::inertial_core::filter::FilterConfig;
use inertial_sensor::inertial_core::instance::InstanceId;
use inertial_sensor::inertial_core::timing::SystemTimingContext;
use inertial_sensor::{ImuBackend, SampleState, SamplerConfig};
use nalgebra::Vector3;

const SAMPLES: u64 = 5_000;
const START_US: u64 = 1_000_000;

#[test]
fn test_every_sample_published_exactly_once() {
    let backend = ImuBackend::new(
        InstanceId::FIRST,
        InstanceId::FIRST,
        EmbassyState::new(SampleState::new(FilterConfig::default())),
    );
    let done = AtomicBool::new(false);
    let gyro = Vector3::new(0.1, -0.2, 0.05);
    let accel = Vector3::new(0.0, 0.0, -9.8);

    let (dt_sum, angle_sum, velocity_sum, publishes) = std::thread::scope(|scope| {
        scope.spawn(|| {
            let mut sampler = backend
                .sampler(SamplerConfig::new(1000.0, 1000.0))
                .expect("sampler already claimed");
            for i in 0..SAMPLES {
                let now = START_US + i * 1_000;
                let ctx = SystemTimingContext::new(now, false, Some(InstanceId::FIRST));
                sampler.notify_raw_gyro(&ctx, gyro, now);
                sampler.notify_raw_accel(&ctx, accel, now, false);
            }
            done.store(true, Ordering::Release);
        });

        let consumer = scope.spawn(|| {
            let mut publisher = backend.publisher();
            let ctx = SystemTimingContext::new(START_US, false, Some(InstanceId::FIRST));
            let mut last_gyro_sequence = 0;
            let mut last_accel_sequence = 0;
            let mut dt_sum = 0.0f64;
            let mut angle_sum = Vector3::<f64>::zeros();
            let mut velocity_sum = Vector3::<f64>::zeros();
            let mut publishes = 0u32;

            loop {
                // read the flag first so the final pass sees every sample
                let finished = done.load(Ordering::Acquire);
                publisher.update_gyro(&ctx);
                publisher.update_accel(&ctx);

                let g = publisher.gyro();
                if g.sequence != last_gyro_sequence {
                    last_gyro_sequence = g.sequence;
                    dt_sum += f64::from(g.delta_dt);
                    angle_sum += g.delta.cast::<f64>();
                    publishes += 1;
                }
                let a = publisher.accel();
                if a.sequence != last_accel_sequence {
                    last_accel_sequence = a.sequence;
                    velocity_sum += a.delta.cast::<f64>();
                }

                if finished {
                    break;
                }
                std::thread::yield_now();
            }
            (dt_sum, angle_sum, velocity_sum, publishes)
        });

        match consumer.join() {
            Ok(sums) => sums,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    let total_s = SAMPLES as f64 * 1e-3;
    assert!(publishes > 0);
    assert!((dt_sum - total_s).abs() < 1e-3, "published dt {}", dt_sum);
    let expected_angle = gyro.cast::<f64>() * total_s;
    assert!(
        (angle_sum - expected_angle).norm() < 1e-3,
        "angle {:?} expected {:?}",
        angle_sum,
        expected_angle
    );
    let expected_velocity = accel.cast::<f64>() * total_s;
    assert!(
        (velocity_sum - expected_velocity).norm() < 1e-2,
        "velocity {:?} expected {:?}",
        velocity_sum,
        expected_velocity
    );
}
