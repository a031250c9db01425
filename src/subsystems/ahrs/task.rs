//! Periodic sampling and fusion tasks
//!
//! One async task per sensor reads raw samples at the sensor's data rate
//! and publishes averaged readings into its shared slot; a single fusion
//! task runs at the slowest rate, snapshots the three slots and advances
//! the filter. Task loops are driven by `embassy_time::Ticker`, which
//! never re-enters a still-running callback.
//!
//! Bias calibration is not scheduled here: it must complete before the
//! sensor's sampler task is spawned (see
//! [`super::calibration::calibrate`]).

#[cfg(feature = "embassy")]
use super::marg::MargFilter;
#[cfg(feature = "embassy")]
use super::sampling::RateSampler;
#[cfg(feature = "embassy")]
use super::state::{SharedEulerState, SharedReadingSlot};
#[cfg(feature = "embassy")]
use crate::devices::traits::ThreeAxisSensor;

/// Timing for one sensor's sampling task.
#[derive(Debug, Clone, Copy)]
pub struct SamplerTaskConfig {
    /// Sampling period in microseconds.
    pub period_us: u64,
}

impl SamplerTaskConfig {
    /// Gyroscope data rate: 200 Hz.
    pub fn gyroscope() -> Self {
        Self { period_us: 5_000 }
    }

    /// Accelerometer data rate: 200 Hz.
    pub fn accelerometer() -> Self {
        Self { period_us: 5_000 }
    }

    /// Magnetometer measurement rate: 10 Hz.
    pub fn magnetometer() -> Self {
        Self { period_us: 100_000 }
    }
}

/// Timing for the fusion task.
#[derive(Debug, Clone, Copy)]
pub struct FusionTaskConfig {
    /// Fusion period in microseconds. Must match the filter's nominal
    /// `sample_period_s`: the integration step is fixed, so cadence
    /// drift degrades accuracy but does not fail.
    pub period_us: u64,
}

impl Default for FusionTaskConfig {
    fn default() -> Self {
        Self { period_us: 100_000 }
    }
}

/// Read one sensor periodically and publish averaged readings.
///
/// A failed read skips the cycle (the accumulator is left untouched
/// rather than fed a fabricated zero) and the error is logged. The
/// sensor may recover on a later cycle.
#[cfg(feature = "embassy")]
pub async fn run_sampler_task<S: ThreeAxisSensor>(
    mut sensor: S,
    mut sampler: RateSampler,
    slot: &SharedReadingSlot,
    config: SamplerTaskConfig,
) {
    use embassy_time::{Duration, Ticker};

    let mut ticker = Ticker::every(Duration::from_micros(config.period_us));

    loop {
        ticker.next().await;

        match sensor.read_axes().await {
            Ok(raw) => {
                if let Some(reading) = sampler.add_sample(raw) {
                    slot.publish(reading);
                }
            }
            Err(e) => {
                crate::log_warn!("sensor read failed, skipping sample: {:?}", e);
            }
        }
    }
}

/// Fuse the latest averaged readings at the fusion rate.
///
/// Each cycle snapshots all three slots (values may be stale by up to
/// one sampler batch, which the design accepts) and skips fusion until
/// every sensor has published at least once.
#[cfg(feature = "embassy")]
pub async fn run_fusion_task(
    gyro_slot: &SharedReadingSlot,
    accel_slot: &SharedReadingSlot,
    mag_slot: &SharedReadingSlot,
    mut filter: MargFilter,
    output: &SharedEulerState,
    config: FusionTaskConfig,
) {
    use embassy_time::{Duration, Ticker};

    let mut ticker = Ticker::every(Duration::from_micros(config.period_us));

    loop {
        ticker.next().await;

        let gyro = gyro_slot.snapshot();
        let accel = accel_slot.snapshot();
        let mag = mag_slot.snapshot();

        if !(gyro.is_published() && accel.is_published() && mag.is_published()) {
            // Samplers are still filling their first batches.
            continue;
        }

        filter.update(gyro.values, accel.values, mag.values);
        output.publish(filter.euler_angles());
    }
}
