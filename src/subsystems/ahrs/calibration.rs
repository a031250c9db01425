//! One-shot null-bias calibration
//!
//! At rest a sensor does not read zero: the gyroscope sits around a small
//! constant offset and the accelerometer's Z axis carries gravity. The
//! calibrator averages a fixed number of static samples to estimate each
//! axis's zero offset, which the rate sampler then subtracts from every
//! averaged batch.
//!
//! Calibration runs synchronously, strictly before the sensor's periodic
//! sampling task is started: it shares the raw-read collaborator with
//! that task and would corrupt a live averaging batch.

use crate::devices::traits::{SensorError, ThreeAxisSensor};
use nalgebra::Vector3;

/// Default number of static samples averaged per calibration.
pub const CALIBRATION_SAMPLES: u32 = 128;

/// 1 g in accelerometer counts at 4 mg/LSB full resolution.
pub const ACCEL_ONE_G_COUNTS: f64 = 250.0;

/// Per-sensor null bias, in raw device counts.
///
/// Immutable after calibration; recalibrating produces a fresh value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasOffset {
    pub counts: Vector3<f64>,
}

impl BiasOffset {
    /// No correction; used for sensors that are not bias-calibrated
    /// (the magnetometer: subtracting a static-pose mean would null the
    /// very field direction the filter needs).
    pub const ZERO: Self = Self {
        counts: Vector3::new(0.0, 0.0, 0.0),
    };

    pub fn new(counts: Vector3<f64>) -> Self {
        Self { counts }
    }
}

/// Calibration parameters for one sensor.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationConfig {
    /// Static samples to average.
    pub sample_count: u32,

    /// Sensor period between samples, microseconds.
    pub sample_period_us: u64,

    /// Counts subtracted from the Z-axis mean before it becomes the bias.
    ///
    /// For the accelerometer this is the 1 g code value, so the stored
    /// bias means "deviation from gravity-only, level" rather than true
    /// zero; other sensors leave it at 0.
    pub z_reference_counts: f64,
}

impl CalibrationConfig {
    /// Gyroscope at its 200 Hz sample rate.
    pub fn gyroscope() -> Self {
        Self {
            sample_count: CALIBRATION_SAMPLES,
            sample_period_us: 5_000,
            z_reference_counts: 0.0,
        }
    }

    /// Accelerometer at 200 Hz; Z bias excludes gravity.
    pub fn accelerometer() -> Self {
        Self {
            sample_count: CALIBRATION_SAMPLES,
            sample_period_us: 5_000,
            z_reference_counts: ACCEL_ONE_G_COUNTS,
        }
    }

    /// Magnetometer at its 10 Hz measurement rate.
    pub fn magnetometer() -> Self {
        Self {
            sample_count: CALIBRATION_SAMPLES,
            sample_period_us: 100_000,
            z_reference_counts: 0.0,
        }
    }
}

/// Estimate a sensor's null bias from `config.sample_count` static samples.
///
/// The device must be stationary for the whole run. Any read error aborts
/// the attempt: a bias averaged over a partial sample set is worse than no
/// bias at all, so the caller restarts calibration from scratch.
///
/// With the `embassy` feature enabled, one sensor period elapses between
/// consecutive reads; host tests read back-to-back.
pub async fn calibrate<S: ThreeAxisSensor>(
    sensor: &mut S,
    config: &CalibrationConfig,
) -> Result<BiasOffset, SensorError> {
    let mut sum = Vector3::zeros();

    for _ in 0..config.sample_count {
        let raw = sensor.read_axes().await?;
        sum += raw.to_vector();

        #[cfg(feature = "embassy")]
        embassy_time::Timer::after_micros(config.sample_period_us).await;
    }

    let mean = sum / f64::from(config.sample_count);
    let bias = BiasOffset::new(Vector3::new(
        mean.x,
        mean.y,
        mean.z - config.z_reference_counts,
    ));

    crate::log_info!(
        "calibration done: bias=({}, {}, {}) counts over {} samples",
        bias.counts.x,
        bias.counts.y,
        bias.counts.z,
        config.sample_count
    );

    Ok(bias)
}
