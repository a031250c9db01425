//! Oversampling accumulators and rate samplers
//!
//! Each sensor is read by a periodic task much faster than the fusion
//! filter runs. Raw axis triples are folded into a running-sum
//! [`Accumulator`]; every N samples the [`RateSampler`] emits one
//! averaged, bias-corrected, unit-converted [`AveragedReading`] for the
//! fusion task to consume.

use super::calibration::BiasOffset;
use crate::devices::traits::RawSample;
use nalgebra::Vector3;

/// Gravity at Earth's surface in m/s².
pub const STANDARD_GRAVITY: f64 = 9.812865328;

/// Raw samples averaged per emitted reading.
pub const OVERSAMPLE: u32 = 4;

/// ITG-3200 sensitivity is 14.375 LSB/(°/s).
pub const GYROSCOPE_GAIN: f64 = 1.0 / 14.375;

/// Full-resolution ADXL345 counts are 4 mg/LSB.
pub const ACCELEROMETER_GAIN: f64 = 0.004 * STANDARD_GRAVITY;

/// Magnetometer readings stay in raw counts; the unit is arbitrary by
/// design (the fusion filter normalizes the vector, so only direction
/// matters) and no datasheet gain is applied.
pub const MAGNETOMETER_GAIN: f64 = 1.0;

/// Fixed-size running-sum buffer for one sensor's oversampling state.
///
/// Sums and count always reset together, so a partially-filled batch can
/// never leak into the next one.
#[derive(Debug, Clone)]
pub struct Accumulator {
    sum: Vector3<f64>,
    count: u32,
    target: u32,
}

impl Accumulator {
    /// Create an accumulator that averages batches of `target` samples.
    pub fn new(target: u32) -> Self {
        debug_assert!(target > 0);
        Self {
            sum: Vector3::zeros(),
            count: 0,
            target,
        }
    }

    /// Fold one raw sample in; returns the batch mean when the batch
    /// completes, resetting the accumulator.
    pub fn add(&mut self, sample: RawSample) -> Option<Vector3<f64>> {
        self.sum += sample.to_vector();
        self.count += 1;

        if self.count < self.target {
            return None;
        }

        let mean = self.sum / f64::from(self.target);
        self.sum = Vector3::zeros();
        self.count = 0;
        Some(mean)
    }

    /// Samples folded into the current batch so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Batch size.
    pub fn target(&self) -> u32 {
        self.target
    }
}

/// Per-sensor sampling parameters.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Raw samples per averaged reading.
    pub oversample: u32,

    /// Counts-to-physical-units gain applied after bias removal.
    pub gain: f64,

    /// Convert the scaled value from degrees to radians (gyroscope only:
    /// its gain yields °/s, the filter wants rad/s).
    pub degrees_to_radians: bool,
}

impl SamplerConfig {
    /// Gyroscope: counts → °/s → rad/s.
    pub fn gyroscope() -> Self {
        Self {
            oversample: OVERSAMPLE,
            gain: GYROSCOPE_GAIN,
            degrees_to_radians: true,
        }
    }

    /// Accelerometer: counts → m/s².
    pub fn accelerometer() -> Self {
        Self {
            oversample: OVERSAMPLE,
            gain: ACCELEROMETER_GAIN,
            degrees_to_radians: false,
        }
    }

    /// Magnetometer: counts → arbitrary flux units.
    pub fn magnetometer() -> Self {
        Self {
            oversample: OVERSAMPLE,
            gain: MAGNETOMETER_GAIN,
            degrees_to_radians: false,
        }
    }
}

/// Latest fused-ready value for one sensor.
///
/// `generation` is 0 only for a slot that has never been published;
/// thereafter it increases with every emitted batch, letting readers
/// detect both "nothing yet" and staleness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AveragedReading {
    /// Averaged, bias-corrected value in physical units
    /// (rad/s, m/s², or arbitrary flux units).
    pub values: Vector3<f64>,

    /// Validity/freshness marker; 0 means never published.
    pub generation: u32,
}

impl AveragedReading {
    /// The never-published placeholder a shared slot starts with.
    pub const EMPTY: Self = Self {
        values: Vector3::new(0.0, 0.0, 0.0),
        generation: 0,
    };

    /// Whether this reading came from a completed batch.
    pub fn is_published(&self) -> bool {
        self.generation != 0
    }
}

/// Combines an [`Accumulator`] with the sensor's bias offset and gain.
///
/// `add_sample` implements the whole per-tick sampling step: fold the raw
/// triple in, and on batch completion compute `((sum/N) - bias) * gain`
/// (plus the gyroscope's degrees→radians conversion).
#[derive(Debug, Clone)]
pub struct RateSampler {
    accumulator: Accumulator,
    bias: BiasOffset,
    config: SamplerConfig,
    generation: u32,
}

impl RateSampler {
    pub fn new(config: SamplerConfig, bias: BiasOffset) -> Self {
        Self {
            accumulator: Accumulator::new(config.oversample),
            bias,
            config,
            generation: 0,
        }
    }

    /// Fold one raw sample in; every N-th call emits the averaged reading.
    pub fn add_sample(&mut self, raw: RawSample) -> Option<AveragedReading> {
        let mean = self.accumulator.add(raw)?;

        let mut values = (mean - self.bias.counts) * self.config.gain;
        if self.config.degrees_to_radians {
            values = values.map(f64::to_radians);
        }

        // Generation 0 is reserved for "never published"; skip it on wrap.
        self.generation = self.generation.checked_add(1).unwrap_or(1);

        Some(AveragedReading {
            values,
            generation: self.generation,
        })
    }

    /// Bias offset currently applied to every emitted reading.
    pub fn bias(&self) -> &BiasOffset {
        &self.bias
    }

    /// Readings emitted since construction.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
