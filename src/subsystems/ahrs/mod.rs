//! AHRS (Attitude and Heading Reference System)
//!
//! Multi-rate sampling/calibration pipeline feeding a gradient-descent
//! MARG orientation filter.
//!
//! ## Architecture
//!
//! ```text
//!  gyro task ──► RateSampler ──► SharedReadingSlot ─┐
//!  accel task ─► RateSampler ──► SharedReadingSlot ─┼─► fusion task
//!  mag task ───► RateSampler ──► SharedReadingSlot ─┘   (MargFilter)
//!                                                          │
//!  foreground loop ◄───────── SharedEulerState ◄───────────┘
//! ```
//!
//! Each sampler task runs at its sensor's data rate, oversamples by N
//! and publishes averaged, bias-corrected readings. The fusion task runs
//! at the slowest rate, always consuming the latest (possibly stale)
//! reading per sensor. Null-bias calibration runs once per sensor before
//! its task is spawned.
//!
//! ## Usage
//!
//! ```ignore
//! use marg_ahrs::subsystems::ahrs::{
//!     calibrate, run_fusion_task, run_sampler_task, BiasOffset, CalibrationConfig,
//!     FusionTaskConfig, MargConfig, MargFilter, RateSampler, SamplerConfig,
//!     SamplerTaskConfig, SharedEulerState, SharedReadingSlot,
//! };
//!
//! static GYRO_SLOT: SharedReadingSlot = SharedReadingSlot::new();
//! static ACCEL_SLOT: SharedReadingSlot = SharedReadingSlot::new();
//! static MAG_SLOT: SharedReadingSlot = SharedReadingSlot::new();
//! static ATTITUDE: SharedEulerState = SharedEulerState::new();
//!
//! async fn bring_up(mut gyro: impl ThreeAxisSensor) -> Result<(), SensorError> {
//!     gyro.configure().await?;
//!     let bias = calibrate(&mut gyro, &CalibrationConfig::gyroscope()).await?;
//!     let sampler = RateSampler::new(SamplerConfig::gyroscope(), bias);
//!     // spawn run_sampler_task(gyro, sampler, &GYRO_SLOT, SamplerTaskConfig::gyroscope())
//!     // ... same for accel/mag, then run_fusion_task(...)
//!     Ok(())
//! }
//! ```

pub mod calibration;
pub mod marg;
pub mod sampling;
pub mod state;
pub mod task;

pub use calibration::{calibrate, BiasOffset, CalibrationConfig};
pub use marg::{EulerAngles, MargConfig, MargFilter};
pub use sampling::{Accumulator, AveragedReading, RateSampler, SamplerConfig};
pub use state::{EulerOutput, SharedEulerState, SharedReadingSlot};
pub use task::{FusionTaskConfig, SamplerTaskConfig};

#[cfg(feature = "embassy")]
pub use task::{run_fusion_task, run_sampler_task};
