//! Three-axis sensor trait and data types
//!
//! Every inertial/magnetic sensor in the pipeline (accelerometer,
//! gyroscope, magnetometer) exposes the same narrow contract: one-time
//! configuration register writes, then repeated reads of a signed 16-bit
//! axis triple. Chip-specific register maps, addressing and bus framing
//! stay behind implementations of this trait.
//!
//! ## Usage
//!
//! ```ignore
//! use marg_ahrs::devices::traits::{RawSample, SensorError, ThreeAxisSensor};
//!
//! async fn drain<S: ThreeAxisSensor>(mut sensor: S) -> Result<(), SensorError> {
//!     sensor.configure().await?;
//!     loop {
//!         let raw = sensor.read_axes().await?;
//!         // fold raw.x, raw.y, raw.z into the pipeline
//!     }
//! }
//! ```

use nalgebra::Vector3;

/// Sensor error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus communication failed (I2C/SPI fault, NACK, timeout)
    Io,

    /// Data validation failed (e.g. overflow flag, stuck values)
    InvalidData,

    /// Device has not been configured yet
    NotInitialized,
}

/// One raw axis triple as read from a sensor's output registers.
///
/// Values are device counts; scaling to physical units happens in the
/// rate sampler, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl RawSample {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Widen to a floating-point vector for accumulation.
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

/// Device-independent interface for raw three-axis sensors.
///
/// Implementations wrap a concrete chip (e.g. an I2C accelerometer) and
/// map bus faults to [`SensorError::Io`]. Callers must not mask an `Io`
/// error by substituting a fabricated reading; the sampling task skips
/// the cycle instead.
#[allow(async_fn_in_trait)]
pub trait ThreeAxisSensor {
    /// Perform the device's one-time configuration register writes.
    ///
    /// Must complete successfully before the first `read_axes` call.
    async fn configure(&mut self) -> Result<(), SensorError>;

    /// Read the current axis triple from the device.
    async fn read_axes(&mut self) -> Result<RawSample, SensorError>;

    /// Whether the device is producing valid data.
    ///
    /// Returns `false` after repeated communication errors.
    fn is_healthy(&self) -> bool;
}
