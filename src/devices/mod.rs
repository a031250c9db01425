//! Sensor collaborator contracts
//!
//! The sampling pipeline never talks to a bus directly: every sensor is
//! reached through the [`traits::ThreeAxisSensor`] contract. Register-level
//! drivers live in the firmware binary next to its HAL; this module only
//! defines the boundary and a mock implementation for tests.

pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use traits::{RawSample, SensorError, ThreeAxisSensor};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockAxisSensor;
