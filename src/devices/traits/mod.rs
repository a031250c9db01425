//! Device trait definitions
//!
//! Hardware-independent contracts for the sensors the pipeline consumes.
//! These enable unit testing with mock implementations and keep the
//! fusion code independent of any particular chip or bus.

pub mod axes;

pub use axes::{RawSample, SensorError, ThreeAxisSensor};
