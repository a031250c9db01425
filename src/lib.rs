#![cfg_attr(not(test), no_std)]

//! marg-ahrs - Multi-rate MARG attitude estimation pipeline
//!
//! This library fuses a gyroscope, an accelerometer and a magnetometer,
//! each sampled by its own periodic task at its own rate, into a single
//! orientation quaternion using Sebastian Madgwick's gradient-descent
//! MARG filter, and reports roll/pitch/yaw relative to the pose the body
//! had when fusion started.
//!
//! The crate contains no bus drivers and performs no allocation: sensors
//! are reached through the [`devices::traits::ThreeAxisSensor`] contract,
//! periodic timing comes from `embassy-time` (behind the `embassy`
//! feature), and all cross-task state lives in statically-allocated
//! shared slots.

// Logging macros and other cross-cutting infrastructure.
pub mod core;

// Sensor collaborator contracts and test doubles.
pub mod devices;

// The sampling/calibration pipeline and the orientation filter.
pub mod subsystems;
