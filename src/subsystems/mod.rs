//! Higher-level subsystems built on the device contracts.

pub mod ahrs;
