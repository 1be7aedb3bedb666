//! Actuator drivers for the banner plotter.
//!
//! This crate defines the capability contract the plotting core consumes
//! ([`ActuatorDriver`]) and ships an in-process simulated implementation that
//! models feedback counters, synchronized dispatch and bounded completion
//! waits without any hardware attached.
//!
//! # Features
//!
//! - `sim` - Simulated actuators (enabled by default, used by tests and dry runs)

pub mod actuator_interface;

#[cfg(feature = "sim")]
pub mod sim;

pub use actuator_interface::{ActuatorDriver, ActuatorKind, DriverError, DriverResult, Port};
