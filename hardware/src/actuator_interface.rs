//! Actuator driver trait consumed by the plotting core.
//!
//! A driver owns the physical (or simulated) regulated motors. Each motor is
//! addressed by the [`Port`] it is plugged into and reports its rotation
//! through a feedback counter measured in whole degrees.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Motor output port on the brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Port {
    A,
    B,
    C,
    D,
}

impl Port {
    /// Get the port letter used in logs and config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Port::A => "A",
            Port::B => "B",
            Port::C => "C",
            Port::D => "D",
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Port {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Port::A),
            "B" => Ok(Port::B),
            "C" => Ok(Port::C),
            "D" => Ok(Port::D),
            _ => Err(format!("Invalid port: {s}, expected A-D")),
        }
    }
}

/// Size class of a regulated motor.
///
/// The size class bounds the speed a motor can be regulated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    /// Large regulated motor
    #[strum(serialize = "large")]
    Large,
    /// Medium regulated motor
    #[strum(serialize = "medium")]
    Medium,
}

impl ActuatorKind {
    /// Highest regulated speed in degrees per second.
    pub fn max_speed_dps(self) -> u32 {
        match self {
            ActuatorKind::Large => 1050,
            ActuatorKind::Medium => 1560,
        }
    }
}

/// Errors reported by an actuator driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The port has not been bound with [`ActuatorDriver::configure`].
    #[error("Port {0} is not configured")]
    NotConfigured(Port),

    /// The port was bound twice.
    #[error("Port {0} is already configured")]
    AlreadyConfigured(Port),

    /// Requested speed exceeds what the actuator can regulate.
    #[error("Speed {requested} deg/s out of range for port {port} (max {max})")]
    SpeedOutOfRange {
        port: Port,
        requested: u32,
        max: u32,
    },

    /// A sync bracket was opened on a port with no synchronized followers.
    #[error("Port {0} has no synchronized followers")]
    NotSynchronized(Port),

    /// Sync bracket misuse (nested bracket, wait inside bracket, ...).
    #[error("Sync bracket error: {0}")]
    SyncBracket(String),

    /// Motion did not complete within the allowed time.
    #[error("Timeout after {waited:?} waiting for port {port}")]
    Timeout { port: Port, waited: Duration },

    /// The actuator reports it cannot move.
    #[error("Port {0} is stalled")]
    Stalled(Port),
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Capability contract of a regulated-motor driver.
///
/// Abstracts the hardware so the plotting core can be exercised against the
/// simulated driver in tests.
pub trait ActuatorDriver {
    /// Bind a port to a motor of the given size class.
    fn configure(&mut self, port: Port, kind: ActuatorKind) -> DriverResult<()>;

    /// Declare `followers` as synchronized with `leader`, so that a sync
    /// bracket opened on `leader` also captures their rotations.
    fn synchronize_with(&mut self, leader: Port, followers: &[Port]) -> DriverResult<()>;

    /// Read the feedback counter in degrees since the last reset.
    fn get_position(&mut self, port: Port) -> DriverResult<i32>;

    /// Zero the feedback counter.
    fn reset_position(&mut self, port: Port) -> DriverResult<()>;

    /// Set the regulated speed for subsequent rotations.
    fn set_speed(&mut self, port: Port, degrees_per_second: u32) -> DriverResult<()>;

    /// Rotate by `delta_degrees` from the current physical position.
    ///
    /// With `blocking == false` the call returns as soon as the rotation is
    /// dispatched; use [`wait_complete`](Self::wait_complete) to wait for it.
    fn rotate_by(&mut self, port: Port, delta_degrees: i32, blocking: bool) -> DriverResult<()>;

    /// Open a sync bracket on `leader`. Rotations issued on the leader and
    /// its followers until [`end_sync`](Self::end_sync) start together.
    fn begin_sync(&mut self, leader: Port) -> DriverResult<()>;

    /// Close the sync bracket and release the captured rotations.
    fn end_sync(&mut self, leader: Port) -> DriverResult<()>;

    /// Block until the port's current motion finishes or `timeout` expires.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Timeout`] if the motion is still running after
    /// `timeout`.
    fn wait_complete(&mut self, port: Port, timeout: Duration) -> DriverResult<()>;

    /// Check whether the port is currently moving.
    fn is_moving(&mut self, port: Port) -> DriverResult<bool>;

    /// Stop the port immediately, leaving it where it is.
    fn halt(&mut self, port: Port) -> DriverResult<()>;
}
