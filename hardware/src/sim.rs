//! Simulated regulated motors.
//!
//! [`SimulatedDriver`] implements [`ActuatorDriver`] entirely in memory. It
//! keeps a feedback counter per port, models travel time from the regulated
//! speed on a simulated clock (nothing sleeps), defers rotations issued inside
//! a sync bracket until the bracket closes, and records every call so tests
//! can assert on ordering.
//!
//! # Example
//!
//! ```
//! use hardware::sim::SimulatedDriver;
//! use hardware::{ActuatorDriver, ActuatorKind, Port};
//! use std::time::Duration;
//!
//! let mut driver = SimulatedDriver::new();
//! driver.configure(Port::A, ActuatorKind::Large)?;
//! driver.set_speed(Port::A, 360)?;
//! driver.rotate_by(Port::A, 180, false)?;
//! driver.wait_complete(Port::A, Duration::from_secs(1))?;
//! assert_eq!(driver.get_position(Port::A)?, 180);
//! # Ok::<(), hardware::DriverError>(())
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, trace};

use crate::actuator_interface::{ActuatorDriver, ActuatorKind, DriverError, DriverResult, Port};

/// Timeout applied to `rotate_by(.., blocking = true)`.
const DEFAULT_BLOCKING_TIMEOUT: Duration = Duration::from_secs(30);

/// One recorded call into the simulated driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Configure { port: Port, kind: ActuatorKind },
    SynchronizeWith { leader: Port, followers: Vec<Port> },
    GetPosition(Port),
    ResetPosition(Port),
    SetSpeed { port: Port, degrees_per_second: u32 },
    RotateBy { port: Port, delta: i32, blocking: bool },
    BeginSync(Port),
    EndSync(Port),
    WaitComplete(Port),
    IsMoving(Port),
    Halt(Port),
}

/// A rotation in flight. `start` is `None` while it is captured by an open
/// sync bracket.
#[derive(Debug, Clone, Copy)]
struct Motion {
    from: i32,
    target: i32,
    start: Option<Duration>,
    duration: Duration,
}

impl Motion {
    fn end(&self) -> Option<Duration> {
        self.start.map(|s| s + self.duration)
    }

    /// Counter value at `clock`, interpolated linearly over the travel time.
    fn position_at(&self, clock: Duration) -> i32 {
        let Some(start) = self.start else {
            return self.from;
        };
        if self.duration.is_zero() || clock >= start + self.duration {
            return self.target;
        }
        let frac = clock.saturating_sub(start).as_secs_f64() / self.duration.as_secs_f64();
        self.from + ((self.target - self.from) as f64 * frac).round() as i32
    }
}

#[derive(Debug, Clone)]
struct SimMotor {
    kind: ActuatorKind,
    position: i32,
    speed_dps: u32,
    motion: Option<Motion>,
    followers: Vec<Port>,
    stalled: bool,
}

impl SimMotor {
    fn new(kind: ActuatorKind) -> Self {
        Self {
            kind,
            position: 0,
            speed_dps: kind.max_speed_dps() / 2,
            motion: None,
            followers: Vec::new(),
            stalled: false,
        }
    }

    /// Fold a finished motion into the counter.
    fn settle(&mut self, clock: Duration) {
        if let Some(motion) = self.motion {
            if !self.stalled && motion.end().is_some_and(|end| clock >= end) {
                self.position = motion.target;
                self.motion = None;
            }
        }
    }

    fn position_at(&self, clock: Duration) -> i32 {
        match self.motion {
            Some(_) if self.stalled => self.position,
            Some(motion) => motion.position_at(clock),
            None => self.position,
        }
    }

    fn travel_time(&self, delta: i32) -> Duration {
        Duration::from_secs_f64(delta.unsigned_abs() as f64 / self.speed_dps as f64)
    }
}

#[derive(Debug, Clone)]
struct OpenBracket {
    leader: Port,
    members: Vec<Port>,
}

/// In-memory implementation of [`ActuatorDriver`].
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    motors: BTreeMap<Port, SimMotor>,
    bracket: Option<OpenBracket>,
    clock: Duration,
    calls: Vec<DriverCall>,
    motion_count: usize,
    blocking_timeout: Duration,
    initial_positions: BTreeMap<Port, i32>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// Create a driver with no ports configured.
    pub fn new() -> Self {
        Self {
            motors: BTreeMap::new(),
            bracket: None,
            clock: Duration::ZERO,
            calls: Vec::new(),
            motion_count: 0,
            blocking_timeout: DEFAULT_BLOCKING_TIMEOUT,
            initial_positions: BTreeMap::new(),
        }
    }

    /// Counter value a port reports once it is configured, modelling a
    /// mechanism left displaced by a previous run.
    pub fn with_initial_position(mut self, port: Port, degrees: i32) -> Self {
        self.initial_positions.insert(port, degrees);
        self
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of rotations that physically moved a motor (non-zero deltas).
    pub fn motion_count(&self) -> usize {
        self.motion_count
    }

    /// Simulated time spent waiting on motion.
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Counter value of a port without recording a call.
    pub fn peek_position(&self, port: Port) -> Option<i32> {
        self.motors.get(&port).map(|m| m.position_at(self.clock))
    }

    /// Current regulated speed of a port.
    pub fn speed(&self, port: Port) -> Option<u32> {
        self.motors.get(&port).map(|m| m.speed_dps)
    }

    /// Force a port's feedback counter, as if the mechanism had been moved by hand.
    pub fn set_position(&mut self, port: Port, degrees: i32) -> DriverResult<()> {
        let motor = self.motor_mut(port)?;
        motor.motion = None;
        motor.position = degrees;
        Ok(())
    }

    /// Make every motion on `port` hang until the port is un-stalled.
    pub fn set_stalled(&mut self, port: Port, stalled: bool) -> DriverResult<()> {
        self.motor_mut(port)?.stalled = stalled;
        Ok(())
    }

    /// Override the timeout used by blocking rotations.
    pub fn set_blocking_timeout(&mut self, timeout: Duration) {
        self.blocking_timeout = timeout;
    }

    fn motor_mut(&mut self, port: Port) -> DriverResult<&mut SimMotor> {
        self.motors
            .get_mut(&port)
            .ok_or(DriverError::NotConfigured(port))
    }

    fn record(&mut self, call: DriverCall) {
        trace!("sim driver: {:?}", call);
        self.calls.push(call);
    }

    fn in_open_bracket(&self, port: Port) -> bool {
        self.bracket
            .as_ref()
            .is_some_and(|b| b.members.contains(&port))
    }

    /// Start a rotation on `port` at the current clock.
    fn dispatch(&mut self, port: Port, delta: i32, deferred: bool) -> DriverResult<()> {
        let clock = self.clock;
        let motor = self.motor_mut(port)?;
        motor.settle(clock);
        let from = motor.position_at(clock);
        motor.position = from;
        motor.motion = Some(Motion {
            from,
            target: from + delta,
            start: if deferred { None } else { Some(clock) },
            duration: motor.travel_time(delta),
        });
        if !deferred {
            self.motion_count += 1;
        }
        Ok(())
    }
}

impl ActuatorDriver for SimulatedDriver {
    fn configure(&mut self, port: Port, kind: ActuatorKind) -> DriverResult<()> {
        self.record(DriverCall::Configure { port, kind });
        if self.motors.contains_key(&port) {
            return Err(DriverError::AlreadyConfigured(port));
        }
        debug!("sim driver: port {} bound to {} motor", port, kind);
        let mut motor = SimMotor::new(kind);
        motor.position = self.initial_positions.get(&port).copied().unwrap_or(0);
        self.motors.insert(port, motor);
        Ok(())
    }

    fn synchronize_with(&mut self, leader: Port, followers: &[Port]) -> DriverResult<()> {
        self.record(DriverCall::SynchronizeWith {
            leader,
            followers: followers.to_vec(),
        });
        for follower in followers {
            self.motor_mut(*follower)?;
        }
        self.motor_mut(leader)?.followers = followers.to_vec();
        Ok(())
    }

    fn get_position(&mut self, port: Port) -> DriverResult<i32> {
        self.record(DriverCall::GetPosition(port));
        let clock = self.clock;
        let motor = self.motor_mut(port)?;
        motor.settle(clock);
        Ok(motor.position_at(clock))
    }

    fn reset_position(&mut self, port: Port) -> DriverResult<()> {
        self.record(DriverCall::ResetPosition(port));
        let clock = self.clock;
        let motor = self.motor_mut(port)?;
        motor.settle(clock);
        match motor.motion.as_mut() {
            // Re-base an in-flight motion so it still travels the same distance.
            Some(motion) => {
                let current = motion.position_at(clock);
                motion.from -= current;
                motion.target -= current;
                motor.position = 0;
            }
            None => motor.position = 0,
        }
        Ok(())
    }

    fn set_speed(&mut self, port: Port, degrees_per_second: u32) -> DriverResult<()> {
        self.record(DriverCall::SetSpeed {
            port,
            degrees_per_second,
        });
        let motor = self.motor_mut(port)?;
        let max = motor.kind.max_speed_dps();
        if degrees_per_second == 0 || degrees_per_second > max {
            return Err(DriverError::SpeedOutOfRange {
                port,
                requested: degrees_per_second,
                max,
            });
        }
        motor.speed_dps = degrees_per_second;
        Ok(())
    }

    fn rotate_by(&mut self, port: Port, delta_degrees: i32, blocking: bool) -> DriverResult<()> {
        self.record(DriverCall::RotateBy {
            port,
            delta: delta_degrees,
            blocking,
        });
        self.motor_mut(port)?;

        if self.in_open_bracket(port) {
            if blocking {
                return Err(DriverError::SyncBracket(format!(
                    "blocking rotation on port {port} inside sync bracket"
                )));
            }
            if delta_degrees != 0 {
                self.dispatch(port, delta_degrees, true)?;
            }
            return Ok(());
        }

        if delta_degrees == 0 {
            return Ok(());
        }
        self.dispatch(port, delta_degrees, false)?;
        if blocking {
            let timeout = self.blocking_timeout;
            self.wait_complete(port, timeout)?;
        }
        Ok(())
    }

    fn begin_sync(&mut self, leader: Port) -> DriverResult<()> {
        self.record(DriverCall::BeginSync(leader));
        if let Some(open) = &self.bracket {
            return Err(DriverError::SyncBracket(format!(
                "bracket already open on port {}",
                open.leader
            )));
        }
        let motor = self.motor_mut(leader)?;
        if motor.followers.is_empty() {
            return Err(DriverError::NotSynchronized(leader));
        }
        let mut members = vec![leader];
        members.extend(motor.followers.iter().copied());
        self.bracket = Some(OpenBracket { leader, members });
        Ok(())
    }

    fn end_sync(&mut self, leader: Port) -> DriverResult<()> {
        self.record(DriverCall::EndSync(leader));
        let bracket = match self.bracket.take() {
            Some(b) if b.leader == leader => b,
            other => {
                self.bracket = other;
                return Err(DriverError::SyncBracket(format!(
                    "no bracket open on port {leader}"
                )));
            }
        };

        let clock = self.clock;
        for port in bracket.members {
            if let Some(motion) = self
                .motors
                .get_mut(&port)
                .and_then(|m| m.motion.as_mut())
                .filter(|m| m.start.is_none())
            {
                motion.start = Some(clock);
                self.motion_count += 1;
            }
        }
        Ok(())
    }

    fn wait_complete(&mut self, port: Port, timeout: Duration) -> DriverResult<()> {
        self.record(DriverCall::WaitComplete(port));
        if self.in_open_bracket(port) {
            return Err(DriverError::SyncBracket(format!(
                "wait on port {port} inside open sync bracket"
            )));
        }

        let clock = self.clock;
        let motor = self.motor_mut(port)?;
        motor.settle(clock);
        let Some(motion) = motor.motion else {
            return Ok(());
        };

        let remaining = match motion.end() {
            Some(end) if !motor.stalled => end.saturating_sub(clock),
            _ => Duration::MAX,
        };
        if remaining > timeout {
            self.clock += timeout;
            return Err(DriverError::Timeout {
                port,
                waited: timeout,
            });
        }

        self.clock += remaining;
        let clock = self.clock;
        self.motor_mut(port)?.settle(clock);
        Ok(())
    }

    fn is_moving(&mut self, port: Port) -> DriverResult<bool> {
        self.record(DriverCall::IsMoving(port));
        let clock = self.clock;
        let motor = self.motor_mut(port)?;
        motor.settle(clock);
        Ok(motor.motion.is_some())
    }

    fn halt(&mut self, port: Port) -> DriverResult<()> {
        self.record(DriverCall::Halt(port));
        let clock = self.clock;
        let motor = self.motor_mut(port)?;
        motor.position = motor.position_at(clock);
        motor.motion = None;
        Ok(())
    }
}
