//! One calibrated motor axis.
//!
//! An [`Axis`] knows its port, gearing and travel limits, but never caches
//! the feedback counter: every read goes to the driver, so a delta is always
//! computed against the counter as it stands right before the move.

use std::time::Duration;

use hardware::{ActuatorDriver, ActuatorKind, Port};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::AxisCalibration;
use crate::error::{PlotError, PlotResult};

/// The three axes of the plotter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum AxisRole {
    /// Raises and lowers the pen
    Lift,
    /// Moves the pen across the paper strip
    Traverse,
    /// Advances the paper strip
    Feed,
}

impl AxisRole {
    pub const ALL: [AxisRole; 3] = [AxisRole::Lift, AxisRole::Traverse, AxisRole::Feed];
}

/// A calibrated axis bound to one driver port.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    role: AxisRole,
    port: Port,
    kind: ActuatorKind,
    degrees_per_unit: f64,
    speed_dps: u32,
    travel_degrees: Option<(i32, i32)>,
}

impl Axis {
    pub fn new(role: AxisRole, calibration: &AxisCalibration) -> Self {
        Self {
            role,
            port: calibration.port,
            kind: calibration.kind,
            degrees_per_unit: calibration.degrees_per_unit,
            speed_dps: calibration.speed_dps,
            travel_degrees: calibration.travel_degrees,
        }
    }

    pub fn role(&self) -> AxisRole {
        self.role
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn kind(&self) -> ActuatorKind {
        self.kind
    }

    pub fn degrees_per_unit(&self) -> f64 {
        self.degrees_per_unit
    }

    pub fn speed_dps(&self) -> u32 {
        self.speed_dps
    }

    /// Counter target for a logical coordinate, rounded to whole degrees.
    ///
    /// Non-finite coordinates and targets beyond the counter range are
    /// rejected rather than saturated.
    pub fn degrees_for(&self, units: f64) -> PlotResult<i32> {
        let degrees = (units * self.degrees_per_unit).round();
        if !degrees.is_finite() || degrees < i32::MIN as f64 || degrees > i32::MAX as f64 {
            return Err(PlotError::CalibrationMismatch {
                axis: self.role,
                detail: format!("coordinate {units} has no reachable counter target"),
            });
        }
        Ok(degrees as i32)
    }

    /// Rotation from `current` to `target`, rejected if it overflows the
    /// counter.
    pub fn delta_to(&self, target: i32, current: i32) -> PlotResult<i32> {
        target
            .checked_sub(current)
            .ok_or_else(|| PlotError::CalibrationMismatch {
                axis: self.role,
                detail: format!("rotation from {current} to {target} deg overflows the counter"),
            })
    }

    /// Reject a counter target the axis cannot physically reach.
    pub fn check_travel(&self, target_degrees: i32) -> PlotResult<()> {
        match self.travel_degrees {
            Some((min, max)) if target_degrees < min || target_degrees > max => {
                Err(PlotError::CalibrationMismatch {
                    axis: self.role,
                    detail: format!("target {target_degrees} deg outside travel [{min}, {max}]"),
                })
            }
            _ => Ok(()),
        }
    }

    fn wrap<T>(&self, result: hardware::DriverResult<T>) -> PlotResult<T> {
        result.map_err(|e| PlotError::from_driver(self.role, e))
    }

    /// Bind the port on the driver.
    pub fn configure<D: ActuatorDriver>(&self, driver: &mut D) -> PlotResult<()> {
        self.wrap(driver.configure(self.port, self.kind))
    }

    /// Read the feedback counter.
    pub fn current_position<D: ActuatorDriver>(&self, driver: &mut D) -> PlotResult<i32> {
        self.wrap(driver.get_position(self.port))
    }

    /// Zero the feedback counter, making the current physical position the
    /// axis' local origin.
    pub fn reset_origin<D: ActuatorDriver>(&self, driver: &mut D) -> PlotResult<()> {
        debug!("Resetting {} origin (port {})", self.role, self.port);
        self.wrap(driver.reset_position(self.port))
    }

    /// Apply the calibrated regulated speed.
    pub fn apply_speed<D: ActuatorDriver>(&self, driver: &mut D) -> PlotResult<()> {
        self.wrap(driver.set_speed(self.port, self.speed_dps))
    }

    /// Issue one rotation of `delta_degrees` from the current position.
    ///
    /// The rotation is dispatched exactly once. With `blocking` the call waits
    /// up to `timeout` for the axis to settle; otherwise it returns right after
    /// dispatch and the caller must [`wait_complete`](Self::wait_complete).
    pub fn rotate_by<D: ActuatorDriver>(
        &self,
        driver: &mut D,
        delta_degrees: i32,
        blocking: bool,
        timeout: Duration,
    ) -> PlotResult<()> {
        self.wrap(driver.rotate_by(self.port, delta_degrees, false))?;
        if blocking {
            self.wait_complete(driver, timeout)?;
        }
        Ok(())
    }

    /// Wait up to `timeout` for the current motion to finish.
    pub fn wait_complete<D: ActuatorDriver>(
        &self,
        driver: &mut D,
        timeout: Duration,
    ) -> PlotResult<()> {
        self.wrap(driver.wait_complete(self.port, timeout))
    }

    /// Stop the axis where it is.
    pub fn halt<D: ActuatorDriver>(&self, driver: &mut D) -> PlotResult<()> {
        self.wrap(driver.halt(self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardware::sim::SimulatedDriver;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn feed_axis() -> Axis {
        Axis::new(
            AxisRole::Feed,
            &AxisCalibration::new(Port::C, ActuatorKind::Large, 3.6, 300),
        )
    }

    #[test]
    fn test_degrees_for_rounds() {
        let axis = feed_axis();
        assert_eq!(axis.degrees_for(0.0).unwrap(), 0);
        assert_eq!(axis.degrees_for(50.0).unwrap(), 180);
        assert_eq!(axis.degrees_for(12.5).unwrap(), 45);
        assert_eq!(axis.degrees_for(1.1).unwrap(), 4);
        assert_eq!(axis.degrees_for(-10.0).unwrap(), -36);
    }

    #[test]
    fn test_unreachable_coordinates_rejected() {
        let axis = feed_axis();
        for units in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.0e12, -1.0e12] {
            assert!(
                matches!(
                    axis.degrees_for(units),
                    Err(PlotError::CalibrationMismatch {
                        axis: AxisRole::Feed,
                        ..
                    })
                ),
                "{units} accepted"
            );
        }
    }

    #[test]
    fn test_delta_overflow_rejected() {
        let axis = feed_axis();
        assert_eq!(axis.delta_to(180, 36).unwrap(), 144);
        assert!(matches!(
            axis.delta_to(i32::MIN + 1, 36),
            Err(PlotError::CalibrationMismatch { .. })
        ));
        assert!(axis.delta_to(i32::MAX, -1).is_err());
    }

    #[test]
    fn test_rotation_reaches_calibrated_target() {
        let axis = feed_axis();
        let mut driver = SimulatedDriver::new();
        axis.configure(&mut driver).unwrap();
        axis.apply_speed(&mut driver).unwrap();

        for target in [10.0, 60.0, 33.3, 0.0] {
            let current = axis.current_position(&mut driver).unwrap();
            let delta = axis.degrees_for(target).unwrap() - current;
            axis.rotate_by(&mut driver, delta, true, TIMEOUT).unwrap();

            let reached = axis.current_position(&mut driver).unwrap();
            assert!((reached - axis.degrees_for(target).unwrap()).abs() <= 1);
        }
    }

    #[test]
    fn test_reset_origin() {
        let axis = feed_axis();
        let mut driver = SimulatedDriver::new();
        axis.configure(&mut driver).unwrap();
        axis.rotate_by(&mut driver, 252, true, TIMEOUT).unwrap();
        axis.reset_origin(&mut driver).unwrap();
        assert_eq!(axis.current_position(&mut driver).unwrap(), 0);
    }

    #[test]
    fn test_travel_limits() {
        let axis = Axis::new(
            AxisRole::Traverse,
            &AxisCalibration::new(Port::A, ActuatorKind::Medium, 2.8, 420).with_travel(0, 280),
        );
        assert!(axis.check_travel(0).is_ok());
        assert!(axis.check_travel(280).is_ok());
        assert!(matches!(
            axis.check_travel(281),
            Err(PlotError::CalibrationMismatch {
                axis: AxisRole::Traverse,
                ..
            })
        ));
        assert!(axis.check_travel(-1).is_err());

        // Unbounded axes accept anything
        assert!(feed_axis().check_travel(i32::MAX).is_ok());
    }

    #[test]
    fn test_stalled_axis_reports_motion_timeout() {
        let axis = feed_axis();
        let mut driver = SimulatedDriver::new();
        axis.configure(&mut driver).unwrap();
        driver.set_stalled(Port::C, true).unwrap();

        let err = axis
            .rotate_by(&mut driver, 90, true, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(
            err,
            PlotError::MotionTimeout {
                axis: AxisRole::Feed,
                ..
            }
        ));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(AxisRole::Traverse.to_string(), "traverse");
        assert_eq!(AxisRole::ALL.len(), 3);
    }
}
