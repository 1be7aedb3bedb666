//! Pen state controller.
//!
//! The lift axis has two absolute positions relative to its local origin:
//! raised (0 strokes) and lowered (1 stroke, 180 degrees on the stock
//! gearing). Moves are always blocking: a stroke must not start before the
//! pen has settled.

use std::time::Duration;

use hardware::ActuatorDriver;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis::Axis;
use crate::error::PlotResult;

/// Vertical state of the pen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum PenState {
    /// Pen off the paper
    #[default]
    Raised,
    /// Pen touching the paper
    Lowered,
}

impl PenState {
    pub fn from_lifted(lifted: bool) -> Self {
        if lifted {
            PenState::Raised
        } else {
            PenState::Lowered
        }
    }

    pub fn is_lifted(self) -> bool {
        self == PenState::Raised
    }

    /// Lift axis position in strokes.
    pub fn stroke_units(self) -> f64 {
        match self {
            PenState::Raised => 0.0,
            PenState::Lowered => 1.0,
        }
    }
}

/// Drive the lift axis to `state` and block until it settles.
///
/// Returns the delta that was issued; repeating a state yields a delta of 0.
pub fn set_pen_state<D: ActuatorDriver>(
    driver: &mut D,
    lift: &Axis,
    state: PenState,
    timeout: Duration,
) -> PlotResult<i32> {
    let target = lift.degrees_for(state.stroke_units())?;
    lift.check_travel(target)?;

    lift.apply_speed(driver)?;
    let current = lift.current_position(driver)?;
    let delta = lift.delta_to(target, current)?;
    debug!("Pen -> {} (lift {} -> {}, delta {})", state, current, target, delta);

    lift.rotate_by(driver, delta, true, timeout)?;
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisRole;
    use crate::calibration::AxisCalibration;
    use crate::error::PlotError;
    use hardware::sim::SimulatedDriver;
    use hardware::{ActuatorKind, Port};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn lift_setup() -> (SimulatedDriver, Axis) {
        let lift = Axis::new(
            AxisRole::Lift,
            &AxisCalibration::new(Port::B, ActuatorKind::Large, 180.0, 600).with_travel(0, 180),
        );
        let mut driver = SimulatedDriver::new();
        lift.configure(&mut driver).unwrap();
        (driver, lift)
    }

    #[test]
    fn test_lower_then_raise() {
        let (mut driver, lift) = lift_setup();

        assert_eq!(
            set_pen_state(&mut driver, &lift, PenState::Lowered, TIMEOUT).unwrap(),
            180
        );
        assert_eq!(driver.peek_position(Port::B), Some(180));

        assert_eq!(
            set_pen_state(&mut driver, &lift, PenState::Raised, TIMEOUT).unwrap(),
            -180
        );
        assert_eq!(driver.peek_position(Port::B), Some(0));
    }

    #[test]
    fn test_repeated_state_is_zero_delta() {
        let (mut driver, lift) = lift_setup();

        set_pen_state(&mut driver, &lift, PenState::Raised, TIMEOUT).unwrap();
        let second = set_pen_state(&mut driver, &lift, PenState::Raised, TIMEOUT).unwrap();
        assert_eq!(second, 0);

        set_pen_state(&mut driver, &lift, PenState::Lowered, TIMEOUT).unwrap();
        let second = set_pen_state(&mut driver, &lift, PenState::Lowered, TIMEOUT).unwrap();
        assert_eq!(second, 0);
        assert_eq!(driver.motion_count(), 1);
    }

    #[test]
    fn test_corrects_drifted_counter() {
        let (mut driver, lift) = lift_setup();
        driver.set_position(Port::B, 175).unwrap();

        let delta = set_pen_state(&mut driver, &lift, PenState::Lowered, TIMEOUT).unwrap();
        assert_eq!(delta, 5);
    }

    #[test]
    fn test_stalled_lift_times_out() {
        let (mut driver, lift) = lift_setup();
        driver.set_stalled(Port::B, true).unwrap();

        let err = set_pen_state(&mut driver, &lift, PenState::Lowered, TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            PlotError::MotionTimeout {
                axis: AxisRole::Lift,
                waited
            } if waited == TIMEOUT
        ));
    }

    #[test]
    fn test_lowered_outside_travel_is_rejected_before_dispatch() {
        let lift = Axis::new(
            AxisRole::Lift,
            &AxisCalibration::new(Port::B, ActuatorKind::Large, 200.0, 600).with_travel(0, 180),
        );
        let mut driver = SimulatedDriver::new();
        lift.configure(&mut driver).unwrap();
        driver.clear_calls();

        assert!(matches!(
            set_pen_state(&mut driver, &lift, PenState::Lowered, TIMEOUT),
            Err(PlotError::CalibrationMismatch { .. })
        ));
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_from_lifted() {
        assert_eq!(PenState::from_lifted(true), PenState::Raised);
        assert!(!PenState::from_lifted(false).is_lifted());
        assert_eq!(PenState::default(), PenState::Raised);
    }
}
