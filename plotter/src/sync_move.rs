//! Synchronized traverse+feed moves.
//!
//! Drawing a straight diagonal needs both motors to start at the same
//! instant; started one after the other the stroke comes out kinked. Both
//! rotations are therefore dispatched inside a sync bracket opened on the
//! traverse axis (the feed axis is declared as its follower at session
//! start), and only after the bracket is closed do we wait on either axis.

use std::time::Duration;

use hardware::ActuatorDriver;
use tracing::debug;

use crate::axis::Axis;
use crate::error::{PlotError, PlotResult};

/// Counter targets and deltas for one coordinated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    /// Absolute traverse counter target
    pub traverse_target: i32,
    /// Absolute feed counter target
    pub feed_target: i32,
    /// Traverse rotation to issue
    pub delta_traverse: i32,
    /// Feed rotation to issue
    pub delta_feed: i32,
}

impl MovePlan {
    /// Plan a move to paper position `x` and pen position `y` from the given
    /// counter readings.
    ///
    /// Fails with [`PlotError::CalibrationMismatch`] if either coordinate has
    /// no representable counter target or delta.
    pub fn compute(
        traverse: &Axis,
        feed: &Axis,
        x: f64,
        y: f64,
        current_traverse: i32,
        current_feed: i32,
    ) -> PlotResult<Self> {
        let traverse_target = traverse.degrees_for(y)?;
        let feed_target = feed.degrees_for(x)?;
        Ok(Self {
            traverse_target,
            feed_target,
            delta_traverse: traverse.delta_to(traverse_target, current_traverse)?,
            delta_feed: feed.delta_to(feed_target, current_feed)?,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.delta_traverse == 0 && self.delta_feed == 0
    }
}

/// Move the pen to `(x, y)` in the current glyph frame.
///
/// Steps, in order: read both counters, compute both deltas, apply the
/// calibrated speeds, dispatch both rotations inside one sync bracket, then
/// wait (bounded by `timeout`) on both axes. Zero deltas still go through the
/// bracket so the dispatch path is the same for every move.
pub fn move_to<D: ActuatorDriver>(
    driver: &mut D,
    traverse: &Axis,
    feed: &Axis,
    x: f64,
    y: f64,
    timeout: Duration,
) -> PlotResult<MovePlan> {
    let current_traverse = traverse.current_position(driver)?;
    let current_feed = feed.current_position(driver)?;
    let plan = MovePlan::compute(traverse, feed, x, y, current_traverse, current_feed)?;

    traverse.check_travel(plan.traverse_target)?;
    feed.check_travel(plan.feed_target)?;

    debug!(
        "Move to ({}, {}): traverse {} -> {} ({:+}), feed {} -> {} ({:+})",
        x,
        y,
        current_traverse,
        plan.traverse_target,
        plan.delta_traverse,
        current_feed,
        plan.feed_target,
        plan.delta_feed
    );

    traverse.apply_speed(driver)?;
    feed.apply_speed(driver)?;

    dispatch_synchronized(driver, traverse, feed, &plan, timeout)?;

    traverse.wait_complete(driver, timeout)?;
    feed.wait_complete(driver, timeout)?;
    Ok(plan)
}

/// Issue both rotations inside a sync bracket on the traverse axis.
///
/// The bracket is closed even if a dispatch fails, so the driver is never
/// left with a half-open bracket.
fn dispatch_synchronized<D: ActuatorDriver>(
    driver: &mut D,
    traverse: &Axis,
    feed: &Axis,
    plan: &MovePlan,
    timeout: Duration,
) -> PlotResult<()> {
    let leader = traverse.port();
    driver
        .begin_sync(leader)
        .map_err(|e| PlotError::from_driver(traverse.role(), e))?;

    let issued = traverse
        .rotate_by(driver, plan.delta_traverse, false, timeout)
        .and_then(|_| feed.rotate_by(driver, plan.delta_feed, false, timeout));

    let closed = driver
        .end_sync(leader)
        .map_err(|e| PlotError::from_driver(traverse.role(), e));

    issued?;
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisRole;
    use crate::calibration::AxisCalibration;
    use hardware::sim::{DriverCall, SimulatedDriver};
    use hardware::{ActuatorKind, Port};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn setup() -> (SimulatedDriver, Axis, Axis) {
        let traverse = Axis::new(
            AxisRole::Traverse,
            &AxisCalibration::new(Port::A, ActuatorKind::Medium, 2.8, 420).with_travel(0, 280),
        );
        let feed = Axis::new(
            AxisRole::Feed,
            &AxisCalibration::new(Port::C, ActuatorKind::Large, 3.6, 300),
        );
        let mut driver = SimulatedDriver::new();
        traverse.configure(&mut driver).unwrap();
        feed.configure(&mut driver).unwrap();
        driver.synchronize_with(Port::A, &[Port::C]).unwrap();
        driver.clear_calls();
        (driver, traverse, feed)
    }

    fn index_of(calls: &[DriverCall], pred: impl Fn(&DriverCall) -> bool) -> usize {
        calls.iter().position(pred).expect("call not found")
    }

    #[test]
    fn test_plan_uses_current_counters() {
        let (_, traverse, feed) = setup();
        let plan = MovePlan::compute(&traverse, &feed, 50.0, 100.0, 100, 36).unwrap();
        assert_eq!(
            plan,
            MovePlan {
                traverse_target: 280,
                feed_target: 180,
                delta_traverse: 180,
                delta_feed: 144,
            }
        );
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_move_reaches_target() {
        let (mut driver, traverse, feed) = setup();

        move_to(&mut driver, &traverse, &feed, 50.0, 100.0, TIMEOUT).unwrap();
        assert_eq!(driver.peek_position(Port::A), Some(280));
        assert_eq!(driver.peek_position(Port::C), Some(180));

        let plan = move_to(&mut driver, &traverse, &feed, 25.0, 50.0, TIMEOUT).unwrap();
        assert_eq!(plan.delta_traverse, -140);
        assert_eq!(plan.delta_feed, -90);
        assert_eq!(driver.peek_position(Port::A), Some(140));
        assert_eq!(driver.peek_position(Port::C), Some(90));
    }

    #[test]
    fn test_both_dispatched_before_any_wait() {
        let (mut driver, traverse, feed) = setup();
        move_to(&mut driver, &traverse, &feed, 30.0, 60.0, TIMEOUT).unwrap();

        let calls = driver.calls();
        let begin = index_of(calls, |c| matches!(c, DriverCall::BeginSync(Port::A)));
        let rot_a = index_of(calls, |c| matches!(c, DriverCall::RotateBy { port: Port::A, .. }));
        let rot_c = index_of(calls, |c| matches!(c, DriverCall::RotateBy { port: Port::C, .. }));
        let end = index_of(calls, |c| matches!(c, DriverCall::EndSync(Port::A)));
        let first_wait = index_of(calls, |c| matches!(c, DriverCall::WaitComplete(_)));
        let last_read = calls
            .iter()
            .rposition(|c| matches!(c, DriverCall::GetPosition(_)))
            .unwrap();

        assert!(last_read < begin);
        assert!(begin < rot_a && begin < rot_c);
        assert!(rot_a < end && rot_c < end);
        assert!(end < first_wait);

        let waits: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, DriverCall::WaitComplete(_)))
            .collect();
        assert_eq!(waits.len(), 2);
    }

    #[test]
    fn test_axes_move_concurrently() {
        let (mut driver, traverse, feed) = setup();
        // 280 deg at 420 deg/s and 180 deg at 300 deg/s: 0.667 s and 0.6 s.
        move_to(&mut driver, &traverse, &feed, 50.0, 100.0, TIMEOUT).unwrap();
        let elapsed = driver.elapsed().as_secs_f64();
        approx::assert_relative_eq!(elapsed, 280.0 / 420.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_delta_move_is_noop() {
        let (mut driver, traverse, feed) = setup();
        let plan = move_to(&mut driver, &traverse, &feed, 0.0, 0.0, TIMEOUT).unwrap();

        assert!(plan.is_noop());
        assert_eq!(driver.motion_count(), 0);
        // The bracket and both rotations are still issued
        assert!(driver
            .calls()
            .contains(&DriverCall::BeginSync(Port::A)));
        assert!(driver.calls().contains(&DriverCall::RotateBy {
            port: Port::C,
            delta: 0,
            blocking: false
        }));
    }

    #[test]
    fn test_speeds_applied() {
        let (mut driver, traverse, feed) = setup();
        move_to(&mut driver, &traverse, &feed, 10.0, 10.0, TIMEOUT).unwrap();
        assert_eq!(driver.speed(Port::A), Some(420));
        assert_eq!(driver.speed(Port::C), Some(300));
    }

    #[test]
    fn test_out_of_travel_rejected_before_dispatch() {
        let (mut driver, traverse, feed) = setup();
        let err = move_to(&mut driver, &traverse, &feed, 10.0, 120.0, TIMEOUT).unwrap_err();

        assert!(matches!(
            err,
            PlotError::CalibrationMismatch {
                axis: AxisRole::Traverse,
                ..
            }
        ));
        assert!(!driver
            .calls()
            .iter()
            .any(|c| matches!(c, DriverCall::RotateBy { .. } | DriverCall::BeginSync(_))));
    }

    #[test]
    fn test_bracket_closed_when_dispatch_fails() {
        // Feed never configured: the second rotation fails inside the bracket.
        let traverse = Axis::new(
            AxisRole::Traverse,
            &AxisCalibration::new(Port::A, ActuatorKind::Medium, 2.8, 420),
        );
        let feed = Axis::new(
            AxisRole::Feed,
            &AxisCalibration::new(Port::C, ActuatorKind::Large, 3.6, 300),
        );
        let mut driver = SimulatedDriver::new();
        traverse.configure(&mut driver).unwrap();
        driver.configure(Port::D, ActuatorKind::Large).unwrap();
        driver.synchronize_with(Port::A, &[Port::D]).unwrap();

        let plan = MovePlan::compute(&traverse, &feed, 10.0, 10.0, 0, 0).unwrap();
        let err = dispatch_synchronized(&mut driver, &traverse, &feed, &plan, TIMEOUT).unwrap_err();
        assert!(matches!(err, PlotError::Driver { axis: AxisRole::Feed, .. }));
        assert_eq!(driver.calls().last(), Some(&DriverCall::EndSync(Port::A)));

        // A new bracket can be opened
        driver.begin_sync(Port::A).unwrap();
    }

    #[test]
    fn test_unreachable_coordinates_rejected_before_dispatch() {
        let (mut driver, traverse, feed) = setup();
        move_to(&mut driver, &traverse, &feed, 10.0, 0.0, TIMEOUT).unwrap();
        move_to(&mut driver, &traverse, &feed, 20.0, 50.0, TIMEOUT).unwrap();
        driver.clear_calls();

        for (x, y) in [(-1.0e12, 0.0), (1.0e12, 0.0), (f64::NAN, f64::NAN), (10.0, f64::INFINITY)] {
            let err = move_to(&mut driver, &traverse, &feed, x, y, TIMEOUT).unwrap_err();
            assert!(
                matches!(err, PlotError::CalibrationMismatch { .. }),
                "({x}, {y}) gave {err:?}"
            );
        }
        assert!(!driver
            .calls()
            .iter()
            .any(|c| matches!(c, DriverCall::RotateBy { .. } | DriverCall::BeginSync(_))));
        assert_eq!(driver.peek_position(Port::A), Some(140));
        assert_eq!(driver.peek_position(Port::C), Some(72));
    }

    #[test]
    fn test_stalled_feed_times_out() {
        let (mut driver, traverse, feed) = setup();
        driver.set_stalled(Port::C, true).unwrap();

        let err = move_to(&mut driver, &traverse, &feed, 10.0, 10.0, TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            PlotError::MotionTimeout {
                axis: AxisRole::Feed,
                ..
            }
        ));
    }
}
