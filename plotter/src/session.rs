//! Plotter session.
//!
//! A [`Plotter`] exclusively owns the driver and the three calibrated axes
//! for the duration of a print session. Construction is the session
//! initializer: it binds the ports, declares the traverse/feed pair
//! synchronized and refuses to start unless the pen is observed raised.

use std::time::Duration;

use hardware::ActuatorDriver;
use tracing::{info, warn};

use crate::axis::{Axis, AxisRole};
use crate::calibration::CalibrationProfile;
use crate::error::{PlotError, PlotResult};
use crate::pen::{self, PenState};
use crate::sync_move::{self, MovePlan};

/// Exclusive owner of the driver and axes for one print session.
///
/// All motion goes through `&mut self`, so axis access is serialized by
/// construction.
///
/// # Example
///
/// ```
/// use hardware::sim::SimulatedDriver;
/// use plotter::{CalibrationProfile, PenState, Plotter};
///
/// let mut plotter = Plotter::new(SimulatedDriver::new(), CalibrationProfile::banner_print3r())?;
/// plotter.set_pen_state(PenState::Lowered)?;
/// plotter.move_to(50.0, 0.0)?;
/// plotter.set_pen_state(PenState::Raised)?;
/// # Ok::<(), plotter::PlotError>(())
/// ```
pub struct Plotter<D: ActuatorDriver> {
    driver: D,
    profile: CalibrationProfile,
    lift: Axis,
    traverse: Axis,
    feed: Axis,
    pen: PenState,
}

impl<D: ActuatorDriver> Plotter<D> {
    /// Start a session on `driver` with the given calibration.
    ///
    /// # Errors
    ///
    /// - [`PlotError::InvalidProfile`] if the profile fails validation
    /// - [`PlotError::CalibrationMismatch`] if the lift counter does not read
    ///   raised (within `pen_tolerance_degrees`)
    /// - [`PlotError::Driver`] if a port cannot be bound
    pub fn new(mut driver: D, profile: CalibrationProfile) -> PlotResult<Self> {
        profile.validate()?;

        let lift = Axis::new(AxisRole::Lift, &profile.lift);
        let traverse = Axis::new(AxisRole::Traverse, &profile.traverse);
        let feed = Axis::new(AxisRole::Feed, &profile.feed);

        for axis in [&lift, &traverse, &feed] {
            axis.configure(&mut driver)?;
        }
        driver
            .synchronize_with(traverse.port(), &[feed.port()])
            .map_err(|e| PlotError::from_driver(AxisRole::Traverse, e))?;

        let raised = lift.degrees_for(PenState::Raised.stroke_units())?;
        let position = lift.current_position(&mut driver)?;
        if (position - raised).abs() > profile.pen_tolerance_degrees {
            return Err(PlotError::CalibrationMismatch {
                axis: AxisRole::Lift,
                detail: format!(
                    "pen must be raised at session start: counter reads {position}, \
                     expected {raised} +/- {}",
                    profile.pen_tolerance_degrees
                ),
            });
        }

        feed.reset_origin(&mut driver)?;

        info!(
            "Plotter session started with profile '{}' (lift {}, traverse {}, feed {})",
            profile.name,
            lift.port(),
            traverse.port(),
            feed.port()
        );

        Ok(Self {
            driver,
            profile,
            lift,
            traverse,
            feed,
            pen: PenState::Raised,
        })
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// End the session and hand the driver back.
    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn axis(&self, role: AxisRole) -> &Axis {
        match role {
            AxisRole::Lift => &self.lift,
            AxisRole::Traverse => &self.traverse,
            AxisRole::Feed => &self.feed,
        }
    }

    /// Last pen state that was reached.
    pub fn pen_state(&self) -> PenState {
        self.pen
    }

    pub fn motion_timeout(&self) -> Duration {
        self.profile.motion_timeout()
    }

    /// Raise or lower the pen, blocking until it settles.
    ///
    /// Returns the lift delta issued (0 if the pen was already there).
    pub fn set_pen_state(&mut self, state: PenState) -> PlotResult<i32> {
        let timeout = self.motion_timeout();
        let delta = pen::set_pen_state(&mut self.driver, &self.lift, state, timeout)?;
        self.pen = state;
        Ok(delta)
    }

    /// Coordinated move of the pen to `(x, y)` in the current glyph frame.
    pub fn move_to(&mut self, x: f64, y: f64) -> PlotResult<MovePlan> {
        let timeout = self.motion_timeout();
        sync_move::move_to(
            &mut self.driver,
            &self.traverse,
            &self.feed,
            x,
            y,
            timeout,
        )
    }

    /// Make the current paper position the feed axis' local zero.
    pub fn reset_feed_origin(&mut self) -> PlotResult<()> {
        self.feed.reset_origin(&mut self.driver)
    }

    /// Feed counter relative to the current glyph frame.
    pub fn feed_position(&mut self) -> PlotResult<i32> {
        self.feed.current_position(&mut self.driver)
    }

    /// Bring the mechanism to rest: halt every axis, then raise the pen.
    ///
    /// Failures here are logged, not returned; the caller is already
    /// propagating the error that triggered the stop.
    pub fn make_safe(&mut self) {
        for axis in [&self.traverse, &self.feed, &self.lift] {
            if let Err(e) = axis.halt(&mut self.driver) {
                warn!("Failed to halt {} axis: {}", axis.role(), e);
            }
        }
        match self.set_pen_state(PenState::Raised) {
            Ok(_) => info!("Mechanism stopped with pen raised"),
            Err(e) => warn!("Failed to raise pen while stopping: {}", e),
        }
    }
}
