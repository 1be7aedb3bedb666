//! Calibration profiles.
//!
//! A profile captures everything that differs between hardware revisions of
//! the plotter: which port each axis is wired to, the motor size, the gearing
//! (degrees of motor rotation per logical unit), regulated speeds and travel
//! limits. Profiles are fixed for the lifetime of a session.

use std::path::Path;
use std::time::Duration;

use hardware::{ActuatorKind, Port};
use serde::{Deserialize, Serialize};

use crate::axis::AxisRole;
use crate::error::{PlotError, PlotResult};

/// Calibration of a single axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Port the motor is plugged into
    pub port: Port,
    /// Motor size class
    pub kind: ActuatorKind,
    /// Degrees of motor rotation per logical unit
    pub degrees_per_unit: f64,
    /// Regulated speed in degrees per second
    pub speed_dps: u32,
    /// Reachable counter range `(min, max)` in degrees, if the axis is bounded
    #[serde(default)]
    pub travel_degrees: Option<(i32, i32)>,
}

impl AxisCalibration {
    pub fn new(port: Port, kind: ActuatorKind, degrees_per_unit: f64, speed_dps: u32) -> Self {
        Self {
            port,
            kind,
            degrees_per_unit,
            speed_dps,
            travel_degrees: None,
        }
    }

    /// Bound the axis to a counter range.
    pub fn with_travel(mut self, min: i32, max: i32) -> Self {
        self.travel_degrees = Some((min, max));
        self
    }
}

/// Full calibration of the plotter.
///
/// Units per axis:
/// - lift: one unit is a full pen stroke (0 = raised, 1 = lowered)
/// - traverse: pen position across the strip, 0-100 within a glyph cell
/// - feed: paper position, roughly 50-60 units per glyph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Human-readable profile name
    pub name: String,
    /// Pen lift axis
    pub lift: AxisCalibration,
    /// Pen traverse axis
    pub traverse: AxisCalibration,
    /// Paper feed axis
    pub feed: AxisCalibration,
    /// Bounded wait for any single motion, in milliseconds
    pub motion_timeout_ms: u64,
    /// Allowed lift counter deviation from raised at session start
    pub pen_tolerance_degrees: i32,
}

impl CalibrationProfile {
    /// BANNER PRINT3R wiring: traverse on A (medium), lift on B, feed on C.
    pub fn banner_print3r() -> Self {
        Self {
            name: "banner-print3r".to_string(),
            lift: AxisCalibration::new(Port::B, ActuatorKind::Large, 180.0, 600).with_travel(0, 180),
            traverse: AxisCalibration::new(Port::A, ActuatorKind::Medium, 2.8, 420)
                .with_travel(0, 280),
            feed: AxisCalibration::new(Port::C, ActuatorKind::Large, 3.6, 300),
            motion_timeout_ms: 5000,
            pen_tolerance_degrees: 5,
        }
    }

    /// Earlier revision: lift on A, feed on B, traverse on C (medium).
    pub fn print3r_rev_a() -> Self {
        Self {
            name: "print3r-rev-a".to_string(),
            lift: AxisCalibration::new(Port::A, ActuatorKind::Large, 180.0, 600).with_travel(0, 180),
            traverse: AxisCalibration::new(Port::C, ActuatorKind::Medium, 2.8, 420)
                .with_travel(0, 280),
            feed: AxisCalibration::new(Port::B, ActuatorKind::Large, 3.6, 300),
            motion_timeout_ms: 5000,
            pen_tolerance_degrees: 5,
        }
    }

    /// Look up a built-in profile by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "banner-print3r" => Some(Self::banner_print3r()),
            "print3r-rev-a" => Some(Self::print3r_rev_a()),
            _ => None,
        }
    }

    /// Calibration of one axis.
    pub fn axis(&self, role: AxisRole) -> &AxisCalibration {
        match role {
            AxisRole::Lift => &self.lift,
            AxisRole::Traverse => &self.traverse,
            AxisRole::Feed => &self.feed,
        }
    }

    /// Bounded wait applied to every motion.
    pub fn motion_timeout(&self) -> Duration {
        Duration::from_millis(self.motion_timeout_ms)
    }

    /// Check the profile for values no hardware revision could have.
    pub fn validate(&self) -> PlotResult<()> {
        let mut ports = Vec::with_capacity(3);
        for role in AxisRole::ALL {
            let cal = self.axis(role);

            if !cal.degrees_per_unit.is_finite() || cal.degrees_per_unit <= 0.0 {
                return Err(PlotError::InvalidProfile(format!(
                    "{role} degrees_per_unit must be positive, got {}",
                    cal.degrees_per_unit
                )));
            }

            let max_speed = cal.kind.max_speed_dps();
            if cal.speed_dps == 0 || cal.speed_dps > max_speed {
                return Err(PlotError::InvalidProfile(format!(
                    "{role} speed {} deg/s outside 1..={max_speed} for a {} motor",
                    cal.speed_dps, cal.kind
                )));
            }

            if let Some((min, max)) = cal.travel_degrees {
                if min > max {
                    return Err(PlotError::InvalidProfile(format!(
                        "{role} travel range [{min}, {max}] is inverted"
                    )));
                }
            }

            if ports.contains(&cal.port) {
                return Err(PlotError::InvalidProfile(format!(
                    "port {} assigned to more than one axis",
                    cal.port
                )));
            }
            ports.push(cal.port);
        }

        if self.motion_timeout_ms == 0 {
            return Err(PlotError::InvalidProfile(
                "motion_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.pen_tolerance_degrees < 0 {
            return Err(PlotError::InvalidProfile(
                "pen_tolerance_degrees must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> PlotResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate
    pub fn load_from_file(path: &Path) -> PlotResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&json)?;
        profile.validate()?;
        Ok(profile)
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::banner_print3r()
    }
}
