//! Hard limit monitoring of the measured joint state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{check_len, check_ranges, SafetyError};
use crate::device::DeviceSnapshot;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Hard limits of each DOF, in internal units.
#[derive(Debug, Clone, PartialEq)]
pub struct HardLimits {
    /// Units: radians
    pub pos_min: Vec<f64>,

    /// Units: radians
    pub pos_max: Vec<f64>,

    /// Maximum velocity magnitude.
    ///
    /// Units: radians/second
    pub vel_max: Vec<f64>,

    /// Maximum commanded torque magnitude.
    ///
    /// Units: newton meters
    pub torque_max: Vec<f64>,
}

/// Stateless predicate over the measured joint state.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitMonitor {
    limits: HardLimits,
}

/// A single limit violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitViolation {
    pub dof: usize,
    pub kind: LimitKind,

    /// The measured value, or magnitude for symmetric limits.
    pub value: f64,

    /// The bound which was crossed.
    pub bound: f64,
}

/// The reason the monitor has tripped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitTrip {
    pub violations: Vec<LimitViolation>,

    /// True if the device reported a limit of its own.
    pub device_limit: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    Position,
    Velocity,
    Torque,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LimitMonitor {
    pub fn new(limits: HardLimits) -> Result<Self, SafetyError> {
        let n = limits.pos_min.len();
        check_ranges("position", &limits.pos_min, &limits.pos_max)?;
        check_len("velocity", &limits.vel_max, n)?;
        check_len("torque", &limits.torque_max, n)?;

        for (name, values) in [("velocity", &limits.vel_max), ("torque", &limits.torque_max)].iter()
        {
            for (index, value) in values.iter().enumerate() {
                if !(*value > 0.0) {
                    return Err(SafetyError::NonPositiveLimit {
                        name: *name,
                        index,
                        value: *value,
                    });
                }
            }
        }

        Ok(Self { limits })
    }

    pub fn limits(&self) -> &HardLimits {
        &self.limits
    }

    /// Check the measured state against the hard limits.
    ///
    /// A value which is not a number counts as a violation. Returns `None` if every value is in
    /// range and `device_limit` is false.
    pub fn check(&self, snapshot: &DeviceSnapshot, device_limit: bool) -> Option<LimitTrip> {
        let l = &self.limits;
        let mut violations = Vec::new();

        let positions = snapshot
            .joint_positions
            .iter()
            .zip(l.pos_min.iter().zip(l.pos_max.iter()));
        for (dof, (pos, (min, max))) in positions.enumerate() {
            if !(pos >= min && pos <= max) {
                violations.push(LimitViolation {
                    dof,
                    kind: LimitKind::Position,
                    value: *pos,
                    bound: if pos < min { *min } else { *max },
                });
            }
        }

        let symmetric = [
            (LimitKind::Velocity, &snapshot.joint_velocities, &l.vel_max),
            (
                LimitKind::Torque,
                &snapshot.joint_command_torques,
                &l.torque_max,
            ),
        ];
        for (kind, values, bounds) in symmetric.iter() {
            for (dof, (value, bound)) in values.iter().zip(bounds.iter()).enumerate() {
                if !(value.abs() <= *bound) {
                    violations.push(LimitViolation {
                        dof,
                        kind: *kind,
                        value: value.abs(),
                        bound: *bound,
                    });
                }
            }
        }

        if violations.is_empty() && !device_limit {
            None
        } else {
            Some(LimitTrip {
                violations,
                device_limit,
            })
        }
    }
}
