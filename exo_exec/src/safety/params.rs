//! Parameters structure for the safety module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::deg_to_rad_vec;

use super::{HardLimits, LimitMonitor, SafetyError, SetpointClamp};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the safety module.
///
/// The setpoint range and the hard limits are configured independently, the setpoint range is
/// normally the narrower of the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- SETPOINT CLAMP ----
    /// Lowest reference which may be commanded.
    ///
    /// Units: degrees
    pub setpoint_min_deg: Vec<f64>,

    /// Highest reference which may be commanded.
    ///
    /// Units: degrees
    pub setpoint_max_deg: Vec<f64>,

    // ---- HARD LIMITS ----
    /// Units: degrees
    pub pos_min_deg: Vec<f64>,

    /// Units: degrees
    pub pos_max_deg: Vec<f64>,

    /// Maximum measured velocity magnitude.
    ///
    /// Units: degrees/second
    pub vel_max_degs: Vec<f64>,

    /// Maximum commanded torque magnitude.
    ///
    /// Units: newton meters
    pub torque_max_nm: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Build the setpoint clamp.
    pub fn setpoint_clamp(&self) -> Result<SetpointClamp, SafetyError> {
        SetpointClamp::new(
            deg_to_rad_vec(&self.setpoint_min_deg),
            deg_to_rad_vec(&self.setpoint_max_deg),
        )
    }

    /// Build the hard limit monitor.
    pub fn limit_monitor(&self) -> Result<LimitMonitor, SafetyError> {
        LimitMonitor::new(HardLimits {
            pos_min: deg_to_rad_vec(&self.pos_min_deg),
            pos_max: deg_to_rad_vec(&self.pos_max_deg),
            vel_max: deg_to_rad_vec(&self.vel_max_degs),
            torque_max: self.torque_max_nm.clone(),
        })
    }
}
