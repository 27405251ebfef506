//! Parameters structure for the sequence manager

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;
use util::{maths::deg_to_rad_vec, time::seconds_to_duration};

// Internal
use super::{SeqError, NUM_MOTION_STATES};
use crate::traj::Interp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the sequence manager, as stored in the parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- WAYPOINTS ----
    /// The neutral configuration the sequence starts and ends in.
    ///
    /// Units: degrees
    pub neutral_deg: Vec<f64>,

    /// The configuration at the top of the elbow motion.
    ///
    /// Units: degrees
    pub top_elbow_deg: Vec<f64>,

    /// Dwell of each motion state, in the order `ToNeutral0`, `ToTopElbow`, `ToNeutral1`.
    ///
    /// Units: seconds
    pub state_durations_s: [f64; NUM_MOTION_STATES],

    // ---- GENERATOR ----
    /// Interpolation used by generated trajectories.
    pub interp: Interp,

    /// Knot spacing used with linear interpolation.
    ///
    /// Units: seconds
    pub gen_sample_period_s: f64,

    /// Maximum rate of each DOF.
    ///
    /// Units: degrees/second
    pub max_rate_degs: Vec<f64>,
}

/// Sequencer configuration in internal units, built from [`Params`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeqConfig {
    /// Units: radians
    pub neutral: Vec<f64>,

    /// Units: radians
    pub top_elbow: Vec<f64>,

    pub state_durations: [Duration; NUM_MOTION_STATES],

    pub interp: Interp,

    pub gen_sample_period: Duration,

    /// Units: radians/second
    pub max_rate: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Convert the parameters into internal units.
    pub fn to_config(&self) -> Result<SeqConfig, SeqError> {
        let mut state_durations = [Duration::from_secs(0); NUM_MOTION_STATES];
        for (dur, secs) in state_durations.iter_mut().zip(self.state_durations_s.iter()) {
            *dur = positive_duration("state_durations_s", *secs)?;
        }

        Ok(SeqConfig {
            neutral: deg_to_rad_vec(&self.neutral_deg),
            top_elbow: deg_to_rad_vec(&self.top_elbow_deg),
            state_durations,
            interp: self.interp,
            gen_sample_period: positive_duration("gen_sample_period_s", self.gen_sample_period_s)?,
            max_rate: deg_to_rad_vec(&self.max_rate_degs),
        })
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn positive_duration(name: &'static str, secs: f64) -> Result<Duration, SeqError> {
    match seconds_to_duration(secs) {
        Some(d) if d > Duration::from_secs(0) => Ok(d),
        _ => Err(SeqError::InvalidParam { name, value: secs }),
    }
}
