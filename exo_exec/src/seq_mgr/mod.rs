//! Sequence manager module
//!
//! Chains the fixed waypoints of the exercise into a strictly forward sequence of motion states,
//! re-arming the minimum jerk generator each time a state's dwell expires.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::traj::TrajError;

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of states which have a motion (and therefore a dwell) associated with them.
pub const NUM_MOTION_STATES: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during sequencer operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeqError {
    #[error("The sequencer has not been initialised")]
    NotInitialised,

    #[error("Cannot build the trajectory: {0}")]
    TrajError(#[from] TrajError),

    #[error(
        "The trajectory for {state:?} exceeds the maximum rate (peak rates {peak_rates:?} rad/s)"
    )]
    InvalidTrajectory {
        state: SeqState,
        peak_rates: Vec<f64>,
    },

    #[error("Parameter {name} is invalid: {value}")]
    InvalidParam { name: &'static str, value: f64 },
}
