//! Trajectory module
//!
//! Provides the [`WayPoint`] and [`Trajectory`] types, along with the [`MinimumJerk`] generator
//! which builds smooth, rate-limited trajectories between two waypoints.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod min_jerk;
mod trajectory;
mod waypoint;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

// Internal
pub use min_jerk::*;
pub use trajectory::*;
pub use waypoint::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance applied to the maximum rate when validating a trajectory.
///
/// Units: radians/second
pub const RATE_TOLERANCE_RADS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while building a trajectory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajError {
    #[error("A trajectory needs at least two waypoints, found {0}")]
    NotEnoughWayPoints(usize),

    #[error("Waypoints must contain at least one position")]
    EmptyWayPoint,

    #[error("Waypoint {index} has {found} positions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Expected {expected} maximum rates (one per DOF), found {found}")]
    RateDimensionMismatch { expected: usize, found: usize },

    #[error("Waypoint {index} is at {time:?}, which is not after the previous waypoint")]
    NonIncreasingTime { index: usize, time: Duration },

    #[error("The generator sample period must be greater than zero")]
    ZeroSamplePeriod,
}
