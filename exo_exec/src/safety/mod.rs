//! Safety module
//!
//! Two independent layers sit between the trajectory and the device:
//!
//! - [`SetpointClamp`] saturates every reference into a safe range before it is commanded. This
//!   never stops the loop.
//! - [`LimitMonitor`] checks the measured joint state against hard limits. Any violation trips
//!   the loop into a graceful stop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod clamp;
mod limits;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use clamp::*;
pub use limits::*;
pub use params::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the safety configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SafetyError {
    #[error("Expected {expected} {name} values (one per DOF), found {found}")]
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("The {name} range of DOF {index} is empty: [{min}, {max}]")]
    EmptyRange {
        name: &'static str,
        index: usize,
        min: f64,
        max: f64,
    },

    #[error("The {name} limit of DOF {index} must be positive, found {value}")]
    NonPositiveLimit {
        name: &'static str,
        index: usize,
        value: f64,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn check_len(name: &'static str, values: &[f64], expected: usize) -> Result<(), SafetyError> {
    if values.len() != expected {
        return Err(SafetyError::DimensionMismatch {
            name,
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

fn check_ranges(name: &'static str, min: &[f64], max: &[f64]) -> Result<(), SafetyError> {
    check_len(name, max, min.len())?;

    for (index, (lo, hi)) in min.iter().zip(max.iter()).enumerate() {
        if !(lo <= hi) {
            return Err(SafetyError::EmptyRange {
                name,
                index,
                min: *lo,
                max: *hi,
            });
        }
    }
    Ok(())
}
