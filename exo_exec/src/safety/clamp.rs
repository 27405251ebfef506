//! Reference clamp

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::clamp;

use super::{check_ranges, SafetyError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Saturates references into a per-DOF safe range.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointClamp {
    /// Units: radians
    min: Vec<f64>,

    /// Units: radians
    max: Vec<f64>,
}

/// Which DOFs were saturated by the clamp on one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClampReport {
    pub saturated: Vec<bool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SetpointClamp {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self, SafetyError> {
        check_ranges("setpoint", &min, &max)?;

        Ok(Self { min, max })
    }

    pub fn num_dofs(&self) -> usize {
        self.min.len()
    }

    /// Clamp each component of the reference in place.
    pub fn apply(&self, reference: &mut [f64]) -> ClampReport {
        let saturated = reference
            .iter_mut()
            .zip(self.min.iter().zip(self.max.iter()))
            .map(|(r, (min, max))| {
                let clamped = clamp(*r, *min, *max);
                let sat = clamped != *r;
                *r = clamped;
                sat
            })
            .collect();

        ClampReport { saturated }
    }
}

impl ClampReport {
    /// True if any DOF was saturated.
    pub fn any(&self) -> bool {
        self.saturated.iter().any(|s| *s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn elbow_clamp() -> SetpointClamp {
        SetpointClamp::new(
            vec![-90f64.to_radians(), -90f64.to_radians()],
            vec![20f64.to_radians(), 90f64.to_radians()],
        )
        .unwrap()
    }

    #[test]
    fn test_saturation() {
        let c = elbow_clamp();

        let mut r = vec![0.5, 0.0];
        let report = c.apply(&mut r);
        assert_eq!(r, vec![20f64.to_radians(), 0.0]);
        assert_eq!(report.saturated, vec![true, false]);
        assert!(report.any());

        let mut r = vec![-0.1, -3.0];
        let report = c.apply(&mut r);
        assert_eq!(r, vec![-0.1, -90f64.to_radians()]);
        assert_eq!(report.saturated, vec![false, true]);
    }

    #[test]
    fn test_idempotent() {
        let c = elbow_clamp();

        for x in [-10.0, -1.0, 0.0, 0.3, 0.35, 1.0, 10.0].iter() {
            let mut once = vec![*x, -*x];
            c.apply(&mut once);

            let mut twice = once.clone();
            let report = c.apply(&mut twice);

            assert_eq!(once, twice);
            assert!(!report.any());
        }
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert_eq!(
            SetpointClamp::new(vec![0.0, 1.0], vec![1.0, 0.0]),
            Err(SafetyError::EmptyRange {
                name: "setpoint",
                index: 1,
                min: 1.0,
                max: 0.0
            })
        );
        assert!(SetpointClamp::new(vec![0.0], vec![1.0, 2.0]).is_err());
    }
}
