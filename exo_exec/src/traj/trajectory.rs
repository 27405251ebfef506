//! Trajectory structure
//!
//! A [`Trajectory`] is an ordered set of waypoints along with the policy used to interpolate
//! between them, and the per-DOF rate ceiling it is validated against.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

// Internal
use super::{
    min_jerk_rate, min_jerk_shape, TrajError, WayPoint, MIN_JERK_PEAK_RATE, RATE_TOLERANCE_RADS,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A continuous reference trajectory.
///
/// Trajectories are immutable once built, a new one is created whenever the sequencer moves to a
/// new state.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Knots of the trajectory, with strictly increasing times. Always at least two.
    waypoints: Vec<WayPoint>,

    /// Interpolation used between consecutive knots.
    interp: Interp,

    /// Maximum rate of change of each DOF.
    ///
    /// Units: radians/second
    max_rate: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Interpolation between consecutive knots of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interp {
    /// Straight line between knots.
    Linear,

    /// Minimum jerk profile between knots, with zero velocity and acceleration at each knot.
    MinimumJerk,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a new trajectory through the given waypoints.
    ///
    /// The waypoints must all have the same, non-zero, number of positions, must have strictly
    /// increasing times, and `max_rate` must provide one rate per DOF.
    pub fn new(
        waypoints: Vec<WayPoint>,
        interp: Interp,
        max_rate: Vec<f64>,
    ) -> Result<Self, TrajError> {
        if waypoints.len() < 2 {
            return Err(TrajError::NotEnoughWayPoints(waypoints.len()));
        }

        let num_dofs = waypoints[0].len();
        if num_dofs == 0 {
            return Err(TrajError::EmptyWayPoint);
        }

        for (i, wp) in waypoints.iter().enumerate().skip(1) {
            if wp.len() != num_dofs {
                return Err(TrajError::DimensionMismatch {
                    index: i,
                    expected: num_dofs,
                    found: wp.len(),
                });
            }
            if wp.time() <= waypoints[i - 1].time() {
                return Err(TrajError::NonIncreasingTime {
                    index: i,
                    time: wp.time(),
                });
            }
        }

        if max_rate.len() != num_dofs {
            return Err(TrajError::RateDimensionMismatch {
                expected: num_dofs,
                found: max_rate.len(),
            });
        }

        Ok(Self {
            waypoints,
            interp,
            max_rate,
        })
    }

    /// The first waypoint of the trajectory.
    pub fn start(&self) -> &WayPoint {
        &self.waypoints[0]
    }

    /// The final waypoint of the trajectory.
    pub fn end(&self) -> &WayPoint {
        &self.waypoints[self.waypoints.len() - 1]
    }

    /// All knots of the trajectory.
    pub fn waypoints(&self) -> &[WayPoint] {
        &self.waypoints
    }

    /// Time taken to travel from the start to the end of the trajectory.
    pub fn duration(&self) -> Duration {
        self.end().time() - self.start().time()
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    pub fn max_rate(&self) -> &[f64] {
        &self.max_rate
    }

    /// Number of degrees of freedom in the trajectory.
    pub fn num_dofs(&self) -> usize {
        self.start().len()
    }

    /// Get the reference positions at the given time since the start of the trajectory.
    ///
    /// Times past the end of the trajectory return the end positions, the trajectory is then
    /// considered to have arrived and holds position.
    pub fn at_time(&self, elapsed: Duration) -> Vec<f64> {
        let t = self.start().time() + elapsed;

        if t >= self.end().time() {
            return self.end().positions().to_vec();
        }

        let (a, b, tau) = self.segment_at(t);
        let shape = match self.interp {
            Interp::Linear => tau,
            Interp::MinimumJerk => min_jerk_shape(tau),
        };

        a.positions()
            .iter()
            .zip(b.positions())
            .map(|(pa, pb)| pa + (pb - pa) * shape)
            .collect()
    }

    /// Get the rate of change of each DOF at the given time since the start of the trajectory.
    ///
    /// Units: radians/second
    pub fn rate_at_time(&self, elapsed: Duration) -> Vec<f64> {
        let t = self.start().time() + elapsed;

        if t >= self.end().time() {
            return vec![0.0; self.num_dofs()];
        }

        let (a, b, tau) = self.segment_at(t);
        let seg_s = (b.time() - a.time()).as_secs_f64();
        let rate_shape = match self.interp {
            Interp::Linear => 1.0,
            Interp::MinimumJerk => min_jerk_rate(tau),
        };

        a.positions()
            .iter()
            .zip(b.positions())
            .map(|(pa, pb)| (pb - pa) / seg_s * rate_shape)
            .collect()
    }

    /// The largest rate magnitude of each DOF over the whole trajectory.
    ///
    /// This is computed analytically from each segment, so is exact for both interpolation
    /// types.
    ///
    /// Units: radians/second
    pub fn peak_rates(&self) -> Vec<f64> {
        let factor = match self.interp {
            Interp::Linear => 1.0,
            Interp::MinimumJerk => MIN_JERK_PEAK_RATE,
        };

        let mut peaks = vec![0f64; self.num_dofs()];

        for seg in self.waypoints.windows(2) {
            let seg_s = (seg[1].time() - seg[0].time()).as_secs_f64();

            for (i, peak) in peaks.iter_mut().enumerate() {
                let rate = factor * (seg[1].positions()[i] - seg[0].positions()[i]).abs() / seg_s;
                *peak = peak.max(rate);
            }
        }

        peaks
    }

    /// Check that no DOF exceeds its maximum rate anywhere along the trajectory.
    pub fn validate(&self) -> bool {
        self.peak_rates()
            .iter()
            .zip(self.max_rate.iter())
            .all(|(peak, max)| *peak <= max + RATE_TOLERANCE_RADS)
    }

    /// Find the segment containing the absolute time `t`, returning the bounding knots and the
    /// normalised time within the segment.
    ///
    /// `t` must be before the end of the trajectory.
    fn segment_at(&self, t: Duration) -> (&WayPoint, &WayPoint, f64) {
        // Index of the first knot after t, never 0 or past the final knot
        let upper = self
            .waypoints
            .partition_point(|wp| wp.time() <= t)
            .max(1)
            .min(self.waypoints.len() - 1);

        let a = &self.waypoints[upper - 1];
        let b = &self.waypoints[upper];

        let seg_s = (b.time() - a.time()).as_secs_f64();
        let tau = if t <= a.time() {
            0.0
        } else {
            ((t - a.time()).as_secs_f64() / seg_s).min(1.0)
        };

        (a, b, tau)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn two_point(interp: Interp, max_rate: Vec<f64>) -> Trajectory {
        Trajectory::new(
            vec![
                WayPoint::at_zero(vec![0.0, 1.0]),
                WayPoint::new(secs(2.0), vec![1.0, 1.0]),
            ],
            interp,
            max_rate,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_input() {
        let a = WayPoint::at_zero(vec![0.0, 0.0]);

        assert_eq!(
            Trajectory::new(vec![a.clone()], Interp::Linear, vec![1.0, 1.0]),
            Err(TrajError::NotEnoughWayPoints(1))
        );
        assert_eq!(
            Trajectory::new(
                vec![a.clone(), WayPoint::new(secs(1.0), vec![0.0])],
                Interp::Linear,
                vec![1.0, 1.0]
            ),
            Err(TrajError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            Trajectory::new(vec![a.clone(), a.clone()], Interp::Linear, vec![1.0, 1.0]),
            Err(TrajError::NonIncreasingTime {
                index: 1,
                time: secs(0.0)
            })
        );
        assert_eq!(
            Trajectory::new(
                vec![a.clone(), a.with_time(secs(1.0))],
                Interp::Linear,
                vec![1.0]
            ),
            Err(TrajError::RateDimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            Trajectory::new(
                vec![WayPoint::at_zero(vec![]), WayPoint::new(secs(1.0), vec![])],
                Interp::Linear,
                vec![]
            ),
            Err(TrajError::EmptyWayPoint)
        );
    }

    #[test]
    fn test_linear_interp() {
        let traj = two_point(Interp::Linear, vec![1.0, 1.0]);

        assert_eq!(traj.duration(), secs(2.0));
        assert_eq!(traj.at_time(secs(0.0)), vec![0.0, 1.0]);
        assert_eq!(traj.at_time(secs(1.0)), vec![0.5, 1.0]);
        assert_eq!(traj.rate_at_time(secs(1.0)), vec![0.5, 0.0]);

        // Holds the end position once arrived
        assert_eq!(traj.at_time(secs(2.0)), vec![1.0, 1.0]);
        assert_eq!(traj.at_time(secs(10.0)), vec![1.0, 1.0]);
        assert_eq!(traj.rate_at_time(secs(10.0)), vec![0.0, 0.0]);
    }

    #[test]
    fn test_min_jerk_interp() {
        let traj = two_point(Interp::MinimumJerk, vec![1.0, 1.0]);

        assert_eq!(traj.at_time(secs(0.0)), vec![0.0, 1.0]);
        assert!((traj.at_time(secs(1.0))[0] - 0.5).abs() < 1e-12);
        assert_eq!(traj.at_time(secs(2.0)), vec![1.0, 1.0]);

        // Zero velocity at both ends, peak at the midpoint
        assert!(traj.rate_at_time(secs(0.0))[0].abs() < 1e-12);
        assert!(traj.rate_at_time(secs(2.0 - 1e-6))[0].abs() < 1e-6);
        assert!((traj.rate_at_time(secs(1.0))[0] - 1.875 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_multi_knot_lookup() {
        let traj = Trajectory::new(
            vec![
                WayPoint::at_zero(vec![0.0]),
                WayPoint::new(secs(1.0), vec![1.0]),
                WayPoint::new(secs(3.0), vec![-1.0]),
            ],
            Interp::Linear,
            vec![10.0],
        )
        .unwrap();

        assert_eq!(traj.at_time(secs(1.0)), vec![1.0]);
        assert!((traj.at_time(secs(2.0))[0] - 0.0).abs() < 1e-12);
        assert!((traj.rate_at_time(secs(2.5))[0] + 1.0).abs() < 1e-12);
        assert_eq!(traj.peak_rates(), vec![1.0]);
    }

    #[test]
    fn test_validate() {
        // Linear peak rate is 0.5 rad/s on the first DOF
        assert!(two_point(Interp::Linear, vec![0.5, 0.0]).validate());
        assert!(!two_point(Interp::Linear, vec![0.49, 1.0]).validate());

        // Minimum jerk peaks at 1.875 times the average rate
        assert!(two_point(Interp::MinimumJerk, vec![0.9375, 0.0]).validate());
        assert!(!two_point(Interp::MinimumJerk, vec![0.9, 0.0]).validate());
    }

    #[test]
    fn test_sampled_rate_within_bound() {
        let traj = two_point(Interp::MinimumJerk, vec![0.9375, 0.0]);
        assert!(traj.validate());

        // The rate found by sampling never exceeds the validated ceiling
        for k in 0..=2000 {
            let rates = traj.rate_at_time(Duration::from_millis(k));
            for (rate, max) in rates.iter().zip(traj.max_rate()) {
                assert!(rate.abs() <= max + RATE_TOLERANCE_RADS);
            }
        }
    }
}
