//! Minimum jerk trajectory generator
//!
//! The minimum jerk profile between two configurations is the quintic
//!
//! ```text
//! s(tau) = 10 tau^3 - 15 tau^4 + 6 tau^5,    tau = t / D
//! ```
//!
//! which has zero velocity and acceleration at both `tau = 0` and `tau = 1`. Its rate of change
//! peaks at the midpoint, at 1.875 times the average rate `|delta| / D`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use std::time::Duration;
use util::maths::poly_val;

// Internal
use super::{Interp, TrajError, Trajectory, WayPoint};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Coefficients of the normalised minimum jerk position profile, highest power first.
pub const MIN_JERK_COEFFS: [f64; 6] = [6.0, -15.0, 10.0, 0.0, 0.0, 0.0];

/// Coefficients of the derivative of [`MIN_JERK_COEFFS`].
pub const MIN_JERK_RATE_COEFFS: [f64; 5] = [30.0, -60.0, 30.0, 0.0, 0.0];

/// Ratio between the peak rate of a minimum jerk profile and its average rate.
pub const MIN_JERK_PEAK_RATE: f64 = 1.875;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Minimum jerk trajectory generator.
///
/// The generator is owned by the sequencer and re-armed in place on each state transition with
/// [`MinimumJerk::set_endpoints`]. The resulting [`Trajectory`] depends on the interpolation set
/// by [`MinimumJerk::set_trajectory_params`]:
///
/// - [`Interp::MinimumJerk`] - the quintic is evaluated exactly between the two endpoints.
/// - [`Interp::Linear`] - the quintic is sampled into knots every `sample_period` and linearly
///   interpolated between them.
#[derive(Debug, Clone)]
pub struct MinimumJerk {
    /// Spacing of the knots used with linear interpolation.
    sample_period: Duration,

    interp: Interp,

    /// Per-DOF rate ceiling given to generated trajectories. `None` until set, in which case the
    /// trajectories are unconstrained.
    max_rate: Option<Vec<f64>>,

    /// The current trajectory.
    traj: Trajectory,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MinimumJerk {
    /// Create a new generator between the given waypoints.
    ///
    /// The generator initially uses [`Interp::MinimumJerk`] with no rate constraint.
    pub fn new(sample_period: Duration, start: WayPoint, end: WayPoint) -> Result<Self, TrajError> {
        if sample_period == Duration::from_secs(0) {
            return Err(TrajError::ZeroSamplePeriod);
        }

        let traj = build(sample_period, Interp::MinimumJerk, None, start, end)?;

        Ok(Self {
            sample_period,
            interp: Interp::MinimumJerk,
            max_rate: None,
            traj,
        })
    }

    /// Set the interpolation and per-DOF rate ceiling.
    ///
    /// The current trajectory is rebuilt with the new parameters, and they are used for all
    /// subsequent calls to [`MinimumJerk::set_endpoints`].
    pub fn set_trajectory_params(
        &mut self,
        interp: Interp,
        max_rate: Vec<f64>,
    ) -> Result<(), TrajError> {
        let traj = build(
            self.sample_period,
            interp,
            Some(&max_rate),
            self.traj.start().clone(),
            self.traj.end().clone(),
        )?;

        self.interp = interp;
        self.max_rate = Some(max_rate);
        self.traj = traj;

        Ok(())
    }

    /// Re-arm the generator between two new waypoints.
    ///
    /// The waypoint times give the interval of the trajectory, the end time must be after the
    /// start time. On error the previous trajectory is kept.
    pub fn set_endpoints(&mut self, start: WayPoint, end: WayPoint) -> Result<(), TrajError> {
        self.traj = build(
            self.sample_period,
            self.interp,
            self.max_rate.as_deref(),
            start,
            end,
        )?;

        trace!(
            "MinimumJerk armed: {:?} over {:.3} s, {} knots",
            self.interp,
            self.traj.duration().as_secs_f64(),
            self.traj.waypoints().len()
        );

        Ok(())
    }

    /// The current trajectory.
    pub fn trajectory(&self) -> &Trajectory {
        &self.traj
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    pub fn sample_period(&self) -> Duration {
        self.sample_period
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Normalised minimum jerk position at `tau` in `[0, 1]`.
pub fn min_jerk_shape(tau: f64) -> f64 {
    poly_val(tau, &MIN_JERK_COEFFS)
}

/// Derivative of [`min_jerk_shape`] with respect to `tau`.
pub fn min_jerk_rate(tau: f64) -> f64 {
    poly_val(tau, &MIN_JERK_RATE_COEFFS)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a minimum jerk trajectory between two waypoints.
fn build(
    sample_period: Duration,
    interp: Interp,
    max_rate: Option<&[f64]>,
    start: WayPoint,
    end: WayPoint,
) -> Result<Trajectory, TrajError> {
    if end.len() != start.len() {
        return Err(TrajError::DimensionMismatch {
            index: 1,
            expected: start.len(),
            found: end.len(),
        });
    }
    if end.time() <= start.time() {
        return Err(TrajError::NonIncreasingTime {
            index: 1,
            time: end.time(),
        });
    }

    let max_rate = match max_rate {
        Some(r) => r.to_vec(),
        None => vec![std::f64::INFINITY; start.len()],
    };

    let waypoints = match interp {
        Interp::MinimumJerk => vec![start, end],
        Interp::Linear => sample_knots(sample_period, &start, &end),
    };

    Trajectory::new(waypoints, interp, max_rate)
}

/// Sample the minimum jerk profile between `start` and `end` every `sample_period`.
///
/// The final knot is always exactly `end`, so the last segment may be shorter than the sample
/// period.
fn sample_knots(sample_period: Duration, start: &WayPoint, end: &WayPoint) -> Vec<WayPoint> {
    let duration_ns = (end.time() - start.time()).as_nanos();
    let period_ns = sample_period.as_nanos();
    let num_segments = (duration_ns + period_ns - 1) / period_ns;

    let mut knots = Vec::with_capacity(num_segments as usize + 1);

    for k in 0..num_segments {
        let offset_ns = k * period_ns;
        let tau = offset_ns as f64 / duration_ns as f64;
        let shape = min_jerk_shape(tau);

        let positions = start
            .positions()
            .iter()
            .zip(end.positions())
            .map(|(a, b)| a + (b - a) * shape)
            .collect();

        knots.push(WayPoint::new(
            start.time() + Duration::from_nanos(offset_ns as u64),
            positions,
        ));
    }

    knots.push(end.clone());

    knots
}

#[cfg(test)]
mod test {
    use super::*;
    use util::maths::poly_der;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn period() -> Duration {
        Duration::from_millis(50)
    }

    fn neutral() -> WayPoint {
        WayPoint::at_zero(vec![-15f64.to_radians(), 0.0, 0.0, 0.0])
    }

    fn top_elbow() -> WayPoint {
        WayPoint::at_zero(vec![
            20f64.to_radians(),
            45f64.to_radians(),
            0.0,
            15f64.to_radians(),
        ])
    }

    #[test]
    fn test_shape_constants() {
        assert_eq!(poly_der(&MIN_JERK_COEFFS), MIN_JERK_RATE_COEFFS.to_vec());
        assert_eq!(min_jerk_shape(0.0), 0.0);
        assert_eq!(min_jerk_shape(1.0), 1.0);
        assert_eq!(min_jerk_rate(0.0), 0.0);
        assert_eq!(min_jerk_rate(1.0), 0.0);
        assert_eq!(min_jerk_rate(0.5), MIN_JERK_PEAK_RATE);
    }

    #[test]
    fn test_boundary_continuity() {
        let start = neutral();
        let end = top_elbow().with_time(secs(3.0));

        for interp in [Interp::MinimumJerk, Interp::Linear].iter() {
            let mut mj = MinimumJerk::new(period(), start.clone(), end.clone()).unwrap();
            mj.set_trajectory_params(*interp, vec![1.0; 4]).unwrap();
            let traj = mj.trajectory();

            assert_eq!(traj.at_time(secs(0.0)), start.positions().to_vec());
            assert_eq!(traj.at_time(secs(3.0)), end.positions().to_vec());
            assert_eq!(traj.at_time(secs(4.0)), end.positions().to_vec());
        }

        // The exact profile starts and ends at rest
        let mj = MinimumJerk::new(period(), start, end).unwrap();
        let traj = mj.trajectory();
        for rate in traj.rate_at_time(secs(0.0)) {
            assert!(rate.abs() < 1e-12);
        }
        for rate in traj.rate_at_time(secs(3.0 - 1e-6)) {
            assert!(rate.abs() < 1e-6);
        }
    }

    #[test]
    fn test_linear_knots_follow_profile() {
        let mut mj =
            MinimumJerk::new(period(), neutral(), top_elbow().with_time(secs(2.0))).unwrap();
        mj.set_trajectory_params(Interp::Linear, vec![10.0; 4])
            .unwrap();

        let traj = mj.trajectory().clone();

        // 2 s at 50 ms gives 40 segments
        assert_eq!(traj.waypoints().len(), 41);
        assert_eq!(traj.interp(), Interp::Linear);

        // Knots lie on the exact profile
        mj.set_trajectory_params(Interp::MinimumJerk, vec![10.0; 4])
            .unwrap();
        let exact = mj.trajectory();
        for knot in traj.waypoints() {
            let expected = exact.at_time(knot.time());
            for (a, b) in knot.positions().iter().zip(expected.iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_uneven_final_knot() {
        let ms = Duration::from_millis;

        let mut mj = MinimumJerk::new(ms(50), neutral(), top_elbow().with_time(ms(120))).unwrap();
        mj.set_trajectory_params(Interp::Linear, vec![100.0; 4])
            .unwrap();

        let times: Vec<Duration> = mj
            .trajectory()
            .waypoints()
            .iter()
            .map(|w| w.time())
            .collect();
        assert_eq!(times, vec![ms(0), ms(50), ms(100), ms(120)]);
    }

    #[test]
    fn test_validate_against_max_rate() {
        // Elbow moves 35 deg in 3 s, peak rate = 1.875 * 35 / 3 = 21.875 deg/s
        let mut mj =
            MinimumJerk::new(period(), neutral(), top_elbow().with_time(secs(3.0))).unwrap();

        // Unconstrained by default
        assert!(mj.trajectory().validate());

        mj.set_trajectory_params(Interp::MinimumJerk, vec![60f64.to_radians(); 4])
            .unwrap();
        assert!(mj.trajectory().validate());

        // The same move in a quarter of a second is far too fast
        mj.set_endpoints(neutral(), top_elbow().with_time(secs(0.25)))
            .unwrap();
        assert!(!mj.trajectory().validate());

        let peak = mj.trajectory().peak_rates();
        assert!((peak[0] - 1.875 * 35f64.to_radians() / 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_set_endpoints_errors_keep_previous() {
        let mut mj =
            MinimumJerk::new(period(), neutral(), top_elbow().with_time(secs(3.0))).unwrap();
        let before = mj.trajectory().clone();

        assert_eq!(
            mj.set_endpoints(neutral(), top_elbow()),
            Err(TrajError::NonIncreasingTime {
                index: 1,
                time: secs(0.0)
            })
        );
        assert_eq!(
            mj.set_endpoints(neutral(), WayPoint::new(secs(1.0), vec![0.0])),
            Err(TrajError::DimensionMismatch {
                index: 1,
                expected: 4,
                found: 1
            })
        );
        assert_eq!(mj.trajectory(), &before);

        assert_eq!(
            MinimumJerk::new(Duration::from_secs(0), neutral(), top_elbow()).err(),
            Some(TrajError::ZeroSamplePeriod)
        );
    }
}
