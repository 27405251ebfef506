//! Implementations for the Sequencer state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Internal
use super::{SeqConfig, SeqError, NUM_MOTION_STATES};
use crate::traj::{MinimumJerk, Trajectory, WayPoint};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Waypoint pair for the transition out of each motion state, indexed by [`SeqState::index`].
///
/// `None` marks the final motion state, whose expiry finishes the sequence.
const TRANSITIONS: [Option<(WayPointId, WayPointId)>; NUM_MOTION_STATES] = [
    // ToNeutral0 -> ToTopElbow
    Some((WayPointId::Neutral, WayPointId::TopElbow)),
    // ToTopElbow -> ToNeutral1
    Some((WayPointId::TopElbow, WayPointId::Neutral)),
    // ToNeutral1 -> Terminal
    None,
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sequencer module state.
///
/// The sequencer exclusively owns the trajectory generator. Time is given to it as the loop time,
/// measured from the start of the run, and the time spent in each state is measured from the
/// nominal end of the previous state so that dwell errors do not accumulate.
pub struct Sequencer {
    config: SeqConfig,

    /// Waypoints indexed by [`WayPointId`].
    waypoints: [WayPoint; 2],

    generator: Option<MinimumJerk>,

    state: SeqState,

    /// Loop time at which the current state started.
    state_origin: Duration,

    report: StatusReport,
}

/// Status report for sequencer processing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StatusReport {
    /// State after processing.
    pub state: SeqState,

    /// Time spent in the state before processing.
    ///
    /// Units: seconds
    pub elapsed_in_state_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// States of the exercise sequence, visited strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeqState {
    /// Moving from the initial configuration to neutral.
    ToNeutral0,

    /// Moving from neutral to the top of the elbow motion.
    ToTopElbow,

    /// Returning from the top of the elbow motion to neutral.
    ToNeutral1,

    /// The sequence is complete.
    Terminal,
}

/// The fixed waypoints used by the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WayPointId {
    Neutral,
    TopElbow,
}

/// Outcome of a single evaluation of the transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqEvent {
    /// The current state's dwell has not expired.
    Hold,

    /// The sequencer has moved into the given state and armed its trajectory.
    Advanced(SeqState),

    /// The final dwell has expired, the run should stop.
    Finished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SeqState {
    /// Index of the state into per-state tables.
    pub fn index(self) -> usize {
        match self {
            SeqState::ToNeutral0 => 0,
            SeqState::ToTopElbow => 1,
            SeqState::ToNeutral1 => 2,
            SeqState::Terminal => 3,
        }
    }

    /// The state which follows this one. `Terminal` is absorbing.
    pub fn next(self) -> SeqState {
        match self {
            SeqState::ToNeutral0 => SeqState::ToTopElbow,
            SeqState::ToTopElbow => SeqState::ToNeutral1,
            SeqState::ToNeutral1 => SeqState::Terminal,
            SeqState::Terminal => SeqState::Terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SeqState::Terminal
    }
}

impl WayPointId {
    fn index(self) -> usize {
        match self {
            WayPointId::Neutral => 0,
            WayPointId::TopElbow => 1,
        }
    }
}

impl State for Sequencer {
    type InitData = Vec<f64>;
    type InitError = SeqError;

    type InputData = Duration;
    type OutputData = SeqEvent;
    type StatusReport = StatusReport;
    type ProcError = SeqError;

    /// Initialise the sequencer.
    ///
    /// Expected init data is the measured joint positions, the first trajectory moves from them
    /// to neutral.
    fn init(&mut self, start_positions: Self::InitData) -> Result<(), Self::InitError> {
        let state = SeqState::ToNeutral0;

        let mut generator = MinimumJerk::new(
            self.config.gen_sample_period,
            WayPoint::at_zero(start_positions),
            self.waypoint(WayPointId::Neutral)
                .with_time(self.config.state_durations[state.index()]),
        )?;
        generator.set_trajectory_params(self.config.interp, self.config.max_rate.clone())?;

        check_trajectory(state, generator.trajectory())?;

        self.generator = Some(generator);
        self.state = state;
        self.state_origin = Duration::from_secs(0);

        info!(
            "Sequencer initialised in {:?} for {:.3} s",
            state,
            self.config.state_durations[state.index()].as_secs_f64()
        );

        Ok(())
    }

    /// Evaluate the transition rule at the given loop time.
    fn proc(
        &mut self,
        now: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if self.generator.is_none() {
            return Err(SeqError::NotInitialised);
        }

        let elapsed = self.elapsed_in_state(*now);
        self.report.elapsed_in_state_s = elapsed.as_secs_f64();

        let event = if self.state.is_terminal() {
            SeqEvent::Hold
        } else if elapsed > self.config.state_durations[self.state.index()] {
            self.advance()?
        } else {
            SeqEvent::Hold
        };

        self.report.state = self.state;

        Ok((event, self.report))
    }
}

impl Sequencer {
    /// Create a new uninitialised sequencer from the given configuration.
    pub fn new(config: SeqConfig) -> Self {
        let waypoints = [
            WayPoint::at_zero(config.neutral.clone()),
            WayPoint::at_zero(config.top_elbow.clone()),
        ];

        Self {
            config,
            waypoints,
            generator: None,
            state: SeqState::ToNeutral0,
            state_origin: Duration::from_secs(0),
            report: StatusReport {
                state: SeqState::ToNeutral0,
                elapsed_in_state_s: 0.0,
            },
        }
    }

    /// The current state.
    pub fn state(&self) -> SeqState {
        self.state
    }

    /// The active trajectory, or `None` if not yet initialised.
    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.generator.as_ref().map(|g| g.trajectory())
    }

    /// Time spent in the current state at the given loop time.
    pub fn elapsed_in_state(&self, now: Duration) -> Duration {
        now.checked_sub(self.state_origin).unwrap_or_default()
    }

    /// Evaluate the active trajectory at the given loop time.
    ///
    /// Once the sequence is complete the final trajectory keeps being evaluated, and so holds its
    /// end position.
    pub fn reference(&self, now: Duration) -> Result<Vec<f64>, SeqError> {
        let traj = self.trajectory().ok_or(SeqError::NotInitialised)?;

        Ok(traj.at_time(self.elapsed_in_state(now)))
    }

    /// Total nominal duration of the sequence.
    pub fn total_duration(&self) -> Duration {
        self.config.state_durations.iter().sum()
    }

    fn waypoint(&self, id: WayPointId) -> &WayPoint {
        &self.waypoints[id.index()]
    }

    /// Move out of the current state, arming the trajectory of the next one.
    fn advance(&mut self) -> Result<SeqEvent, SeqError> {
        let current = self.state;
        let next = current.next();
        let dwell = self.config.state_durations[current.index()];

        let (from, to) = match TRANSITIONS[current.index()] {
            Some(pair) => pair,
            None => {
                self.state = next;
                self.state_origin += dwell;

                info!("Sequencer finished {:?}, sequence complete", current);

                return Ok(SeqEvent::Finished);
            }
        };

        let next_dwell = self.config.state_durations[next.index()];
        let start = self.waypoint(from).with_time(Duration::from_secs(0));
        let end = self.waypoint(to).with_time(next_dwell);

        // Armed on a copy, the current trajectory stays active unless the new one is valid
        let mut generator = self.generator.clone().ok_or(SeqError::NotInitialised)?;
        generator.set_endpoints(start, end)?;
        check_trajectory(next, generator.trajectory())?;

        self.generator = Some(generator);
        self.state = next;
        self.state_origin += dwell;

        info!(
            "Sequencer {:?} -> {:?} ({:?} -> {:?} over {:.3} s)",
            current,
            next,
            from,
            to,
            next_dwell.as_secs_f64()
        );

        Ok(SeqEvent::Advanced(next))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_trajectory(state: SeqState, traj: &Trajectory) -> Result<(), SeqError> {
    if traj.validate() {
        debug!("Trajectory for {:?} peak rates {:?} rad/s", state, traj.peak_rates());
        Ok(())
    } else {
        Err(SeqError::InvalidTrajectory {
            state,
            peak_rates: traj.peak_rates(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::Interp;

    fn config(interp: Interp) -> SeqConfig {
        SeqConfig {
            neutral: vec![-15f64.to_radians(), 0.0, 0.0, 0.0],
            top_elbow: vec![
                20f64.to_radians(),
                45f64.to_radians(),
                0.0,
                15f64.to_radians(),
            ],
            state_durations: [
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(4),
            ],
            interp,
            gen_sample_period: Duration::from_millis(50),
            max_rate: vec![
                60f64.to_radians(),
                60f64.to_radians(),
                100f64.to_radians(),
                60f64.to_radians(),
            ],
        }
    }

    fn initialised(interp: Interp) -> Sequencer {
        let mut seq = Sequencer::new(config(interp));
        seq.init(vec![-35f64.to_radians(), 0.0, 0.0, 0.0]).unwrap();
        seq
    }

    #[test]
    fn test_state_order() {
        let mut state = SeqState::ToNeutral0;
        let mut visited = vec![state];
        while !state.is_terminal() {
            assert!(state.next() > state);
            state = state.next();
            visited.push(state);
        }

        assert_eq!(
            visited,
            vec![
                SeqState::ToNeutral0,
                SeqState::ToTopElbow,
                SeqState::ToNeutral1,
                SeqState::Terminal
            ]
        );
        assert_eq!(SeqState::Terminal.next(), SeqState::Terminal);
    }

    #[test]
    fn test_uninitialised() {
        let mut seq = Sequencer::new(config(Interp::MinimumJerk));

        assert_eq!(
            seq.proc(&Duration::from_secs(0)).err(),
            Some(SeqError::NotInitialised)
        );
        assert_eq!(
            seq.reference(Duration::from_secs(0)).err(),
            Some(SeqError::NotInitialised)
        );
    }

    #[test]
    fn test_monotonic_sequence() {
        for interp in [Interp::Linear, Interp::MinimumJerk].iter() {
            let mut seq = initialised(*interp);
            assert_eq!(seq.total_duration(), Duration::from_secs(9));

            let mut events = Vec::new();
            let mut finished_at = Vec::new();

            for k in 0..12_000u64 {
                let now = Duration::from_millis(k);
                let (event, report) = seq.proc(&now).unwrap();
                assert_eq!(report.state, seq.state());

                match event {
                    SeqEvent::Hold => (),
                    SeqEvent::Advanced(s) => events.push((k, s)),
                    SeqEvent::Finished => finished_at.push(k),
                }
            }

            // Each transition happens on the first tick past the dwell
            assert_eq!(
                events,
                vec![(2001, SeqState::ToTopElbow), (5001, SeqState::ToNeutral1)]
            );
            assert_eq!(finished_at, vec![9001]);
            assert_eq!(seq.state(), SeqState::Terminal);
        }
    }

    #[test]
    fn test_reference_at_state_boundaries() {
        let cfg = config(Interp::MinimumJerk);
        let mut seq = initialised(Interp::MinimumJerk);

        // Start of the first trajectory is the measured position
        assert_eq!(
            seq.reference(Duration::from_secs(0)).unwrap(),
            vec![-35f64.to_radians(), 0.0, 0.0, 0.0]
        );

        let mut refs = Vec::new();
        for k in 0..=9000u64 {
            let now = Duration::from_millis(k);
            let reference = seq.reference(now).unwrap();
            if k == 2000 || k == 5000 || k == 9000 {
                refs.push(reference);
            }
            seq.proc(&now).unwrap();
        }

        assert_eq!(refs[0], cfg.neutral);
        assert_eq!(refs[1], cfg.top_elbow);
        assert_eq!(refs[2], cfg.neutral);

        // Holds neutral once complete
        seq.proc(&Duration::from_millis(9001)).unwrap();
        assert_eq!(seq.reference(Duration::from_secs(20)).unwrap(), cfg.neutral);
    }

    #[test]
    fn test_invalid_trajectory_on_advance() {
        let mut cfg = config(Interp::MinimumJerk);
        // Elbow moves 35 deg in 0.1 s, far above 60 deg/s
        cfg.state_durations[1] = Duration::from_millis(100);

        let mut seq = Sequencer::new(cfg);
        seq.init(vec![-15f64.to_radians(), 0.0, 0.0, 0.0]).unwrap();

        let held = seq.reference(Duration::from_millis(2000)).unwrap();
        let before = seq.trajectory().unwrap().clone();

        let mut result = Ok((SeqEvent::Hold, seq.report));
        for k in 0..=2001u64 {
            result = seq.proc(&Duration::from_millis(k));
            if result.is_err() {
                break;
            }
        }

        match result {
            Err(SeqError::InvalidTrajectory { state, .. }) => {
                assert_eq!(state, SeqState::ToTopElbow)
            }
            r => panic!("Expected an invalid trajectory, got {:?}", r),
        }

        // Neither the state nor the active trajectory is changed by a failed transition
        assert_eq!(seq.state(), SeqState::ToNeutral0);
        assert_eq!(seq.trajectory().unwrap(), &before);
        assert!(seq.trajectory().unwrap().validate());
        assert_eq!(seq.reference(Duration::from_millis(2001)).unwrap(), held);
    }

    #[test]
    fn test_invalid_first_trajectory() {
        let mut seq = Sequencer::new(config(Interp::MinimumJerk));

        // Starting 120 deg away from neutral cannot be reached in 2 s at 60 deg/s
        let res = seq.init(vec![105f64.to_radians(), 0.0, 0.0, 0.0]);
        assert!(matches!(
            res,
            Err(SeqError::InvalidTrajectory {
                state: SeqState::ToNeutral0,
                ..
            })
        ));
        assert!(seq.trajectory().is_none());
    }

    #[test]
    fn test_start_dimension_mismatch() {
        let mut seq = Sequencer::new(config(Interp::Linear));

        assert!(matches!(
            seq.init(vec![0.0, 0.0]),
            Err(SeqError::TrajError(_))
        ));
    }
}
