//! # Control loop module
//!
//! The control loop runs the exercise at a fixed sample period. Each tick it reads the device,
//! evaluates and clamps the reference, commands the device, steps the sequencer, checks the hard
//! limits and records a row of data.
//!
//! The loop moves through the states `Idle -> Running -> Stopping -> Stopped`. Every anomaly,
//! whether a limit trip, a configuration error, a device failure or a cancellation, resolves to
//! `Stopping`, in which the device is commanded zero torque before being disabled.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

// Internal
use crate::{
    device::DeviceError,
    recorder::RecorderError,
    safety::{LimitMonitor, LimitTrip, SetpointClamp},
    seq_mgr::{SeqConfig, SeqError, SeqState},
    timer::{TimerError, TimingSummary, WaitMode},
};
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration of the control loop.
#[derive(Debug, Clone)]
pub struct CtrlConfig {
    /// Sample period of the loop.
    pub period: Duration,

    pub wait_mode: WaitMode,

    /// Fraction of missed ticks above which a warning is raised.
    pub acceptable_miss_rate: f64,

    pub mode: CtrlMode,

    pub seq: SeqConfig,

    pub clamp: SetpointClamp,

    pub monitor: LimitMonitor,

    /// Where the recorded data is written on shutdown, or `None` to discard it.
    pub log_path: Option<PathBuf>,
}

/// Summary of a run of the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,

    /// Loop time at the last tick.
    ///
    /// Units: seconds
    pub duration_s: f64,

    pub mode: CtrlMode,

    pub stop_cause: Option<StopCause>,

    pub final_seq_state: SeqState,

    /// Number of ticks on which at least one reference was saturated.
    pub clamped_ticks: u64,

    pub timing: TimingSummary,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// States of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// How the device is commanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtrlMode {
    /// Position control torques tracking the reference.
    PositionControl,

    /// Zero raw torques, the reference is only recorded.
    NoTorque,
}

/// Reason the loop left `Running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopCause {
    /// The sequence completed.
    SequenceComplete,

    /// The stop latch was set from outside the loop.
    Cancelled,

    /// The measured state crossed a hard limit.
    LimitTrip(LimitTrip),

    /// A trajectory could not be built or failed validation.
    ConfigError(String),

    /// Reading from or writing to the device failed.
    DeviceFailure(String),

    /// A row could not be recorded.
    RecorderFailure(String),
}

/// Possible errors that can occur during ControlLoop operation.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("Expected {expected} {what} (one per joint), found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("The loop can only be started from Idle, it is {0:?}")]
    NotIdle(LoopState),

    #[error(transparent)]
    TimerError(#[from] TimerError),

    #[error("Could not start the sequence: {0}")]
    SeqError(#[from] SeqError),

    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Could not write the recorded data: {0}")]
    RecorderError(#[from] RecorderError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StopCause {
    /// True if the stop is a failure rather than a normal end of the run.
    pub fn is_fault(&self) -> bool {
        !matches!(self, StopCause::SequenceComplete | StopCause::Cancelled)
    }
}
