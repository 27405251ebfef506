//! # Exoskeleton Executable Parameters
//!
//! This module provides parameters for the exoskeleton executable, loaded from
//! `params/exo_exec.toml`. Angles are given in degrees in the file and converted into radians here.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use util::time::seconds_to_duration;

use crate::{
    ctrl_loop::{CtrlConfig, CtrlMode},
    device::SimParams,
    safety::{self, SafetyError},
    seq_mgr::{self, SeqError},
    timer::WaitMode,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExoExecParams {
    /// Sample period of the control loop.
    ///
    /// Units: seconds
    pub sample_period_s: f64,

    /// How the loop waits for the end of each tick
    pub wait_mode: WaitMode,

    /// Fraction of missed ticks above which a warning is raised
    pub acceptable_miss_rate: f64,

    /// Name of each DOF, used in the recorded data
    pub dof_names: Vec<String>,

    pub seq: seq_mgr::Params,

    pub safety: safety::Params,

    /// Simulated exoskeleton
    pub sim: SimParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("The sample period must be positive, found {0} s")]
    InvalidSamplePeriod(f64),

    #[error("Expected {expected} DOF names, found {found}")]
    DofNames { expected: usize, found: usize },

    #[error("Invalid sequencer parameters: {0}")]
    SeqError(#[from] SeqError),

    #[error("Invalid safety parameters: {0}")]
    SafetyError(#[from] SafetyError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExoExecParams {
    pub fn sample_period(&self) -> Result<Duration, ParamsError> {
        match seconds_to_duration(self.sample_period_s) {
            Some(d) if d > Duration::from_secs(0) => Ok(d),
            _ => Err(ParamsError::InvalidSamplePeriod(self.sample_period_s)),
        }
    }

    /// Build the control loop configuration.
    pub fn ctrl_config(
        &self,
        mode: CtrlMode,
        log_path: Option<PathBuf>,
    ) -> Result<CtrlConfig, ParamsError> {
        let seq = self.seq.to_config()?;

        if self.dof_names.len() != seq.neutral.len() {
            return Err(ParamsError::DofNames {
                expected: seq.neutral.len(),
                found: self.dof_names.len(),
            });
        }

        Ok(CtrlConfig {
            period: self.sample_period()?,
            wait_mode: self.wait_mode,
            acceptable_miss_rate: self.acceptable_miss_rate,
            mode,
            seq,
            clamp: self.safety.setpoint_clamp()?,
            monitor: self.safety.limit_monitor()?,
            log_path,
        })
    }

    /// Number of ticks in a complete run, used to size the recorder.
    ///
    /// The loop runs from tick zero to the first tick past the end of the final dwell.
    pub fn expected_ticks(&self) -> usize {
        let total_s: f64 = self.seq.state_durations_s.iter().sum();
        (total_s / self.sample_period_s).round().max(0.0) as usize + 2
    }
}
