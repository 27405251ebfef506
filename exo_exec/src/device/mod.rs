//! # Device module
//!
//! This module provides a unified interface to an actuated exoskeleton, so that the control loop
//! can drive either real hardware or the [`SimExo`] model. All quantities are per joint and in SI
//! units (radians, radians/second, newton meters).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`ExoDevice`] implementation for a simulated exoskeleton.
mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use sim::*;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing an exoskeleton.
///
/// Sensor values are latched by [`ExoDevice::read_all`] and commands are only sent to the
/// actuators by [`ExoDevice::write_all`], so a command may be staged and then discarded.
pub trait ExoDevice {
    /// Number of joints on the device.
    fn num_joints(&self) -> usize;

    /// Enable the device, required before any read or write.
    fn enable(&mut self) -> Result<(), DeviceError>;

    /// Disable the device. Disabling a disabled device has no effect.
    fn disable(&mut self) -> Result<(), DeviceError>;

    /// Read all sensors.
    fn read_all(&mut self) -> Result<(), DeviceError>;

    /// Update the joint state from the latest sensor readings.
    fn update_kinematics(&mut self);

    /// Measured joint positions.
    ///
    /// Units: radians
    fn joint_positions(&self) -> &[f64];

    /// Measured joint velocities.
    ///
    /// Units: radians/second
    fn joint_velocities(&self) -> &[f64];

    /// Torques currently commanded to each joint.
    ///
    /// Units: newton meters
    fn joint_command_torques(&self) -> &[f64];

    /// Compute and stage position control torques tracking the given reference.
    ///
    /// ## Arguments
    /// - `reference` - Target position of each joint, in radians.
    ///
    /// Returns the staged torques.
    fn set_pos_ctrl_torques(&mut self, reference: &[f64]) -> Result<Vec<f64>, DeviceError>;

    /// Stage raw joint torques, bypassing position control.
    fn set_raw_torques(&mut self, torques: &[f64]) -> Result<(), DeviceError>;

    /// Send the staged commands to the actuators.
    fn write_all(&mut self) -> Result<(), DeviceError>;

    /// True if the device considers any of its own limits to be exceeded.
    fn any_limit_exceeded(&self) -> bool;

    /// Copy the current joint state.
    fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            joint_positions: self.joint_positions().to_vec(),
            joint_velocities: self.joint_velocities().to_vec(),
            joint_command_torques: self.joint_command_torques().to_vec(),
        }
    }
}

/// Raw torque feedback channel, used for logging only.
pub trait TorqueFeedback {
    /// Read the raw feedback of each joint.
    fn read(&mut self) -> Result<Vec<f64>, DeviceError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Joint state of the device, refreshed once per cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Units: radians
    pub joint_positions: Vec<f64>,

    /// Units: radians/second
    pub joint_velocities: Vec<f64>,

    /// Units: newton meters
    pub joint_command_torques: Vec<f64>,
}

/// Feedback channel which always reads zero, for devices without torque sensing.
#[derive(Debug, Clone)]
pub struct ZeroFeedback {
    num_joints: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("The device is not enabled")]
    NotEnabled,

    #[error("Expected {expected} values (one per joint), found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Device parameter {0} is invalid")]
    InvalidParam(&'static str),

    #[error("Device I/O failed: {0}")]
    Io(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ZeroFeedback {
    pub fn new(num_joints: usize) -> Self {
        Self { num_joints }
    }
}

impl TorqueFeedback for ZeroFeedback {
    fn read(&mut self) -> Result<Vec<f64>, DeviceError> {
        Ok(vec![0.0; self.num_joints])
    }
}

/// Check a per-joint slice has the expected length.
pub(crate) fn check_len(values: &[f64], expected: usize) -> Result<(), DeviceError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(DeviceError::DimensionMismatch {
            expected,
            found: values.len(),
        })
    }
}
