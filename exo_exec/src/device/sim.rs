//! Simulated exoskeleton
//!
//! Each joint is modelled as an independent damped inertia driven by the commanded torque:
//!
//! ```text
//! J * acc = tau - b * vel
//! ```
//!
//! integrated with a semi-implicit Euler step of one sample period on every
//! [`ExoDevice::write_all`]. Position control is a PD law on the reference with torque
//! saturation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use util::maths::{clamp, deg_to_rad_vec};

use super::{check_len, DeviceError, ExoDevice};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated exoskeleton, one entry per joint in every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Units: kilogram meters squared
    pub inertia_kgm2: Vec<f64>,

    /// Viscous damping.
    ///
    /// Units: newton meter seconds/radian
    pub damping_nms: Vec<f64>,

    /// Position control proportional gain.
    ///
    /// Units: newton meters/radian
    pub kp_nm_rad: Vec<f64>,

    /// Position control derivative gain.
    ///
    /// Units: newton meter seconds/radian
    pub kd_nms_rad: Vec<f64>,

    /// Saturation of the commanded torque.
    ///
    /// Units: newton meters
    pub torque_limit_nm: Vec<f64>,

    /// Joint position limits of the device.
    ///
    /// Units: degrees
    pub pos_min_deg: Vec<f64>,

    /// Units: degrees
    pub pos_max_deg: Vec<f64>,

    /// Units: degrees/second
    pub vel_max_degs: Vec<f64>,

    /// Joint positions at power on.
    ///
    /// Units: degrees
    pub initial_pos_deg: Vec<f64>,
}

/// A simulated exoskeleton.
#[derive(Debug, Clone)]
pub struct SimExo {
    /// Integration step.
    ///
    /// Units: seconds
    dt_s: f64,

    inertia: Vec<f64>,
    damping: Vec<f64>,
    kp: Vec<f64>,
    kd: Vec<f64>,
    torque_limit: Vec<f64>,
    pos_min: Vec<f64>,
    pos_max: Vec<f64>,
    vel_max: Vec<f64>,

    enabled: bool,

    /// True state of the joints.
    true_pos: Vec<f64>,
    true_vel: Vec<f64>,

    /// State latched by the last read.
    pos: Vec<f64>,
    vel: Vec<f64>,

    /// Staged command torques.
    cmd_torques: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimExo {
    /// Create a new simulated exoskeleton stepping by `dt` on each write.
    pub fn new(params: &SimParams, dt: Duration) -> Result<Self, DeviceError> {
        let n = params.inertia_kgm2.len();
        if n == 0 {
            return Err(DeviceError::InvalidParam("inertia_kgm2"));
        }

        for field in [
            &params.damping_nms,
            &params.kp_nm_rad,
            &params.kd_nms_rad,
            &params.torque_limit_nm,
            &params.pos_min_deg,
            &params.pos_max_deg,
            &params.vel_max_degs,
            &params.initial_pos_deg,
        ]
        .iter()
        {
            check_len(field, n)?;
        }

        if params.inertia_kgm2.iter().any(|j| !(*j > 0.0)) {
            return Err(DeviceError::InvalidParam("inertia_kgm2"));
        }
        if dt == Duration::from_secs(0) {
            return Err(DeviceError::InvalidParam("dt"));
        }

        let initial_pos = deg_to_rad_vec(&params.initial_pos_deg);

        Ok(Self {
            dt_s: dt.as_secs_f64(),
            inertia: params.inertia_kgm2.clone(),
            damping: params.damping_nms.clone(),
            kp: params.kp_nm_rad.clone(),
            kd: params.kd_nms_rad.clone(),
            torque_limit: params.torque_limit_nm.clone(),
            pos_min: deg_to_rad_vec(&params.pos_min_deg),
            pos_max: deg_to_rad_vec(&params.pos_max_deg),
            vel_max: deg_to_rad_vec(&params.vel_max_degs),
            enabled: false,
            true_pos: initial_pos.clone(),
            true_vel: vec![0.0; n],
            pos: initial_pos,
            vel: vec![0.0; n],
            cmd_torques: vec![0.0; n],
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn saturate(&self, torques: &mut [f64]) {
        for (t, lim) in torques.iter_mut().zip(self.torque_limit.iter()) {
            *t = clamp(*t, -lim, *lim);
        }
    }

    /// Advance the model by one step under the staged torques.
    fn step(&mut self) {
        for i in 0..self.inertia.len() {
            let acc = (self.cmd_torques[i] - self.damping[i] * self.true_vel[i]) / self.inertia[i];
            self.true_vel[i] += acc * self.dt_s;
            self.true_pos[i] += self.true_vel[i] * self.dt_s;
        }
    }
}

impl ExoDevice for SimExo {
    fn num_joints(&self) -> usize {
        self.inertia.len()
    }

    fn enable(&mut self) -> Result<(), DeviceError> {
        self.enabled = true;
        debug!("SimExo enabled");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DeviceError> {
        if self.enabled {
            for t in self.cmd_torques.iter_mut() {
                *t = 0.0;
            }
            self.enabled = false;
            debug!("SimExo disabled");
        }
        Ok(())
    }

    fn read_all(&mut self) -> Result<(), DeviceError> {
        if !self.enabled {
            return Err(DeviceError::NotEnabled);
        }
        Ok(())
    }

    fn update_kinematics(&mut self) {
        self.pos.copy_from_slice(&self.true_pos);
        self.vel.copy_from_slice(&self.true_vel);
    }

    fn joint_positions(&self) -> &[f64] {
        &self.pos
    }

    fn joint_velocities(&self) -> &[f64] {
        &self.vel
    }

    fn joint_command_torques(&self) -> &[f64] {
        &self.cmd_torques
    }

    fn set_pos_ctrl_torques(&mut self, reference: &[f64]) -> Result<Vec<f64>, DeviceError> {
        check_len(reference, self.num_joints())?;

        let mut torques: Vec<f64> = reference
            .iter()
            .enumerate()
            .map(|(i, r)| self.kp[i] * (r - self.pos[i]) - self.kd[i] * self.vel[i])
            .collect();
        self.saturate(&mut torques);

        self.cmd_torques.copy_from_slice(&torques);

        Ok(torques)
    }

    fn set_raw_torques(&mut self, torques: &[f64]) -> Result<(), DeviceError> {
        check_len(torques, self.num_joints())?;

        let mut staged = torques.to_vec();
        self.saturate(&mut staged);
        self.cmd_torques = staged;

        Ok(())
    }

    fn write_all(&mut self) -> Result<(), DeviceError> {
        if !self.enabled {
            return Err(DeviceError::NotEnabled);
        }
        self.step();
        Ok(())
    }

    fn any_limit_exceeded(&self) -> bool {
        let mut exceeded = false;

        for i in 0..self.num_joints() {
            if self.pos[i] < self.pos_min[i] || self.pos[i] > self.pos_max[i] {
                warn!("SimExo joint {} position limit exceeded: {:.4} rad", i, self.pos[i]);
                exceeded = true;
            }
            if self.vel[i].abs() > self.vel_max[i] {
                warn!("SimExo joint {} velocity limit exceeded: {:.4} rad/s", i, self.vel[i]);
                exceeded = true;
            }
        }

        exceeded
    }
}
