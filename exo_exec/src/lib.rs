//! # Exoskeleton library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the exoskeleton crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cancellation - the stop latch shared between the signal handler and the loop
pub mod cancel;

/// Control loop - runs the exercise at a fixed sample period
pub mod ctrl_loop;

/// Device - interface to the exoskeleton and its simulation
pub mod device;

/// Executable parameters
pub mod params;

/// Recorder - accumulates the loop data and writes it out after the run
pub mod recorder;

/// Safety - setpoint clamp and hard limit monitoring
pub mod safety;

/// Sequence manager - chains the waypoints of the exercise
pub mod seq_mgr;

/// Timer - fixed period loop timing and deadline metrics
pub mod timer;

/// Trajectory - waypoints, trajectories and the minimum jerk generator
pub mod traj;
