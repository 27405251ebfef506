//! Implementations for the ControlLoop structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, trace, warn};
use std::time::Duration;

// Internal
use super::{CtrlConfig, CtrlError, CtrlMode, LoopState, RunSummary, StopCause};
use crate::{
    cancel::StopLatch,
    device::{DeviceError, ExoDevice, TorqueFeedback},
    recorder::Recorder,
    safety::{LimitMonitor, SetpointClamp},
    seq_mgr::{SeqEvent, Sequencer},
    timer::Timer,
};
use util::{maths::rad_to_deg, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The fixed period control loop.
///
/// The loop exclusively owns the device, the feedback channel and the recorder. When dropped
/// before reaching [`LoopState::Stopped`] it shuts down as if [`ControlLoop::shutdown`] had been
/// called.
pub struct ControlLoop<D, F, R>
where
    D: ExoDevice,
    F: TorqueFeedback,
    R: Recorder,
{
    device: D,
    feedback: F,
    recorder: R,

    sequencer: Sequencer,
    clamp: SetpointClamp,
    monitor: LimitMonitor,
    timer: Timer,
    latch: StopLatch,

    config: CtrlConfig,

    /// Sample period in nanoseconds, used to derive the loop time from the tick count.
    period_ns: u64,

    state: LoopState,
    stop_cause: Option<StopCause>,
    device_enabled: bool,

    /// Number of completed ticks.
    ticks: u64,

    /// True while the clamp is saturating, used to log only the onset of saturation.
    clamp_active: bool,
    clamped_ticks: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D, F, R> ControlLoop<D, F, R>
where
    D: ExoDevice,
    F: TorqueFeedback,
    R: Recorder,
{
    /// Create a new loop in [`LoopState::Idle`].
    pub fn new(
        config: CtrlConfig,
        device: D,
        feedback: F,
        recorder: R,
        latch: StopLatch,
    ) -> Result<Self, CtrlError> {
        let n = device.num_joints();
        for (what, found) in [
            ("setpoint ranges", config.clamp.num_dofs()),
            ("hard limits", config.monitor.limits().pos_min.len()),
            ("neutral positions", config.seq.neutral.len()),
            ("top elbow positions", config.seq.top_elbow.len()),
            ("maximum rates", config.seq.max_rate.len()),
        ]
        .iter()
        {
            if *found != n {
                return Err(CtrlError::DimensionMismatch {
                    what: *what,
                    expected: n,
                    found: *found,
                });
            }
        }

        let timer = Timer::new(
            config.period,
            config.wait_mode,
            config.acceptable_miss_rate,
        )?;

        Ok(Self {
            device,
            feedback,
            recorder,
            sequencer: Sequencer::new(config.seq.clone()),
            clamp: config.clamp.clone(),
            monitor: config.monitor.clone(),
            timer,
            latch,
            period_ns: config.period.as_nanos() as u64,
            config,
            state: LoopState::Idle,
            stop_cause: None,
            device_enabled: false,
            ticks: 0,
            clamp_active: false,
            clamped_ticks: 0,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stop_cause(&self) -> Option<&StopCause> {
        self.stop_cause.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Loop time of the given tick.
    fn loop_time(&self, tick: u64) -> Duration {
        Duration::from_nanos(self.period_ns * tick)
    }

    /// Start the loop, moving from `Idle` to `Running`.
    ///
    /// The device is enabled and read, and the first trajectory is armed from the measured
    /// positions to neutral. On any failure the loop is shut down before the error is returned.
    pub fn init(&mut self) -> Result<(), CtrlError> {
        if self.state != LoopState::Idle {
            return Err(CtrlError::NotIdle(self.state));
        }

        if let Err(e) = self.try_init() {
            error!("Control loop initialisation failed: {}", e);
            self.state = LoopState::Stopping;
            self.stop_cause = Some(match e {
                CtrlError::SeqError(ref se) => StopCause::ConfigError(se.to_string()),
                ref other => StopCause::DeviceFailure(other.to_string()),
            });
            if let Err(se) = self.shutdown() {
                error!("Shutdown after failed initialisation also failed: {}", se);
            }
            return Err(e);
        }

        self.state = LoopState::Running;
        self.timer.restart();

        info!(
            "Control loop running at {:.1} Hz in {:?} mode",
            1e9 / self.period_ns as f64,
            self.config.mode
        );

        Ok(())
    }

    fn try_init(&mut self) -> Result<(), CtrlError> {
        self.device.enable()?;
        self.device_enabled = true;

        self.device.read_all()?;
        self.device.update_kinematics();

        let start = self.device.joint_positions().to_vec();
        info!(
            "Initial joint positions: {:?} deg",
            start.iter().map(|p| rad_to_deg(*p)).collect::<Vec<f64>>()
        );

        self.sequencer.init(start)?;

        Ok(())
    }

    /// Perform one tick of the loop.
    ///
    /// Has no effect unless the loop is `Running`. Returns the state of the loop after the tick.
    pub fn step(&mut self) -> LoopState {
        if self.state != LoopState::Running {
            return self.state;
        }

        let now = self.loop_time(self.ticks);

        // Sensors
        if let Err(e) = self.device.read_all() {
            self.request_stop(StopCause::DeviceFailure(e.to_string()));
            return self.finish_tick();
        }
        self.device.update_kinematics();
        let positions = self.device.joint_positions().to_vec();
        let velocities = self.device.joint_velocities().to_vec();

        // Reference
        let mut reference = match self.sequencer.reference(now) {
            Ok(r) => r,
            Err(e) => {
                self.request_stop(StopCause::ConfigError(e.to_string()));
                return self.finish_tick();
            }
        };
        let clamp_report = self.clamp.apply(&mut reference);
        self.log_clamp(clamp_report.any(), &clamp_report.saturated);

        // Command
        let command = match self.compute_command(&reference) {
            Ok(c) => c,
            Err(e) => {
                self.request_stop(StopCause::DeviceFailure(e.to_string()));
                return self.finish_tick();
            }
        };

        // Sequencer transition rule
        match self.sequencer.proc(&now) {
            Ok((SeqEvent::Finished, _)) => self.request_stop(StopCause::SequenceComplete),
            Ok((event, report)) => trace!("Sequencer {:?}: {:?}", event, report),
            Err(e) => {
                error!("Sequencer configuration error: {}", e);
                self.request_stop(StopCause::ConfigError(e.to_string()));
            }
        }

        // Raw feedback, for the record only
        let feedback = match self.feedback.read() {
            Ok(f) => f,
            Err(e) => {
                self.request_stop(StopCause::DeviceFailure(e.to_string()));
                vec![0.0; positions.len()]
            }
        };

        // Hard limits, on the measured state and the staged command
        let snapshot = self.device.snapshot();
        if let Some(trip) = self
            .monitor
            .check(&snapshot, self.device.any_limit_exceeded())
        {
            error!("Limit trip at {:.3} s: {:?}", now.as_secs_f64(), trip);
            self.request_stop(StopCause::LimitTrip(trip));
        }

        // Record
        let mut row = Vec::with_capacity(1 + 5 * positions.len());
        row.push(now.as_secs_f64());
        row.extend_from_slice(&reference);
        row.extend_from_slice(&positions);
        row.extend_from_slice(&velocities);
        row.extend_from_slice(&command);
        row.extend_from_slice(&feedback);
        if let Err(e) = self.recorder.append_row(row) {
            self.request_stop(StopCause::RecorderFailure(e.to_string()));
        }

        // Cancellation is polled once per tick, here
        if self.stop_cause.is_none() && self.latch.is_set() {
            info!("Stop requested at {:.3} s", now.as_secs_f64());
            self.stop_cause = Some(StopCause::Cancelled);
        }

        // Write
        if self.stop_cause.is_none() {
            if let Err(e) = self.device.write_all() {
                self.request_stop(StopCause::DeviceFailure(e.to_string()));
            }
        }

        self.finish_tick()
    }

    /// Run the loop until it stops, then shut down.
    pub fn run(&mut self) -> Result<RunSummary, CtrlError> {
        if self.state == LoopState::Idle {
            self.init()?;
        }

        while self.step() == LoopState::Running {}

        self.shutdown()?;

        Ok(self.summary())
    }

    /// Stop the loop: command zero torque, write the recorded data and disable the device.
    ///
    /// Every step is attempted even if an earlier one fails, the first error is returned. Calling
    /// this on a stopped loop has no effect.
    pub fn shutdown(&mut self) -> Result<(), CtrlError> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }

        if self.stop_cause.is_none() {
            self.stop_cause = Some(StopCause::Cancelled);
        }
        self.state = LoopState::Stopping;
        self.latch.set();

        let mut result: Result<(), CtrlError> = Ok(());

        if self.device_enabled {
            let zeros = vec![0.0; self.device.num_joints()];
            let zeroed = self
                .device
                .set_raw_torques(&zeros)
                .and_then(|_| self.device.write_all());
            if let Err(e) = zeroed {
                error!("Could not zero the device outputs: {}", e);
                result = result.and(Err(e.into()));
            }
        }

        if let Some(path) = self.config.log_path.as_ref() {
            if let Err(e) = self.recorder.flush(path) {
                error!("Could not write the recorded data: {}", e);
                result = result.and(Err(e.into()));
            }
        }

        if self.device_enabled {
            match self.device.disable() {
                Ok(()) => self.device_enabled = false,
                Err(e) => {
                    error!("Could not disable the device: {}", e);
                    result = result.and(Err(e.into()));
                }
            }
        }

        self.state = LoopState::Stopped;

        match self.stop_cause.as_ref() {
            Some(cause) if cause.is_fault() => {
                warn!("Control loop stopped after {} ticks: {:?}", self.ticks, cause)
            }
            cause => info!("Control loop stopped after {} ticks: {:?}", self.ticks, cause),
        }

        result
    }

    /// Build the summary of the run so far.
    pub fn summary(&mut self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            duration_s: self.loop_time(self.ticks.saturating_sub(1)).as_secs_f64(),
            mode: self.config.mode,
            stop_cause: self.stop_cause.clone(),
            final_seq_state: self.sequencer.state(),
            clamped_ticks: self.clamped_ticks,
            timing: self.timer.metrics_mut().summary(),
        }
    }

    fn compute_command(&mut self, reference: &[f64]) -> Result<Vec<f64>, DeviceError> {
        match self.config.mode {
            CtrlMode::PositionControl => self.device.set_pos_ctrl_torques(reference),
            CtrlMode::NoTorque => {
                let zeros = vec![0.0; reference.len()];
                self.device.set_raw_torques(&zeros)?;
                Ok(zeros)
            }
        }
    }

    /// Record the cause of a stop. Only the first cause is kept.
    fn request_stop(&mut self, cause: StopCause) {
        if let StopCause::DeviceFailure(ref msg) = cause {
            error!("Device failure: {}", msg);
        }

        if self.stop_cause.is_none() {
            self.stop_cause = Some(cause);
        }
        self.latch.set();
    }

    fn log_clamp(&mut self, any: bool, saturated: &[bool]) {
        if any {
            self.clamped_ticks += 1;
            if !self.clamp_active {
                warn!("Reference saturated by the setpoint clamp: {:?}", saturated);
            }
        } else if self.clamp_active {
            info!("Reference back inside the setpoint range");
        }
        self.clamp_active = any;
    }

    /// Complete the current tick and wait for the next one.
    fn finish_tick(&mut self) -> LoopState {
        self.ticks += 1;

        if self.stop_cause.is_some() {
            self.state = LoopState::Stopping;
        } else {
            self.timer.wait();
        }

        self.state
    }
}

impl<D, F, R> Drop for ControlLoop<D, F, R>
where
    D: ExoDevice,
    F: TorqueFeedback,
    R: Recorder,
{
    fn drop(&mut self) {
        if self.state != LoopState::Stopped {
            if let Err(e) = self.shutdown() {
                error!("Control loop shutdown on drop failed: {}", e);
            }
        }
    }
}
