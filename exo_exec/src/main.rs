//! Main exoskeleton executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Early initialisation: session, logging, parameters
//!     - Device initialisation and Ctrl-C handling
//!     - Control loop, at each tick:
//!         - Sensor acquisition
//!         - Reference generation and clamping
//!         - Command computation
//!         - Sequencer processing
//!         - Limit monitoring
//!         - Data recording
//!         - Command output
//!     - Shutdown: zero torque, data archiving, device disable
//!
//! # Modules
//!
//! Cyclic modules (e.g. `seq_mgr`) shall provide a public struct implementing the
//! `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info};
use structopt::StructOpt;

// Internal
use exo_lib::{
    cancel::CancellationSource,
    ctrl_loop::{ControlLoop, CtrlMode},
    device::{ExoDevice, SimExo, ZeroFeedback},
    params::ExoExecParams,
    recorder::DataLog,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the recorded loop data file within the session archive.
const TRAJ_LOG_FILE: &str = "exo_traj_log.csv";

/// Name of the run summary within the session directory.
const RUN_SUMMARY_FILE: &str = "run_summary.json";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "exo_exec",
    about = "Runs the elbow exercise sequence on the exoskeleton"
)]
struct Opts {
    /// Generate and record the trajectories but command zero torque.
    #[structopt(short, long)]
    no_torque: bool,

    /// Parameter file, relative to the params directory.
    #[structopt(short, long, default_value = "exo_exec.toml")]
    params: String,

    /// Minimum level of messages written to the session log file.
    #[structopt(short, long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("exo_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Exoskeleton Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: ExoExecParams =
        util::params::load(&opts.params).wrap_err("Could not load exec params")?;

    let mode = if opts.no_torque {
        info!("No torque mode, the device will be commanded zero torque");
        CtrlMode::NoTorque
    } else {
        CtrlMode::PositionControl
    };

    let ctrl_config = params
        .ctrl_config(mode, Some(session.arch_root.join(TRAJ_LOG_FILE)))
        .wrap_err("Invalid exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE CANCELLATION ----

    let cancel = CancellationSource::new();
    let ctrlc_latch = cancel.latch();
    ctrlc::set_handler(move || ctrlc_latch.set())
        .wrap_err("Failed to set the Ctrl-C handler")?;

    // ---- INITIALISE DEVICE ----

    let device = SimExo::new(&params.sim, ctrl_config.period)
        .wrap_err("Failed to initialise the simulated exoskeleton")?;
    let feedback = ZeroFeedback::new(device.num_joints());
    info!("SimExo initialised with {} joints", device.num_joints());

    let recorder = DataLog::new(&params.dof_names, params.expected_ticks());

    // ---- CONTROL LOOP ----

    let mut ctrl = ControlLoop::new(ctrl_config, device, feedback, recorder, cancel.latch())
        .wrap_err("Failed to initialise the control loop")?;

    info!("Beginning control loop\n");

    let result = ctrl.run();

    let summary = ctrl.summary();
    info!(
        "Run complete after {} ticks ({:.3} s), stop cause: {:?}",
        summary.ticks, summary.duration_s, summary.stop_cause
    );
    info!(
        "Timing: {} of {} ticks missed ({:.3} %), max jitter {:.1} us, p99 jitter {:.1} us",
        summary.timing.missed_ticks,
        summary.timing.total_ticks,
        summary.timing.miss_rate * 100.0,
        summary.timing.max_jitter_s * 1e6,
        summary.timing.p99_jitter_s * 1e6
    );

    session.save(RUN_SUMMARY_FILE, summary.clone());

    drop(ctrl);
    session.exit();

    result.wrap_err("Control loop failed")?;

    match summary.stop_cause {
        Some(cause) if cause.is_fault() => {
            error!("Run stopped on a fault: {:?}", cause);
            Err(eyre!("Run stopped on a fault: {:?}", cause))
        }
        _ => Ok(()),
    }
}
