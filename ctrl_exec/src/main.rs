//! Control executable entry point.
//!
//! # Architecture
//!
//! The executable is a set of tasks run cyclically by the execution manager,
//! in order:
//!
//!     - Cycle time update
//!     - Simulation of the field (`--simulation` only)
//!     - Target script processing
//!     - Trajectory control of each robot
//!     - Sending of the robot commands
//!
//! The loop runs until the script is over, or until Ctrl-C is received. All
//! robots are stopped on exit.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use ctrl_lib::{
    commander::{Commander, LogCommander, SimCommander},
    data_store::DataStore,
    exec_mgr::ExecutionManager,
    params::CtrlExecParams,
    sim::Simulator,
    tasks::{self, priority, Clock, ControlSender, ControlTask, ScriptTask, SimTask, TimeUpdater},
    traj_ctrl,
};
use util::{
    logger::{logger_init, LevelFilter},
    script_interpreter::ScriptInterpreter,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "ctrl_exec", about = "Trajectory control of small size robots")]
struct Opt {
    /// Target script to execute, the default manoeuvre is used if not given
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Control simulated robots instead of real ones
    #[structopt(long)]
    simulation: bool,

    /// Emergency stop: disable every robot and exit
    #[structopt(long = "em")]
    emergency_stop: bool,

    /// Minimum level of the logs (info, debug or trace)
    #[structopt(long, default_value = "trace")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opt.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("SSL Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- EMERGENCY STOP ----

    if opt.emergency_stop {
        info!("Emergency stop requested, disabling all robots");
        LogCommander::default().stop_all();
        session.exit();
        return Ok(());
    }

    // ---- LOAD PARAMETERS ----

    let exec_params: CtrlExecParams =
        util::params::load("ctrl_exec.toml").wrap_err("Could not load exec params")?;
    let traj_ctrl_params: traj_ctrl::Params =
        util::params::load("traj_ctrl.toml").wrap_err("Could not load TrajCtrl params")?;

    if !(exec_params.control_period_s > 0.0) {
        return Err(eyre!(
            "Control period must be strictly positive, got {}",
            exec_params.control_period_s
        ));
    }

    info!("Exec parameters loaded");

    // ---- LOAD SCRIPT ----

    let si = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);
            ScriptInterpreter::new(path).wrap_err("Failed to load script")?
        }
        None => {
            info!("No script provided, running the default manoeuvre");
            ScriptInterpreter::from_script_str(tasks::DEFAULT_MANOEUVRE_SCRIPT)
                .wrap_err("Failed to load the default manoeuvre")?
        }
    };

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        si.get_duration(),
        si.get_num_tcs()
    );

    // ---- INITIALISE TASKS ----

    info!("Initialising tasks...");

    let mut em = ExecutionManager::new();

    em.add_task(TimeUpdater::new(Clock::Session), Some(priority::TIME_UPDATER));
    em.add_task(ScriptTask::new(si), Some(priority::SCRIPT));
    em.add_task(
        ControlTask::new(
            exec_params.num_robots,
            &traj_ctrl_params,
            exec_params.control_period_s,
            exec_params.max_pose_age_s,
        )
        .wrap_err("Failed to initialise TrajCtrl")?,
        Some(priority::CONTROL),
    );

    if opt.simulation {
        let (sim, sender) = Simulator::new(&exec_params.sim_robots, exec_params.sim_max_step_s);
        info!("Simulating {} robots", sim.num_robots());

        em.add_task(SimTask::new(sim), Some(priority::SIM));
        em.add_task(ControlSender::new(SimCommander::new(sender)), Some(priority::CONTROL_SENDER));
    } else {
        em.add_task(ControlSender::new(LogCommander::default()), Some(priority::CONTROL_SENDER));
    }

    em.shutdown_handle()
        .set_ctrlc_handler()
        .wrap_err("Failed to set the Ctrl-C handler")?;

    info!("Task initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut ds = DataStore::default();
    em.run(
        &mut ds,
        Duration::from_secs_f64(exec_params.control_period_s),
    );

    info!(
        "End of main loop after {} cycles ({:.02} s)",
        em.num_iterations(),
        ds.time_s
    );

    // ---- SHUTDOWN ----

    session.exit();

    Ok(())
}
