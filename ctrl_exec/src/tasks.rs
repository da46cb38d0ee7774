//! # Control loop tasks
//!
//! The control executable is assembled from these tasks, run by the
//! execution manager in the following order each cycle:
//!
//! 1. [`TimeUpdater`]: sets the time of the cycle.
//! 2. [`SimTask`]: in simulation only, moves the simulated robots and
//!    publishes their poses.
//! 3. [`ScriptTask`]: issues the telecommands of the target script.
//! 4. [`ControlTask`]: executes the telecommands and runs the trajectory
//!    controller of each robot.
//! 5. [`ControlSender`]: hands the controls to the commander.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};

// Internal
use crate::{
    commander::Commander,
    data_store::DataStore,
    exec_mgr::Task,
    loc::Pose,
    sim::Simulator,
    traj_ctrl::{self, InputData, TrajCtrl, TrajCtrlError},
};
use comms_if::tc::{PoseTarget, RobotId, Tc};
use util::{
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Script executed when no script is given: robot 0 goes 1 m forward along
/// the field's X axis while making a quarter turn.
pub const DEFAULT_MANOEUVRE_SCRIPT: &str = r#"
0.0: {"type": "MOVE_BY", "payload": {"robot_id": 0, "x_m": 1.0, "y_m": 0.0, "theta_rad": 1.5707963267948966}};
"#;

/// Recommended priorities of the tasks.
pub mod priority {
    pub const TIME_UPDATER: i32 = 0;
    pub const SIM: i32 = 10;
    pub const SCRIPT: i32 = 20;
    pub const CONTROL: i32 = 30;
    pub const CONTROL_SENDER: i32 = 40;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sets the time of each cycle.
pub struct TimeUpdater {
    clock: Clock,
}

/// Moves the simulated robots and publishes their poses.
pub struct SimTask {
    sim: Simulator,
}

/// Issues the telecommands of a script, the script's time starting on the
/// first cycle the task runs.
pub struct ScriptTask {
    si: ScriptInterpreter,
    start_time_s: Option<f64>,
}

/// Executes telecommands and runs the trajectory controllers.
pub struct ControlTask {
    controllers: Vec<TrajCtrl>,
    max_pose_age_s: f64,

    /// Movement telecommands waiting for the robot's pose to be known
    deferred: Vec<Tc>,
}

/// Sends the controls of each cycle as one batch.
///
/// All robots are stopped when the sender is dropped, which happens when the
/// loop ends.
pub struct ControlSender {
    commander: Box<dyn Commander>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Source of the cycle time.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Seconds since the start of the session
    Session,

    /// Fixed increment per cycle, independent of the wall clock
    Stepped { step_s: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TimeUpdater {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }
}

impl Task<DataStore> for TimeUpdater {
    fn run(&mut self, ds: &mut DataStore) -> bool {
        let time_s = match self.clock {
            Clock::Session => session::get_elapsed_seconds(),
            Clock::Stepped { step_s } => ds.num_cycles as f64 * step_s,
        };

        ds.cycle_start(time_s);

        true
    }

    fn name(&self) -> &str {
        "TimeUpdater"
    }
}

impl SimTask {
    pub fn new(sim: Simulator) -> Self {
        Self { sim }
    }
}

impl Task<DataStore> for SimTask {
    fn run(&mut self, ds: &mut DataStore) -> bool {
        self.sim.step(ds.time_s);

        for (robot_id, pose) in self.sim.poses() {
            ds.vision.update(robot_id, pose, ds.time_s);
        }

        true
    }

    fn name(&self) -> &str {
        "SimTask"
    }
}

impl ScriptTask {
    pub fn new(si: ScriptInterpreter) -> Self {
        Self {
            si,
            start_time_s: None,
        }
    }
}

impl Task<DataStore> for ScriptTask {
    fn run(&mut self, ds: &mut DataStore) -> bool {
        let start_time_s = *self.start_time_s.get_or_insert(ds.time_s);

        match self.si.get_pending_tcs(ds.time_s - start_time_s) {
            PendingTcs::None => true,
            PendingTcs::Some(tcs) => {
                for tc in tcs {
                    info!("Script TC: {:?}", tc);
                    ds.tcs.push(tc);
                }
                true
            }
            PendingTcs::EndOfScript => {
                info!("End of target script reached");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ScriptTask"
    }
}

impl ControlTask {
    /// Create and initialise controllers for robots `0..num_robots`.
    pub fn new(
        num_robots: u8,
        params: &traj_ctrl::Params,
        control_period_s: f64,
        max_pose_age_s: f64,
    ) -> Result<Self, TrajCtrlError> {
        let mut controllers = Vec::with_capacity(num_robots as usize);

        for robot_id in 0..num_robots {
            let mut ctrl = TrajCtrl::new(robot_id);
            ctrl.init(traj_ctrl::InitData {
                params: params.clone(),
                control_period_s,
            })?;
            controllers.push(ctrl);
        }

        Ok(Self {
            controllers,
            max_pose_age_s,
            deferred: Vec::new(),
        })
    }

    /// Execute a telecommand.
    ///
    /// Returns the telecommand if it has to wait for the robot's pose. Stops
    /// cancel the movements still waiting for the robots they address.
    fn exec_tc(&mut self, tc: Tc, ds: &DataStore) -> Option<Tc> {
        let max_pose_age_s = self.max_pose_age_s;
        let pose_of = |robot_id| ds.vision.get(robot_id, ds.time_s, max_pose_age_s);

        match tc {
            Tc::StopAll => {
                if !self.deferred.is_empty() {
                    debug!("Dropping {} deferred movements", self.deferred.len());
                    self.deferred.clear();
                }
                for ctrl in self.controllers.iter_mut() {
                    ctrl.disable();
                }
            }
            Tc::Stop(RobotId { robot_id }) => {
                self.deferred.retain(|t| t.robot_id() != Some(robot_id));

                let pose = pose_of(robot_id);
                match self.controller(robot_id) {
                    Some(ctrl) => match pose {
                        Some(p) => ctrl.hold(p),
                        None => ctrl.disable(),
                    },
                    None => warn!("No controller for robot {}, STOP ignored", robot_id),
                }
            }
            Tc::MoveTo(PoseTarget { robot_id, .. }) | Tc::MoveBy(PoseTarget { robot_id, .. }) => {
                let pose = match pose_of(robot_id) {
                    Some(p) => p,
                    None => {
                        trace!("Robot {} pose unknown, movement deferred", robot_id);
                        return Some(tc);
                    }
                };

                let target = match tc {
                    Tc::MoveBy(t) => Pose::new(
                        pose.position_m[0] + t.x_m,
                        pose.position_m[1] + t.y_m,
                        pose.orientation_rad + t.theta_rad,
                    ),
                    Tc::MoveTo(t) => Pose::new(t.x_m, t.y_m, t.theta_rad),
                    _ => return None,
                };

                let time_s = ds.time_s;
                match self.controller(robot_id) {
                    Some(ctrl) => {
                        if let Err(e) = ctrl.go_to(&pose, &target, time_s) {
                            warn!("Robot {} cannot move to its target: {}", robot_id, e);
                        }
                    }
                    None => warn!("No controller for robot {}, movement ignored", robot_id),
                }
            }
        }

        None
    }

    fn controller(&mut self, robot_id: u8) -> Option<&mut TrajCtrl> {
        self.controllers
            .iter_mut()
            .find(|c| c.robot_id() == robot_id)
    }
}

impl Task<DataStore> for ControlTask {
    fn run(&mut self, ds: &mut DataStore) -> bool {
        // ---- TELECOMMAND PROCESSING ----

        let mut tcs = std::mem::take(&mut self.deferred);
        tcs.append(&mut ds.tcs);

        for tc in tcs {
            if let Some(tc) = self.exec_tc(tc, ds) {
                self.deferred.push(tc);
            }
        }

        // ---- TRAJECTORY CONTROL ----

        for ctrl in self.controllers.iter_mut() {
            let robot_id = ctrl.robot_id();
            let input = InputData {
                time_s: ds.time_s,
                pose: ds.vision.get(robot_id, ds.time_s, self.max_pose_age_s),
            };

            match ctrl.proc(&input) {
                Ok((Some(control), report)) => {
                    ds.controls.push((robot_id, control));
                    ds.traj_ctrl_reports.push((robot_id, report));
                }
                Ok((None, _)) => (),
                Err(e) => warn!("Error during TrajCtrl processing of robot {}: {}", robot_id, e),
            }
        }

        true
    }

    fn name(&self) -> &str {
        "ControlTask"
    }
}

impl ControlSender {
    pub fn new<C: Commander + 'static>(commander: C) -> Self {
        Self {
            commander: Box::new(commander),
        }
    }
}

impl Task<DataStore> for ControlSender {
    fn run(&mut self, ds: &mut DataStore) -> bool {
        for (robot_id, control) in ds.controls.iter() {
            if let Some(cmd) = control.to_robot_cmd(*robot_id) {
                self.commander.set(cmd);
            }
        }
        self.commander.flush();

        true
    }

    fn name(&self) -> &str {
        "ControlSender"
    }
}

impl Drop for ControlSender {
    fn drop(&mut self) {
        info!("Stopping all robots");
        self.commander.stop_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        commander::SimCommander,
        exec_mgr::ExecutionManager,
        traj_ctrl::{FrameMode, IdleTarget, Params, TrajCtrlMode},
    };
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const PERIOD_S: f64 = 0.01;

    /// Build a simulated control loop for a single robot at the origin.
    fn sim_loop(script: &str, frame_mode: FrameMode) -> ExecutionManager<DataStore> {
        let params = Params {
            step_time: 1e-3,
            frame_mode,
            ..Params::default()
        };

        let (sim, tx) = Simulator::new(&[Pose::default()], 1e-3);

        let mut em = ExecutionManager::new();
        em.add_task(
            TimeUpdater::new(Clock::Stepped { step_s: PERIOD_S }),
            Some(priority::TIME_UPDATER),
        );
        em.add_task(SimTask::new(sim), Some(priority::SIM));
        em.add_task(
            ScriptTask::new(ScriptInterpreter::from_script_str(script).unwrap()),
            Some(priority::SCRIPT),
        );
        em.add_task(
            ControlTask::new(1, &params, PERIOD_S, 0.1).unwrap(),
            Some(priority::CONTROL),
        );
        em.add_task(ControlSender::new(SimCommander::new(tx)), Some(priority::CONTROL_SENDER));

        em
    }

    fn run_for(em: &mut ExecutionManager<DataStore>, ds: &mut DataStore, duration_s: f64) {
        for _ in 0..(duration_s / PERIOD_S) as usize {
            assert!(em.run_once(ds));
        }
    }

    fn check_reached(ds: &DataStore, target: &Pose) {
        let pose = ds.vision.last(0).unwrap().pose;
        assert_abs_diff_eq!(pose.position_m, target.position_m, epsilon = 0.01);
        assert_abs_diff_eq!(pose.orientation_rad, target.orientation_rad, epsilon = 0.01);

        // Commands have decayed to nothing
        let (_, control) = ds.controls[0];
        assert!(control.active);
        assert!(control.velocity_translation.norm() < 0.02);
        assert!(control.velocity_rotation.abs() < 0.02);
    }

    #[test]
    fn test_static_target_relative() {
        let mut em = sim_loop(
            r#"0.0: {"type": "MOVE_TO", "payload": {"robot_id": 0, "x_m": 1.0, "y_m": 0.5, "theta_rad": 1.5707963267948966}};"#,
            FrameMode::Relative,
        );
        let mut ds = DataStore::default();

        run_for(&mut em, &mut ds, 3.0);

        check_reached(&ds, &Pose::new(1.0, 0.5, FRAC_PI_2));
    }

    #[test]
    fn test_static_target_absolute() {
        let mut em = sim_loop(
            r#"0.0: {"type": "MOVE_TO", "payload": {"robot_id": 0, "x_m": -0.5, "y_m": 0.2, "theta_rad": -1.0}};"#,
            FrameMode::Absolute,
        );
        let mut ds = DataStore::default();

        run_for(&mut em, &mut ds, 3.0);

        check_reached(&ds, &Pose::new(-0.5, 0.2, -1.0));
    }

    #[test]
    fn test_default_manoeuvre() {
        let mut em = sim_loop(DEFAULT_MANOEUVRE_SCRIPT, FrameMode::Relative);
        let mut ds = DataStore::default();

        run_for(&mut em, &mut ds, 3.0);

        check_reached(&ds, &Pose::new(1.0, 0.0, FRAC_PI_2));
    }

    #[test]
    fn test_stop_all_disables() {
        let mut em = sim_loop(
            r#"
            0.0: {"type": "MOVE_BY", "payload": {"robot_id": 0, "x_m": 1.0, "y_m": 0.0}};
            0.3: {"type": "STOP_ALL"};
            "#,
            FrameMode::Relative,
        );
        let mut ds = DataStore::default();

        run_for(&mut em, &mut ds, 0.5);
        let stopped = ds.vision.last(0).unwrap().pose;
        assert!(stopped.position_m[0] > 0.05);

        run_for(&mut em, &mut ds, 0.5);

        // Disabled robots don't move
        assert_eq!(ds.vision.last(0).unwrap().pose, stopped);
        assert!(!ds.controls[0].1.active);
    }

    #[test]
    fn test_movement_deferred_until_pose_known() {
        let params = Params {
            step_time: 1e-3,
            ..Params::default()
        };
        let mut task = ControlTask::new(1, &params, PERIOD_S, 0.1).unwrap();
        let mut ds = DataStore::default();

        ds.cycle_start(0.0);
        ds.tcs.push(Tc::MoveBy(PoseTarget {
            robot_id: 0,
            x_m: 1.0,
            y_m: 0.0,
            theta_rad: 0.0,
        }));
        assert!(task.run(&mut ds));

        // No pose, no control and the movement waits
        assert!(ds.controls.is_empty());
        assert_eq!(task.deferred.len(), 1);

        ds.cycle_start(0.01);
        ds.vision.update(0, Pose::new(0.5, 0.0, 0.0), 0.01);
        assert!(task.run(&mut ds));

        assert!(task.deferred.is_empty());
        assert_eq!(ds.controls.len(), 1);
        assert!(ds.controls[0].1.velocity_translation[0] >= 0.0);

        // Once the pose is stale the robot is dropped again
        ds.cycle_start(1.0);
        assert!(task.run(&mut ds));
        assert!(ds.controls.is_empty());
    }

    fn move_by(robot_id: u8, x_m: f64) -> Tc {
        Tc::MoveBy(PoseTarget {
            robot_id,
            x_m,
            y_m: 0.0,
            theta_rad: 0.0,
        })
    }

    #[test]
    fn test_stop_all_cancels_deferred_movements() {
        let params = Params {
            step_time: 1e-3,
            ..Params::default()
        };
        let mut task = ControlTask::new(1, &params, PERIOD_S, 0.1).unwrap();
        let mut ds = DataStore::default();

        // Movement waiting for the pose
        ds.cycle_start(0.0);
        ds.tcs.push(move_by(0, 1.0));
        assert!(task.run(&mut ds));
        assert_eq!(task.deferred.len(), 1);

        // Stopped while still unseen
        ds.cycle_start(0.01);
        ds.tcs.push(Tc::StopAll);
        assert!(task.run(&mut ds));
        assert!(task.deferred.is_empty());

        // Once seen the robot stays disabled
        ds.cycle_start(0.02);
        ds.vision.update(0, Pose::default(), 0.02);
        assert!(task.run(&mut ds));

        assert_eq!(ds.controls.len(), 1);
        assert!(!ds.controls[0].1.active);
        assert!(matches!(
            task.controllers[0].mode(),
            TrajCtrlMode::Idle(IdleTarget::Disabled)
        ));
    }

    #[test]
    fn test_stop_cancels_deferred_movements_of_its_robot() {
        let params = Params {
            step_time: 1e-3,
            ..Params::default()
        };
        let mut task = ControlTask::new(2, &params, PERIOD_S, 0.1).unwrap();
        let mut ds = DataStore::default();

        ds.cycle_start(0.0);
        ds.tcs.push(move_by(0, 1.0));
        ds.tcs.push(move_by(1, 1.0));
        assert!(task.run(&mut ds));
        assert_eq!(task.deferred.len(), 2);

        ds.cycle_start(0.01);
        ds.tcs.push(Tc::Stop(RobotId { robot_id: 1 }));
        assert!(task.run(&mut ds));
        assert_eq!(task.deferred, vec![move_by(0, 1.0)]);

        // Robot 0 still moves once seen, robot 1 doesn't
        ds.cycle_start(0.02);
        ds.vision.update(0, Pose::default(), 0.02);
        ds.vision.update(1, Pose::new(0.0, 1.0, 0.0), 0.02);
        assert!(task.run(&mut ds));

        assert!(task.deferred.is_empty());
        assert!(matches!(task.controllers[0].mode(), TrajCtrlMode::Tracking(_)));
        assert!(matches!(
            task.controllers[1].mode(),
            TrajCtrlMode::Idle(IdleTarget::Disabled)
        ));
    }

    #[test]
    fn test_script_task_ends() {
        let mut task = ScriptTask::new(
            ScriptInterpreter::from_script_str(r#"0.5: {"type": "STOP_ALL"};"#).unwrap(),
        );
        let mut ds = DataStore::default();

        // Script time starts on the first run
        ds.cycle_start(10.0);
        assert!(task.run(&mut ds));
        assert!(ds.tcs.is_empty());

        ds.cycle_start(10.5);
        assert!(task.run(&mut ds));
        assert_eq!(ds.tcs, vec![Tc::StopAll]);

        ds.cycle_start(11.0);
        assert!(!task.run(&mut ds));
    }

    #[test]
    fn test_time_updater() {
        let mut task = TimeUpdater::new(Clock::Stepped { step_s: 0.5 });
        let mut ds = DataStore::default();
        ds.controls.push((0, crate::traj_ctrl::Control::disabled()));

        task.run(&mut ds);
        assert_eq!(ds.time_s, 0.0);
        assert!(ds.controls.is_empty());

        task.run(&mut ds);
        assert_eq!(ds.time_s, 0.5);
        assert_eq!(ds.num_cycles, 2);
    }
}
