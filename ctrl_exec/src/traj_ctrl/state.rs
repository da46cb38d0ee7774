//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::*;
use crate::{
    consign::{Consign, ConsignError},
    curve::{Curve2d, CurveError, CurveSample, PathDescriptor, RenormalizedCurve},
    loc::Pose,
};
use comms_if::eqpt::robot::RobotCmd;
use util::{
    maths::{get_ang_dist, saturate, wrap_pi},
    module::State,
    session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory controller of a single robot.
pub struct TrajCtrl {
    robot_id: u8,

    params: Params,

    /// Period between two calls to `proc`, used by the feed-forward
    control_period_s: f64,

    /// Executing mode
    mode: TrajCtrlMode,

    output: Option<Control>,
    report: StatusReport,

    /// Controller objects used to correct the tracking error
    controllers: TrajControllers,
}

/// The curves of a movement and the time it started at.
#[derive(Debug, Clone)]
pub struct Movement {
    pub start_time_s: f64,

    /// The field frame pose both curves are expressed relative to
    pub reference: Pose,

    /// The pose reached at the end of the movement, in the field frame
    pub target: Pose,

    pub translation: RenormalizedCurve,

    /// Rotation curve, on the X axis, whose X coordinate is the orientation
    pub rotation: RenormalizedCurve,
}

/// Initialisation data of the controller.
#[derive(Debug, Clone)]
pub struct InitData {
    pub params: Params,
    pub control_period_s: f64,
}

/// Input data of one control tick.
#[derive(Debug, Copy, Clone, Default)]
pub struct InputData {
    pub time_s: f64,

    /// The robot's pose, `None` if it is unknown or stale
    pub pose: Option<Pose>,
}

/// The control output of a tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Control {
    /// Translation velocity, in the robot's frame
    ///
    /// Units: meters/second
    pub velocity_translation: Vector2<f64>,

    /// Units: radians/second
    pub velocity_rotation: f64,

    pub kick: bool,

    /// If false the robot shall be disabled
    pub active: bool,

    /// If true nothing shall be sent to the robot
    pub ignore: bool,
}

/// The status report containing the tracking errors.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Distance between the robot and where it should be
    pub position_error_m: f64,

    /// Signed angle from the robot's orientation to the one it should have
    pub orientation_error_rad: f64,

    /// Time since the start of the current movement
    pub elapsed_s: f64,

    /// Set on the tick the current movement finished
    pub movement_finished: bool,
}

#[derive(Debug, Serialize)]
struct CurveDump {
    robot_id: u8,
    reference: Pose,
    target: Pose,
    translation: Vec<CurveSample>,
    rotation: Vec<CurveSample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("The control period must be greater than 0, found {0}")]
    InvalidControlPeriod(f64),

    #[error("Could not build the velocity consign: {0}")]
    ConsignError(#[from] ConsignError),

    #[error("Could not build the curve: {0}")]
    CurveError(#[from] CurveError),
}

/// The possible modes of execution of TrajCtrl.
#[derive(Debug, Clone)]
pub enum TrajCtrlMode {
    /// No movement in progress
    Idle(IdleTarget),

    /// Following the curves of a movement
    Tracking(Movement),
}

/// What the robot does when it isn't moving.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IdleTarget {
    /// The robot has never been given a target, it's left alone
    Unassigned,

    /// The robot is disabled
    Disabled,

    /// The robot is kept at the given pose
    Hold(Pose),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Movement {
    /// Time needed to complete both the translation and the rotation.
    pub fn max_time(&self) -> f64 {
        self.translation.max_time().max(self.rotation.max_time())
    }

    /// The consign pose `elapsed_s` after the start, relative to the
    /// reference.
    pub fn local_pose(&self, elapsed_s: f64) -> Pose {
        Pose {
            position_m: self.translation.eval(elapsed_s),
            orientation_rad: self.rotation.eval(elapsed_s)[0],
        }
    }

    /// The consign pose `elapsed_s` after the start, in the field frame.
    pub fn pose(&self, elapsed_s: f64) -> Pose {
        self.reference.to_field_pose(&self.local_pose(elapsed_s))
    }
}

impl Control {
    /// A control leaving the robot alone.
    pub fn ignored() -> Self {
        Self {
            ignore: true,
            ..Self::disabled()
        }
    }

    /// A control disabling the robot.
    pub fn disabled() -> Self {
        Self {
            velocity_translation: Vector2::zeros(),
            velocity_rotation: 0.0,
            kick: false,
            active: false,
            ignore: false,
        }
    }

    /// Convert into the command sent to the robot, `None` if the control is
    /// ignored.
    pub fn to_robot_cmd(&self, robot_id: u8) -> Option<RobotCmd> {
        if self.ignore {
            None
        } else if !self.active {
            Some(RobotCmd::disabled(robot_id))
        } else {
            Some(RobotCmd::new(
                robot_id,
                self.velocity_translation[0],
                self.velocity_translation[1],
                self.velocity_rotation,
            ))
        }
    }
}

impl State for TrajCtrl {
    type InitData = InitData;
    type InitError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = Option<Control>;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Intiailise the TrajCtrl module.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        if !(init_data.control_period_s > 0.0) {
            return Err(TrajCtrlError::InvalidControlPeriod(init_data.control_period_s));
        }

        self.controllers = TrajControllers::new(&init_data.params);
        self.params = init_data.params;
        self.control_period_s = init_data.control_period_s;
        self.mode = TrajCtrlMode::Idle(IdleTarget::Unassigned);

        Ok(())
    }

    /// Process trajectory control.
    ///
    /// If the pose of the robot isn't known no control is output at all.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Setup cycle data
        self.output = None;
        self.report = StatusReport::default();

        let pose = match input_data.pose {
            Some(p) => p,
            None => {
                trace!("No fresh pose for robot {}, no control issued", self.robot_id);
                return Ok((None, self.report));
            }
        };

        // Mode execution. Each of the mode functions returns the mode to
        // switch to.
        let mode = std::mem::replace(&mut self.mode, TrajCtrlMode::Idle(IdleTarget::Unassigned));
        self.mode = match mode {
            TrajCtrlMode::Idle(target) => self.mode_idle(target, &pose, input_data.time_s),
            TrajCtrlMode::Tracking(movement) => {
                self.mode_tracking(movement, &pose, input_data.time_s)
            }
        };

        Ok((self.output, self.report))
    }
}

impl TrajCtrl {
    /// Create a new controller for the given robot.
    ///
    /// The controller must be initialised before use.
    pub fn new(robot_id: u8) -> Self {
        let params = Params::default();

        Self {
            robot_id,
            controllers: TrajControllers::new(&params),
            params,
            control_period_s: 0.0,
            mode: TrajCtrlMode::Idle(IdleTarget::Unassigned),
            output: None,
            report: StatusReport::default(),
        }
    }

    pub fn robot_id(&self) -> u8 {
        self.robot_id
    }

    pub fn mode(&self) -> &TrajCtrlMode {
        &self.mode
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The pose the curves of a movement starting at `start` are expressed
    /// relative to.
    pub fn reference(&self, start: &Pose) -> Pose {
        match self.params.frame_mode {
            FrameMode::Absolute => Pose::default(),
            FrameMode::Relative => *start,
        }
    }

    /// Start a movement from `start` to `target`, in a straight line while
    /// turning the shortest way round.
    pub fn go_to(&mut self, start: &Pose, target: &Pose, time_s: f64) -> Result<(), TrajCtrlError> {
        let reference = self.reference(start);
        let start_local = reference.to_local_pose(start);
        let target_local = reference.to_local_pose(target);
        let turn_rad = get_ang_dist(start.orientation_rad, target.orientation_rad);

        self.set_movement(
            reference,
            PathDescriptor::line(start_local.position_m, target_local.position_m),
            PathDescriptor::rotation(
                start_local.orientation_rad,
                start_local.orientation_rad + turn_rad,
            ),
            time_s,
        )
    }

    /// Start a movement along the given translation and rotation paths,
    /// `time_s` being the start time of the movement.
    ///
    /// Both paths are relative to `reference`, a field frame pose. The
    /// rotation path gives the orientation as its X coordinate. Any movement
    /// in progress is abandoned.
    pub fn set_movement(
        &mut self,
        reference: Pose,
        translation: PathDescriptor,
        rotation: PathDescriptor,
        time_s: f64,
    ) -> Result<(), TrajCtrlError> {
        let mut target = reference.to_field_pose(&Pose {
            position_m: translation.end(),
            orientation_rad: rotation.end()[0],
        });
        target.orientation_rad = wrap_pi(target.orientation_rad);

        let translation = self.build_curve(
            translation,
            self.params.max_velocity_translation_ms,
            self.params.max_acceleration_translation_mss,
        )?;
        let rotation = self.build_curve(
            rotation,
            self.params.max_velocity_rotation_rads,
            self.params.max_acceleration_rotation_radss,
        )?;

        let movement = Movement {
            start_time_s: time_s,
            reference,
            target,
            translation,
            rotation,
        };

        debug!(
            "Robot {} moving to ({:.3}, {:.3}, {:.3}) in {:.3} s",
            self.robot_id,
            target.position_m[0],
            target.position_m[1],
            target.orientation_rad,
            movement.max_time()
        );

        if self.params.dump_curves {
            self.dump(&movement);
        }

        self.controllers.reset();
        self.mode = TrajCtrlMode::Tracking(movement);

        Ok(())
    }

    /// Abandon any movement and keep the robot at `pose`.
    pub fn hold(&mut self, pose: Pose) {
        debug!("Robot {} holding its pose", self.robot_id);

        self.controllers.reset();
        self.mode = TrajCtrlMode::Idle(IdleTarget::Hold(pose));
    }

    /// Abandon any movement and disable the robot.
    pub fn disable(&mut self) {
        debug!("Robot {} disabled", self.robot_id);

        self.mode = TrajCtrlMode::Idle(IdleTarget::Disabled);
    }

    fn build_curve(
        &self,
        path: PathDescriptor,
        max_velocity: f64,
        max_acceleration: f64,
    ) -> Result<RenormalizedCurve, TrajCtrlError> {
        let curve = Curve2d::new(path, self.params.step_time)?;
        let consign = Consign::new(
            self.params.consign_kind,
            curve.size(),
            max_velocity,
            max_acceleration,
        )?;

        Ok(RenormalizedCurve::from_curve(curve, consign))
    }

    fn dump(&self, movement: &Movement) {
        session::save_with_timestamp(
            format!("traj_ctrl/robot_{}.json", self.robot_id),
            CurveDump {
                robot_id: self.robot_id,
                reference: movement.reference,
                target: movement.target,
                translation: movement.translation.sample(self.params.dump_period_s),
                rotation: movement.rotation.sample(self.params.dump_period_s),
            },
        );
    }

    /// Mode idle.
    ///
    /// The robot is either left alone, disabled, or kept at its hold pose by
    /// the controllers.
    fn mode_idle(&mut self, target: IdleTarget, pose: &Pose, time_s: f64) -> TrajCtrlMode {
        self.output = Some(match target {
            IdleTarget::Unassigned => Control::ignored(),
            IdleTarget::Disabled => Control::disabled(),
            IdleTarget::Hold(hold_pose) => {
                let (vel, rot) = self.correct(&Pose::default(), pose, &hold_pose, time_s);
                self.make_control(pose, vel, rot)
            }
        });

        TrajCtrlMode::Idle(target)
    }

    /// Mode tracking.
    ///
    /// The curves are sampled at the time elapsed since the start of the
    /// movement, and the controllers correct the error between the robot and
    /// this consign pose. Once both curves are finished the robot holds the
    /// target.
    fn mode_tracking(&mut self, movement: Movement, pose: &Pose, time_s: f64) -> TrajCtrlMode {
        let elapsed_s = time_s - movement.start_time_s;
        self.report.elapsed_s = elapsed_s;

        if elapsed_s >= movement.max_time() {
            debug!("Robot {} reached its target", self.robot_id);

            self.report.movement_finished = true;
            return self.mode_idle(IdleTarget::Hold(movement.target), pose, time_s);
        }

        let consign = movement.local_pose(elapsed_s);

        let (mut vel, mut rot) = self.correct(&movement.reference, pose, &consign, time_s);

        if self.params.feed_forward {
            let dt = self.control_period_s;
            let next = movement.local_pose(elapsed_s + dt);
            vel += movement
                .reference
                .to_field_frame(&((next.position_m - consign.position_m) / dt));
            rot += (next.orientation_rad - consign.orientation_rad) / dt;
        }

        self.output = Some(self.make_control(pose, vel, rot));

        TrajCtrlMode::Tracking(movement)
    }

    /// Get the field frame corrections from the controllers for the error
    /// between the robot's pose and the consign pose.
    ///
    /// The consign is relative to `reference`, and the error is measured in
    /// the reference's frame.
    fn correct(
        &mut self,
        reference: &Pose,
        pose: &Pose,
        consign: &Pose,
        time_s: f64,
    ) -> (Vector2<f64>, f64) {
        let measured = reference.to_local_pose(pose);
        let position_error_m = consign.position_m - measured.position_m;
        let orientation_error_rad = get_ang_dist(measured.orientation_rad, consign.orientation_rad);

        self.report.position_error_m = position_error_m.norm();
        self.report.orientation_error_rad = orientation_error_rad;

        (
            reference.to_field_frame(&self.controllers.get_translation(&position_error_m, time_s)),
            self.controllers.get_rotation(orientation_error_rad, time_s),
        )
    }

    /// Saturate the field frame velocities and express them in the robot's
    /// frame.
    fn make_control(&self, pose: &Pose, mut vel: Vector2<f64>, rot: f64) -> Control {
        let max_vel = self.params.max_velocity_translation_ms;
        let norm = vel.norm();
        if norm > max_vel {
            vel *= max_vel / norm;
        }

        Control {
            velocity_translation: pose.to_robot_frame(&vel),
            velocity_rotation: saturate(rot, self.params.max_velocity_rotation_rads),
            kick: false,
            active: true,
            ignore: false,
        }
    }
}
