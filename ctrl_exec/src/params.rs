//! # Control Executable Parameters
//!
//! This module provide parameters for the control executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CtrlExecParams {

    /// Minimum period of the control loop
    pub control_period_s: f64,

    /// Poses older than this are considered stale and the robot isn't
    /// controlled
    pub max_pose_age_s: f64,

    /// Number of robots with a trajectory controller, robot ids go from 0 to
    /// `num_robots - 1`
    pub num_robots: u8,

    /// Initial poses of the simulated robots
    pub sim_robots: Vec<Pose>,

    /// Longest integration step of the simulator
    pub sim_max_step_s: f64,
}
