//! # Robot Velocity Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of robot slots a commander is expected to address.
pub const MAX_NUM_ROBOTS: u8 = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity command for a single robot.
///
/// Speeds are expressed in the robot's local frame: X forward, Y to the left.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RobotCmd {
    /// The robot the command is addressed to
    pub robot_id: u8,

    /// If false the robot must ignore the speeds and stop its motors
    pub enabled: bool,

    /// Speed along the robot's forward axis.
    ///
    /// Units: meters/second
    pub x_speed_ms: f64,

    /// Speed towards the robot's left.
    ///
    /// Units: meters/second
    pub y_speed_ms: f64,

    /// Rotation rate about Z.
    ///
    /// Units: radians/second
    pub theta_speed_rads: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl RobotCmd {
    /// Create a new enabled command.
    pub fn new(robot_id: u8, x_speed_ms: f64, y_speed_ms: f64, theta_speed_rads: f64) -> Self {
        Self {
            robot_id,
            enabled: true,
            x_speed_ms,
            y_speed_ms,
            theta_speed_rads,
        }
    }

    /// A disabled command with all speeds at zero.
    pub fn disabled(robot_id: u8) -> Self {
        Self {
            robot_id,
            enabled: false,
            x_speed_ms: 0.0,
            y_speed_ms: 0.0,
            theta_speed_rads: 0.0,
        }
    }
}
