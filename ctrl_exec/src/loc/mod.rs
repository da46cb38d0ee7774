//! # Localisation module
//!
//! Robot poses come from the vision system (or the simulator standing in for
//! it). Each pose is timestamped on arrival so that the controllers can tell a
//! robot whose pose is stale, for instance because it has left the field of
//! view, from one which is being tracked.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and orientation in the field frame) of a robot.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the field frame
    pub position_m: Vector2<f64>,

    /// The angle between the field's +ve X axis and the robot's forward axis,
    /// anticlockwise positive.
    pub orientation_rad: f64,
}

/// A pose and the time it was received.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimedPose {
    pub pose: Pose,
    pub time_s: f64,
}

/// The latest known pose of each robot.
#[derive(Debug, Clone, Default)]
pub struct VisionTable {
    robots: HashMap<u8, TimedPose>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, orientation_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            orientation_rad,
        }
    }

    /// Express a field frame vector in the robot's frame.
    pub fn to_robot_frame(&self, vec_field: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(-self.orientation_rad) * vec_field
    }

    /// Express a robot frame vector in the field frame.
    pub fn to_field_frame(&self, vec_robot: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(self.orientation_rad) * vec_robot
    }

    /// Express a field frame pose relative to this one.
    ///
    /// The orientation is not wrapped.
    pub fn to_local_pose(&self, pose_field: &Pose) -> Pose {
        Pose {
            position_m: self.to_robot_frame(&(pose_field.position_m - self.position_m)),
            orientation_rad: pose_field.orientation_rad - self.orientation_rad,
        }
    }

    /// Inverse of `to_local_pose`.
    pub fn to_field_pose(&self, pose_local: &Pose) -> Pose {
        Pose {
            position_m: self.position_m + self.to_field_frame(&pose_local.position_m),
            orientation_rad: pose_local.orientation_rad + self.orientation_rad,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl VisionTable {
    /// Record a new pose for the robot.
    pub fn update(&mut self, robot_id: u8, pose: Pose, time_s: f64) {
        self.robots.insert(robot_id, TimedPose { pose, time_s });
    }

    /// Forget the robot, as if it had never been seen.
    pub fn remove(&mut self, robot_id: u8) {
        self.robots.remove(&robot_id);
    }

    /// The last pose received for the robot, however old it is.
    pub fn last(&self, robot_id: u8) -> Option<&TimedPose> {
        self.robots.get(&robot_id)
    }

    /// Returns true if the robot's pose is known and no older than
    /// `max_age_s`.
    pub fn is_ok(&self, robot_id: u8, now_s: f64, max_age_s: f64) -> bool {
        match self.robots.get(&robot_id) {
            Some(p) => now_s - p.time_s <= max_age_s,
            None => false,
        }
    }

    /// The pose of the robot if it is fresh, `None` otherwise.
    pub fn get(&self, robot_id: u8, now_s: f64, max_age_s: f64) -> Option<Pose> {
        if self.is_ok(robot_id, now_s, max_age_s) {
            self.robots.get(&robot_id).map(|p| p.pose)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_frames() {
        let pose = Pose::new(1.0, 2.0, FRAC_PI_2);

        // Moving along the field's +ve Y is moving forward for this robot
        let v = pose.to_robot_frame(&Vector2::new(0.0, 1.0));
        assert_abs_diff_eq!(v, Vector2::new(1.0, 0.0), epsilon = 1e-12);

        let w = pose.to_field_frame(&v);
        assert_abs_diff_eq!(w, Vector2::new(0.0, 1.0), epsilon = 1e-12);

        // One metre ahead of the robot, turned left
        let ahead = pose.to_local_pose(&Pose::new(1.0, 3.0, 2.0 * FRAC_PI_2));
        assert_abs_diff_eq!(ahead.position_m, Vector2::new(1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(ahead.orientation_rad, FRAC_PI_2, epsilon = 1e-12);

        let back = pose.to_field_pose(&ahead);
        assert_abs_diff_eq!(back.position_m, Vector2::new(1.0, 3.0), epsilon = 1e-12);
        assert_abs_diff_eq!(back.orientation_rad, 2.0 * FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_staleness() {
        let mut table = VisionTable::default();

        assert!(!table.is_ok(0, 0.0, 0.1));
        assert_eq!(table.get(0, 0.0, 0.1), None);

        table.update(0, Pose::new(1.0, 0.0, 0.0), 1.0);

        assert!(table.is_ok(0, 1.05, 0.1));
        assert_eq!(table.get(0, 1.05, 0.1), Some(Pose::new(1.0, 0.0, 0.0)));

        assert!(!table.is_ok(0, 1.5, 0.1));
        assert_eq!(table.get(0, 1.5, 0.1), None);
        assert_eq!(table.last(0).map(|p| p.time_s), Some(1.0));

        table.remove(0);
        assert!(table.last(0).is_none());
    }
}
