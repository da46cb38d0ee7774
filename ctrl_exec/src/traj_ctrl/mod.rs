//! # Trajectory control module
//!
//! Trajectory control is responsible for moving a robot from its current pose
//! to a target pose.
//!
//! When a new target is given two renormalized curves are built: one for the
//! translation, along the path to the target position, and one for the
//! rotation, whose X coordinate is the orientation. Both are driven by
//! velocity consigns limited by the velocity and acceleration caps of the
//! parameters, and both are expressed relative to a reference pose: the field
//! origin in `Absolute` mode, the robot's pose at the start of the movement in
//! `Relative` mode. On each tick the curves are sampled at the time elapsed
//! since the start of the movement, giving the pose the robot should be at,
//! and a set of PID controllers corrects the error between this pose and the
//! measured one. The consign's own speed can be added on top of the
//! correction (feed-forward).
//!
//! The resulting velocities are saturated and rotated into the robot's frame
//! before being sent.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::{FrameMode, Params};
pub use state::*;
