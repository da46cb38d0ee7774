//! # Control library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the control executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Commanders - hand the robot commands over to whatever drives the robots
pub mod commander;

/// Velocity consigns - trapezoidal speed profiles over a distance
pub mod consign;

/// Curves - parametric paths, arc length and time reparametrisation
pub mod curve;

/// Data shared by the tasks of the control loop
pub mod data_store;

/// Execution manager - runs the tasks of the control loop
pub mod exec_mgr;

/// Localisation module - robot poses as seen by the vision system
pub mod loc;

/// Parameters of the executable
pub mod params;

/// Kinematic simulator of the field
pub mod sim;

/// Tasks composing the control loop
pub mod tasks;

/// Trajectory control module - keeps the robots on their curves
pub mod traj_ctrl;
