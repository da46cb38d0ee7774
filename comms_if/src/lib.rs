//! # Communications interface crate.
//!
//! Provides the records exchanged between the trajectory control core and its
//! collaborators: target telecommands coming in from the strategy side and
//! velocity commands going out to the robots.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Command definitions for equipment (the robots' actuators)
pub mod eqpt;
