//! # Equipment Interface
//!
//! This module defines the interface structures which are handed to the actuator commanders.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod robot;
