//! # Curve module
//!
//! Curves describe the geometry of a movement independently of its timing.
//!
//! - A [`Path2d`] maps a parameter `u` in `[0, 1]` to a point. The paths used
//!   by the trajectory controller are value-owned [`PathDescriptor`]s.
//! - A [`Curve2d`] wraps a path and computes its arc length, and the inverse
//!   of the arc length, by summing the lengths of the chords of a polyline
//!   sampled every `step_time` in `u`.
//! - A [`RenormalizedCurve`] combines a curve with a velocity consign so the
//!   curve can be queried by time: given the time elapsed since the start of
//!   the movement it returns the point the robot should be at.
//!
//! All the integrations are fixed-step approximations. Their resolution is
//! bounded by `step_time`, and [`RenormalizedCurve::error_position_consign`]
//! gives the worst-case position error so that the step can be chosen against
//! a precision budget.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod curve_2d;
mod path_desc;
mod renormalized;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use curve_2d::*;
pub use path_desc::*;
pub use renormalized::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with building curves.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CurveError {
    #[error("The integration step must be greater than 0, found {0}")]
    NonPositiveStep(f64),
}
