//! Path descriptors
//!
//! Paths own all the data they need to be evaluated, so a curve built from
//! them can outlive whatever built it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A parametric 2D path.
pub trait Path2d {
    /// Get the point of the path at the parameter `u`, where `u` goes from 0
    /// at the start of the path to 1 at its end.
    fn eval(&self, u: f64) -> Vector2<f64>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The paths available to the trajectory controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathDescriptor {
    /// A straight line from `start` to `end`.
    Line {
        start: Vector2<f64>,
        end: Vector2<f64>,
    },

    /// An arc of circle.
    ///
    /// The arc starts at angle `start_angle_rad` (measured from the +ve X
    /// axis) and turns by `sweep_rad`, anticlockwise if positive.
    Arc {
        centre: Vector2<f64>,
        radius_m: f64,
        start_angle_rad: f64,
        sweep_rad: f64,
    },

    /// A cubic Bezier curve.
    Bezier { points: [Vector2<f64>; 4] },

    /// A sequence of straight segments, each taking an equal share of `u`.
    Polyline { points: Vec<Vector2<f64>> },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathDescriptor {
    /// A straight line between two points.
    pub fn line(start: Vector2<f64>, end: Vector2<f64>) -> Self {
        PathDescriptor::Line { start, end }
    }

    /// A rotation from one orientation to another, as a 1D path on the X
    /// axis.
    ///
    /// The arc length of this path is the angle turned through, so the same
    /// consign machinery used for translations drives rotations.
    pub fn rotation(from_rad: f64, to_rad: f64) -> Self {
        PathDescriptor::Line {
            start: Vector2::new(from_rad, 0.0),
            end: Vector2::new(to_rad, 0.0),
        }
    }

    /// The first point of the path.
    pub fn start(&self) -> Vector2<f64> {
        self.eval(0.0)
    }

    /// The last point of the path.
    pub fn end(&self) -> Vector2<f64> {
        self.eval(1.0)
    }
}

impl Path2d for PathDescriptor {
    fn eval(&self, u: f64) -> Vector2<f64> {
        match self {
            PathDescriptor::Line { start, end } => start + (end - start) * u,
            PathDescriptor::Arc {
                centre,
                radius_m,
                start_angle_rad,
                sweep_rad,
            } => {
                let angle = start_angle_rad + sweep_rad * u;
                centre + Vector2::new(angle.cos(), angle.sin()) * *radius_m
            }
            PathDescriptor::Bezier { points } => {
                let w = 1.0 - u;
                points[0] * (w * w * w)
                    + points[1] * (3.0 * w * w * u)
                    + points[2] * (3.0 * w * u * u)
                    + points[3] * (u * u * u)
            }
            PathDescriptor::Polyline { points } => match points.len() {
                0 => Vector2::zeros(),
                1 => points[0],
                n => {
                    let num_segs = n - 1;
                    let s = u.max(0.0).min(1.0) * num_segs as f64;
                    let i = (s.floor() as usize).min(num_segs - 1);
                    let frac = s - i as f64;

                    points[i] + (points[i + 1] - points[i]) * frac
                }
            },
        }
    }
}
