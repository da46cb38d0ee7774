//! Arc length parametrisation of 2D paths

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::{CurveError, Path2d, PathDescriptor};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A path together with its arc length.
///
/// The length is cached when the curve is built and recomputed whenever the
/// integration step is changed.
#[derive(Debug, Clone)]
pub struct Curve2d<P = PathDescriptor> {
    path: P,

    /// Integration step in the path parameter
    step_time: f64,

    /// Cached `arc_length(1.0)`
    curve_length: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<P: Path2d> Curve2d<P> {
    /// Build a new curve, computing its length.
    pub fn new(path: P, step_time: f64) -> Result<Self, CurveError> {
        check_step(step_time)?;

        let mut curve = Self {
            path,
            step_time,
            curve_length: 0.0,
        };
        curve.init();

        Ok(curve)
    }

    fn init(&mut self) {
        self.curve_length = self.arc_length(1.0);
    }

    /// Get the point of the path at the parameter `u`.
    pub fn eval(&self, u: f64) -> Vector2<f64> {
        self.path.eval(u)
    }

    /// The underlying path.
    pub fn path(&self) -> &P {
        &self.path
    }

    /// Total arc length of the curve.
    pub fn size(&self) -> f64 {
        self.curve_length
    }

    pub fn step_time(&self) -> f64 {
        self.step_time
    }

    /// Change the integration step, recomputing the length of the curve.
    pub fn set_step_time(&mut self, step_time: f64) -> Result<(), CurveError> {
        check_step(step_time)?;

        self.step_time = step_time;
        self.init();

        Ok(())
    }

    /// Length of the curve between the parameters 0 and `u`.
    ///
    /// The path is sampled every `step_time` up to `u`, plus a final partial
    /// step ending exactly on `u`, and the lengths of the chords summed.
    pub fn arc_length(&self, u: f64) -> f64 {
        if u <= 0.0 {
            return 0.0;
        }
        if u > 1.0 {
            return self.curve_length;
        }

        let mut res = 0.0;
        let mut old = self.path.eval(0.0);

        // Parameters are computed from the step index rather than accumulated
        // so that rounding errors don't build up over long curves
        let mut i = 1usize;
        loop {
            let v = i as f64 * self.step_time;
            if v > u {
                break;
            }

            let current = self.path.eval(v);
            res += (current - old).norm();
            old = current;

            i += 1;
        }

        res + (self.path.eval(u) - old).norm()
    }

    /// Parameter at which the arc length reaches `l`.
    ///
    /// This scans the same polyline as [`Curve2d::arc_length`] from the start
    /// of the curve until the accumulated length reaches `l`, then locates `l`
    /// within the last chord. The result is therefore only as accurate as the
    /// polyline, i.e. it is bounded by `step_time`.
    pub fn inverse_of_arc_length(&self, l: f64) -> f64 {
        if l <= 0.0 {
            return 0.0;
        }
        if l >= self.curve_length {
            return 1.0;
        }

        let mut res = 0.0;
        let mut old = self.path.eval(0.0);
        let mut u_old = 0.0;

        let mut i = 1usize;
        loop {
            let u = (i as f64 * self.step_time).min(1.0);
            let current = self.path.eval(u);
            let chord = (current - old).norm();

            if res + chord >= l {
                let frac = if chord > 0.0 { (l - res) / chord } else { 1.0 };
                return u_old + (u - u_old) * frac;
            }

            if u >= 1.0 {
                return 1.0;
            }

            res += chord;
            old = current;
            u_old = u;
            i += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub(super) fn check_step(step_time: f64) -> Result<(), CurveError> {
    if step_time > 0.0 && step_time.is_finite() {
        Ok(())
    } else {
        Err(CurveError::NonPositiveStep(step_time))
    }
}
