//! Curves queried by time

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use super::{Curve2d, CurveError, Path2d, PathDescriptor};
use crate::consign::{Consign, VelocityConsign};
use util::raise_error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the length reached by [`RenormalizedCurve::time`].
///
/// The tolerance is independent of the integration step, so `time` can
/// overshoot the requested length by up to one step of the consign, i.e. by at
/// most `error_position_consign()`.
pub const TIME_LENGTH_TOLERANCE: f64 = 0.001;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A curve travelled following a velocity consign.
///
/// The consign gives the speed along the curve as a function of the time since
/// the start of the movement, so integrating it gives the arc length travelled
/// at any time, which is mapped back onto the curve through the inverse of the
/// arc length.
#[derive(Debug, Clone)]
pub struct RenormalizedCurve<P = PathDescriptor, C = Consign> {
    curve: Curve2d<P>,
    consign: C,

    /// Cached `time(curve.size())`
    time_max: f64,
}

/// A point of a renormalized curve, as archived for offline analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveSample {
    pub t_s: f64,
    pub point: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<P: Path2d, C: VelocityConsign> RenormalizedCurve<P, C> {
    /// Build a new curve from a path and a consign.
    ///
    /// The consign's distance should be the length of the path, otherwise the
    /// curve will stop short of its end, or reach it before the consign does.
    ///
    /// # Panics
    /// - If the consign returns a negative speed while computing the duration
    ///   of the curve.
    pub fn new(path: P, consign: C, step_time: f64) -> Result<Self, CurveError> {
        Ok(Self::from_curve(Curve2d::new(path, step_time)?, consign))
    }

    /// Build a new curve from an existing one, for when the length of the
    /// curve is needed to build the consign.
    ///
    /// # Panics
    /// - If the consign returns a negative speed while computing the duration
    ///   of the curve.
    pub fn from_curve(curve: Curve2d<P>, consign: C) -> Self {
        let mut curve = Self {
            curve,
            consign,
            time_max: 0.0,
        };
        curve.init();

        curve
    }

    fn init(&mut self) {
        self.time_max = self.time(self.curve.size());
    }

    /// Time needed to travel the whole curve.
    pub fn max_time(&self) -> f64 {
        self.time_max
    }

    /// Evaluate the underlying path at the parameter `u`.
    pub fn original_curve(&self, u: f64) -> Vector2<f64> {
        self.curve.eval(u)
    }

    pub fn curve(&self) -> &Curve2d<P> {
        &self.curve
    }

    pub fn consign(&self) -> &C {
        &self.consign
    }

    pub fn step_time(&self) -> f64 {
        self.curve.step_time()
    }

    /// Change the integration step, recomputing the length and duration of
    /// the curve.
    pub fn set_step_time(&mut self, step_time: f64) -> Result<(), CurveError> {
        self.curve.set_step_time(step_time)?;
        self.init();

        Ok(())
    }

    /// Speed along the curve demanded at time `t`.
    pub fn velocity_consign(&self, t: f64) -> f64 {
        self.consign.velocity(t)
    }

    /// Arc length travelled at time `t`.
    pub fn position_consign(&self, t: f64) -> f64 {
        let step = self.step_time();

        // Nothing is travelled once the consign is finished
        let t = t.min(self.consign.time_of_displacement() + step);

        let mut res = 0.0;
        let mut i = 0usize;
        loop {
            let v = i as f64 * step;
            if v >= t {
                break;
            }

            res += self.consign.velocity(v) * step;
            i += 1;
        }

        res
    }

    /// Upper bound of the error on the position consign due to the
    /// integration, i.e. the largest distance travelled in a single step.
    pub fn error_position_consign(&self) -> f64 {
        let step = self.step_time();

        let mut max_velocity = 0.0f64;
        let mut i = 0usize;
        loop {
            let t = i as f64 * step;
            if t >= self.time_max {
                break;
            }

            max_velocity = max_velocity.max(self.consign.velocity(t));
            i += 1;
        }

        step * max_velocity
    }

    /// Time at which the arc length travelled reaches `length`.
    ///
    /// `length` is clamped to `[0, size]`. The consign is integrated until the
    /// travelled length is within [`TIME_LENGTH_TOLERANCE`] of `length`, or
    /// until the consign is finished.
    ///
    /// # Panics
    /// - If the consign returns a negative speed.
    pub fn time(&self, length: f64) -> f64 {
        let length = length.max(0.0).min(self.curve.size());
        let step = self.step_time();

        // A consign travelling less than the length of the curve would never
        // reach it
        let t_end = self.consign.time_of_displacement();

        let mut res = 0.0;
        let mut i = 0usize;
        while res < length - TIME_LENGTH_TOLERANCE {
            let t = i as f64 * step;
            if t > t_end {
                break;
            }

            let v = self.consign.velocity(t);
            if v < 0.0 {
                raise_error!("Velocity consign is negative ({} m/s) at t = {} s", v, t);
            }

            res += v * step;
            i += 1;
        }

        i as f64 * step
    }

    /// The point to be at `t` seconds after the start of the movement.
    pub fn eval(&self, t: f64) -> Vector2<f64> {
        self.curve
            .eval(self.curve.inverse_of_arc_length(self.position_consign(t)))
    }

    /// Sample the curve every `dt` seconds from 0 to [`Self::max_time`]
    /// inclusive.
    pub fn sample(&self, dt: f64) -> Vec<CurveSample> {
        if !(dt > 0.0) {
            return Vec::new();
        }

        let num_samples = (self.time_max / dt).ceil() as usize;

        (0..=num_samples)
            .map(|i| {
                let t_s = if i == num_samples {
                    self.time_max
                } else {
                    (i as f64 * dt).min(self.time_max)
                };
                CurveSample {
                    t_s,
                    point: self.eval(t_s),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consign::ConsignKind;
    use approx::assert_abs_diff_eq;

    struct Reversing;

    impl VelocityConsign for Reversing {
        fn velocity(&self, _t: f64) -> f64 {
            -1.0
        }

        fn time_of_displacement(&self) -> f64 {
            1.0
        }

        fn time_of_acceleration(&self) -> f64 {
            0.0
        }
    }

    fn straight(kind: ConsignKind, step: f64) -> RenormalizedCurve {
        let path = PathDescriptor::line(Vector2::new(0.0, 0.0), Vector2::new(2.0, 1.0));
        let length = (path.end() - path.start()).norm();

        RenormalizedCurve::new(path, Consign::new(kind, length, 1.0, 2.0).unwrap(), step).unwrap()
    }

    #[test]
    fn test_anchoring() {
        for kind in [ConsignKind::Continuous, ConsignKind::Differentiable].iter() {
            let curve = straight(*kind, 1e-4);

            assert_eq!(curve.eval(0.0), curve.original_curve(0.0));

            let end = curve.eval(curve.max_time());
            assert_abs_diff_eq!(end, curve.original_curve(1.0), epsilon = 2e-3);

            // Past the end the curve holds its last point
            assert_abs_diff_eq!(curve.eval(curve.max_time() + 10.0), end, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_max_time() {
        let curve = straight(ConsignKind::Differentiable, 1e-4);
        let tm = curve.consign().time_of_displacement();

        // The last millimetre is covered at the very end of the deceleration,
        // where the consign is slowest
        assert!(curve.max_time() <= tm + curve.step_time());
        assert!(curve.max_time() > tm - 0.15);
    }

    #[test]
    fn test_position_consign_progresses() {
        let curve = straight(ConsignKind::Continuous, 1e-3);

        let mut prev = 0.0;
        for i in 0..=30 {
            let l = curve.position_consign(i as f64 * 0.1);
            assert!(l >= prev);
            prev = l;
        }

        assert_abs_diff_eq!(prev, curve.curve().size(), epsilon = 1e-2);
    }

    #[test]
    fn test_error_position_consign_decreases() {
        let mut curve = straight(ConsignKind::Differentiable, 1e-2);
        let coarse = curve.error_position_consign();

        curve.set_step_time(1e-3).unwrap();
        let fine = curve.error_position_consign();

        assert!(fine <= coarse);
        assert_abs_diff_eq!(fine, 1e-3 * curve.consign().max_velocity(), epsilon = 1e-5);
    }

    #[test]
    fn test_set_step_time_recomputes() {
        let mut curve = straight(ConsignKind::Continuous, 0.1);
        let coarse = curve.max_time();

        curve.set_step_time(1e-4).unwrap();
        assert_ne!(curve.max_time(), coarse);
        assert_eq!(curve.step_time(), 1e-4);

        assert!(curve.set_step_time(0.0).is_err());
        assert_eq!(curve.step_time(), 1e-4);
    }

    #[test]
    fn test_zero_length() {
        let path = PathDescriptor::line(Vector2::new(1.0, 1.0), Vector2::new(1.0, 1.0));
        let consign = Consign::new(ConsignKind::Differentiable, 0.0, 1.0, 1.0).unwrap();
        let curve = RenormalizedCurve::new(path, consign, 1e-3).unwrap();

        assert_eq!(curve.max_time(), 0.0);
        assert_eq!(curve.eval(5.0), Vector2::new(1.0, 1.0));
        assert_eq!(curve.sample(0.1).len(), 1);
    }

    #[test]
    fn test_sample() {
        let curve = straight(ConsignKind::Differentiable, 1e-3);
        let samples = curve.sample(0.25);

        assert_eq!(samples[0].t_s, 0.0);
        assert_eq!(samples.last().map(|s| s.t_s), Some(curve.max_time()));
        assert!(samples.windows(2).all(|w| w[0].t_s < w[1].t_s));
    }

    #[test]
    #[should_panic]
    fn test_negative_consign() {
        let path = PathDescriptor::line(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0));
        let _ = RenormalizedCurve::new(path, Reversing, 1e-3);
    }
}
