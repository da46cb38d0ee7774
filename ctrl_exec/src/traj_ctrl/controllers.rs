//! # Trajectory controllers module
//!
//! This module provides the PID controllers used for TrajCtrl. The
//! translation error is corrected along the field's X and Y axes
//! independently, with the same gains, and the orientation error by a third
//! controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Time the previous error was passed in
    prev_time_s: Option<f64>,

    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64
}

/// The trajectory controllers
#[derive(Debug, Serialize, Clone)]
pub struct TrajControllers {
    /// Field X error controller
    x_ctrl: PidController,

    /// Field Y error controller
    y_ctrl: PidController,

    /// Orientation error controller
    orient_ctrl: PidController
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            integral: 0f64,
            prev_time_s: None,
            prev_error: None
        }
    }

    /// Get the value of the controller for the given error, measured at
    /// `time_s`.
    pub fn get(&mut self, error: f64, time_s: f64) -> f64 {

        // Calculate dt. A repeated (or backwards) time gives no usable
        // difference.
        let dt = match self.prev_time_s {
            Some(t0) if time_s > t0 => Some(time_s - t0),
            _ => None
        };

        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the integral
        // The other option is to add on the error and that will produce a
        // large spike in integral compared to normal operation, so we don't do
        // this.
        self.integral += match dt {
            Some(t) => error * t,
            None => 0f64
        };

        // Calculate the derivative.
        //
        // If there's no previous error there is nothing to differentiate
        // against, so no derivative is assumed rather than a spike.
        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) => (error - e) / t,
            _ => 0f64
        };

        // Calculate the output
        let out =
            self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv;

        // Remember the previous error and time
        self.prev_error = Some(error);
        self.prev_time_s = Some(time_s);

        out
    }

    /// Forget the history of the controller.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
        self.prev_time_s = None;
    }
}

impl TrajControllers {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        let trans = PidController::new(
            params.trans_k_p, params.trans_k_i, params.trans_k_d
        );

        Self {
            x_ctrl: trans.clone(),
            y_ctrl: trans,
            orient_ctrl: PidController::new(
                params.orient_k_p, params.orient_k_i, params.orient_k_d
            )
        }
    }

    /// Get the field frame translation correction for the position error.
    pub fn get_translation(&mut self, error_m: &Vector2<f64>, time_s: f64) -> Vector2<f64> {
        Vector2::new(
            self.x_ctrl.get(error_m[0], time_s),
            self.y_ctrl.get(error_m[1], time_s)
        )
    }

    /// Get the rotation rate correction for the orientation error.
    pub fn get_rotation(&mut self, error_rad: f64, time_s: f64) -> f64 {
        self.orient_ctrl.get(error_rad, time_s)
    }

    /// Reset all the controllers, done at the start of each movement.
    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.orient_ctrl.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_proportional() {
        let mut pid = PidController::new(2.0, 0.0, 0.0);

        assert_eq!(pid.get(1.5, 0.0), 3.0);
        assert_eq!(pid.get(-1.0, 0.1), -2.0);
    }

    #[test]
    fn test_integral_and_derivative() {
        let mut pid = PidController::new(0.0, 1.0, 0.0);

        // First call has no time difference so nothing is integrated
        assert_eq!(pid.get(2.0, 1.0), 0.0);
        assert_abs_diff_eq!(pid.get(2.0, 1.5), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pid.get(2.0, 2.0), 2.0, epsilon = 1e-12);

        // Same time again, no accumulation
        assert_abs_diff_eq!(pid.get(2.0, 2.0), 2.0, epsilon = 1e-12);

        let mut pid = PidController::new(0.0, 0.0, 1.0);
        assert_eq!(pid.get(1.0, 0.0), 0.0);
        assert_abs_diff_eq!(pid.get(2.0, 0.5), 2.0, epsilon = 1e-12);

        pid.reset();
        assert_eq!(pid.get(5.0, 0.6), 0.0);
    }

    #[test]
    fn test_traj_controllers() {
        let params = Params {
            trans_k_p: 2.0,
            orient_k_p: 0.5,
            ..Params::default()
        };
        let mut ctrls = TrajControllers::new(&params);

        assert_abs_diff_eq!(
            ctrls.get_translation(&Vector2::new(0.1, -0.2), 0.0),
            Vector2::new(0.2, -0.4),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(ctrls.get_rotation(1.0, 0.0), 0.5, epsilon = 1e-12);
    }
}
