//! Differentiable velocity consign

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{checked_max_velocity, ConsignError, VelocityConsign};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A speed profile made of quadratic ramps, so that the speed has no corners.
///
/// With `x` the time of acceleration, `a` the maximum acceleration and `tm`
/// the time of displacement, the speed is:
///
/// - `a*t^2/x` up to `x/2`,
/// - `a*x/2 - a*(t-x)^2/x` up to `x`, reaching the cruise speed `a*x/2`,
/// - `a*x/2` up to `tm-x`,
/// - the mirror image of the ramp up until `tm`.
///
/// The peak acceleration, reached at `x/2`, is `a`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DifferentiableVelocityConsign {
    distance: f64,
    max_velocity: f64,
    max_acceleration: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DifferentiableVelocityConsign {
    pub fn new(
        distance: f64,
        max_velocity: f64,
        max_acceleration: f64,
    ) -> Result<Self, ConsignError> {
        Ok(Self {
            distance,
            max_velocity: checked_max_velocity(distance, max_velocity, max_acceleration)?,
            max_acceleration,
        })
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    pub fn max_acceleration(&self) -> f64 {
        self.max_acceleration
    }
}

impl VelocityConsign for DifferentiableVelocityConsign {
    fn velocity(&self, t: f64) -> f64 {
        let x = self.time_of_acceleration();
        let a = self.max_acceleration;
        let tm = self.time_of_displacement();

        if t <= 0.0 || t >= tm {
            0.0
        } else if t <= x / 2.0 {
            a * t * t / x
        } else if t <= x {
            a * x / 2.0 - a * (t - x) * (t - x) / x
        } else if t <= tm - x {
            a * x / 2.0
        } else if t <= tm - x / 2.0 {
            a * x / 2.0 - a * (t - tm + x) * (t - tm + x) / x
        } else {
            a * (t - tm) * (t - tm) / x
        }
    }

    fn time_of_displacement(&self) -> f64 {
        let x = self.time_of_acceleration();

        if x <= 0.0 {
            return 0.0;
        }

        2.0 * self.distance / (self.max_acceleration * x) + x
    }

    fn time_of_acceleration(&self) -> f64 {
        2.0 * self.max_velocity / self.max_acceleration
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cruise_speed() {
        let consign = DifferentiableVelocityConsign::new(10.0, 2.0, 1.0).unwrap();

        assert_eq!(consign.time_of_acceleration(), 4.0);
        assert_eq!(consign.time_of_displacement(), 9.0);

        assert_abs_diff_eq!(consign.velocity(4.0), 2.0);
        assert_abs_diff_eq!(consign.velocity(4.5), 2.0);
        assert_abs_diff_eq!(consign.velocity(5.0), 2.0);
    }

    #[test]
    fn test_no_corners() {
        let consign = DifferentiableVelocityConsign::new(10.0, 2.0, 1.0).unwrap();
        let x = consign.time_of_acceleration();
        let tm = consign.time_of_displacement();
        let h = 1e-6;

        // Left and right derivatives agree at every junction of the profile
        for t in [x / 2.0, x, tm - x, tm - x / 2.0].iter() {
            let left = (consign.velocity(*t) - consign.velocity(t - h)) / h;
            let right = (consign.velocity(t + h) - consign.velocity(*t)) / h;
            assert_abs_diff_eq!(left, right, epsilon = 1e-4);
        }

        // Peak acceleration is the acceleration limit
        let accel = (consign.velocity(x / 2.0 + h) - consign.velocity(x / 2.0 - h)) / (2.0 * h);
        assert_abs_diff_eq!(accel, 1.0, epsilon = 1e-4);
    }
}
