//! Trapezoidal velocity consign

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{checked_max_velocity, ConsignError, VelocityConsign};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trapezoidal speed profile: linear ramp up at the maximum acceleration,
/// cruise at the maximum velocity, linear ramp down.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ContinuousVelocityConsign {
    distance: f64,
    max_velocity: f64,
    max_acceleration: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ContinuousVelocityConsign {
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

impl VelocityConsign for ContinuousVelocityConsign {
    fn velocity(&self, t: f64) -> f64 {
        let x = self.time_of_acceleration();
        let a = self.max_acceleration;
        let tm = self.time_of_displacement();

        if t <= 0.0 || t >= tm {
            0.0
        } else if t <= x {
            a * t
        } else if t <= tm - x {
            a * x
        } else {
            a * (tm - t)
        }
    }

    fn time_of_displacement(&self) -> f64 {
        let x = self.time_of_acceleration();

        if x <= 0.0 {
            return 0.0;
        }

        self.distance / (self.max_acceleration * x) + x
    }

    fn time_of_acceleration(&self) -> f64 {
        self.max_velocity / self.max_acceleration
    }
}
