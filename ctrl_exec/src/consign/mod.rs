//! # Velocity consign module
//!
//! A velocity consign is the speed a robot should have, as a function of the
//! time elapsed since the start of a movement, in order to cover a given 1D
//! distance without exceeding a velocity and an acceleration limit.
//!
//! Two profiles are provided:
//!
//! - [`ContinuousVelocityConsign`]: the classic trapezoid. Velocity is
//!   continuous but acceleration steps at the corners of the trapezoid.
//! - [`DifferentiableVelocityConsign`]: quadratic ramps, giving a speed which
//!   is both continuous and differentiable. Reaching cruise speed takes twice
//!   as long as with the trapezoid for the same acceleration limit.
//!
//! If the distance is too short to reach the requested velocity, i.e.
//! `distance < 2 * max_velocity^2 / max_acceleration`, the velocity is reduced
//! to `sqrt(distance * max_acceleration / 2)` so that the profile stays a
//! valid symmetric ramp up/ramp down. The reduction is logged as a warning.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod continuous;
mod differentiable;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
use serde::{Deserialize, Serialize};

pub use continuous::ContinuousVelocityConsign;
pub use differentiable::DifferentiableVelocityConsign;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A speed profile over time.
///
/// Implementors must return a finite, non-negative speed for every `t`,
/// including outside of `[0, time_of_displacement()]` where the speed is 0.
pub trait VelocityConsign {
    /// Speed demanded `t` seconds after the start of the movement.
    fn velocity(&self, t: f64) -> f64;

    /// Total duration of the movement in seconds.
    fn time_of_displacement(&self) -> f64;

    /// Time spent ramping up to (and down from) the cruise speed.
    fn time_of_acceleration(&self) -> f64;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while building a consign.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConsignError {
    #[error("Maximum acceleration must be greater than 0, found {0}")]
    NonPositiveAcceleration(f64),

    #[error("Maximum velocity must be greater than 0, found {0}")]
    NonPositiveVelocity(f64),

    #[error("Distance must be positive, found {0}")]
    NegativeDistance(f64),
}

/// The shape of the speed profile to use for a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsignKind {
    Continuous,
    Differentiable,
}

/// A consign of either kind.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Consign {
    Continuous(ContinuousVelocityConsign),
    Differentiable(DifferentiableVelocityConsign),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ConsignKind {
    fn default() -> Self {
        ConsignKind::Differentiable
    }
}

impl Consign {
    /// Build a consign of the given kind.
    pub fn new(
        kind: ConsignKind,
        distance: f64,
        max_velocity: f64,
        max_acceleration: f64,
    ) -> Result<Self, ConsignError> {
        Ok(match kind {
            ConsignKind::Continuous => Consign::Continuous(ContinuousVelocityConsign::new(
                distance,
                max_velocity,
                max_acceleration,
            )?),
            ConsignKind::Differentiable => Consign::Differentiable(
                DifferentiableVelocityConsign::new(distance, max_velocity, max_acceleration)?,
            ),
        })
    }

    /// The cruise velocity, after any reduction for short distances.
    pub fn max_velocity(&self) -> f64 {
        match self {
            Consign::Continuous(c) => c.max_velocity(),
            Consign::Differentiable(c) => c.max_velocity(),
        }
    }
}

impl VelocityConsign for Consign {
    fn velocity(&self, t: f64) -> f64 {
        match self {
            Consign::Continuous(c) => c.velocity(t),
            Consign::Differentiable(c) => c.velocity(t),
        }
    }

    fn time_of_displacement(&self) -> f64 {
        match self {
            Consign::Continuous(c) => c.time_of_displacement(),
            Consign::Differentiable(c) => c.time_of_displacement(),
        }
    }

    fn time_of_acceleration(&self) -> f64 {
        match self {
            Consign::Continuous(c) => c.time_of_acceleration(),
            Consign::Differentiable(c) => c.time_of_acceleration(),
        }
    }
}

impl<C: VelocityConsign + ?Sized> VelocityConsign for Box<C> {
    fn velocity(&self, t: f64) -> f64 {
        (**self).velocity(t)
    }

    fn time_of_displacement(&self) -> f64 {
        (**self).time_of_displacement()
    }

    fn time_of_acceleration(&self) -> f64 {
        (**self).time_of_acceleration()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check the limits of a consign and return the cruise velocity to use.
///
/// The velocity is reduced if the distance is too short to reach it.
fn checked_max_velocity(
    distance: f64,
    max_velocity: f64,
    max_acceleration: f64,
) -> Result<f64, ConsignError> {
    // Written as negated comparisons so that NaNs are rejected too
    if !(max_acceleration > 0.0) || max_acceleration.is_infinite() {
        return Err(ConsignError::NonPositiveAcceleration(max_acceleration));
    }
    if !(max_velocity > 0.0) || max_velocity.is_infinite() {
        return Err(ConsignError::NonPositiveVelocity(max_velocity));
    }
    if !(distance >= 0.0) || distance.is_infinite() {
        return Err(ConsignError::NegativeDistance(distance));
    }

    if distance >= 2.0 * max_velocity * max_velocity / max_acceleration {
        return Ok(max_velocity);
    }

    let reduced = (distance * max_acceleration / 2.0).sqrt();

    if distance > 0.0 {
        warn!(
            "Distance {:.4} is too short for a velocity of {:.4} under an acceleration of {:.4} \
            (should have distance >= 2*v^2/a), reducing the velocity to {:.4}",
            distance, max_velocity, max_acceleration, reduced
        );
    } else {
        trace!("Zero distance consign, velocity reduced to 0");
    }

    Ok(reduced)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    const KINDS: [ConsignKind; 2] = [ConsignKind::Continuous, ConsignKind::Differentiable];

    /// Left Riemann sum of the consign over its whole duration
    fn integrate(consign: &Consign, dt: f64) -> f64 {
        let n = (consign.time_of_displacement() / dt).ceil() as usize;
        (0..n).map(|i| dt * consign.velocity(i as f64 * dt)).sum()
    }

    #[test]
    fn test_integral_equals_distance() {
        for kind in KINDS.iter() {
            // 2 * v^2 / a = 8 <= 10
            let consign = Consign::new(*kind, 10.0, 2.0, 1.0).unwrap();

            assert_eq!(consign.max_velocity(), 2.0);
            assert_abs_diff_eq!(integrate(&consign, 1e-4), 10.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_acceleration_fits_in_half_displacement() {
        let limits = [
            (10.0, 2.0, 1.0),
            (1.0, 10.0, 1.0),
            (0.3, 1.0, 20.0),
            (5.0, 6.3, 60.0),
            (1e-3, 1.0, 1.0),
        ];

        for kind in KINDS.iter() {
            for (d, v, a) in limits.iter() {
                let consign = Consign::new(*kind, *d, *v, *a).unwrap();
                assert!(
                    consign.time_of_acceleration()
                        <= consign.time_of_displacement() / 2.0 + 1e-12,
                    "{:?} consign for d={}, v={}, a={}",
                    kind, d, v, a
                );
            }
        }
    }

    #[test]
    fn test_short_distance_reduces_velocity() {
        for kind in KINDS.iter() {
            let consign = Consign::new(*kind, 1.0, 10.0, 1.0).unwrap();
            let tm = consign.time_of_displacement();

            assert_abs_diff_eq!(consign.max_velocity(), 0.5f64.sqrt(), epsilon = 1e-12);

            assert_eq!(consign.velocity(0.0), 0.0);
            assert_eq!(consign.velocity(tm), 0.0);

            // Symmetric profile
            for i in 1..20 {
                let t = tm * i as f64 / 20.0;
                assert_abs_diff_eq!(consign.velocity(t), consign.velocity(tm - t), epsilon = 1e-9);
                assert!(consign.velocity(t) <= consign.max_velocity() + 1e-12);
            }

            // Still covers the whole distance
            assert_abs_diff_eq!(integrate(&consign, 1e-5), 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_outside_domain_is_zero() {
        for kind in KINDS.iter() {
            let consign = Consign::new(*kind, 3.0, 1.0, 2.0).unwrap();
            let tm = consign.time_of_displacement();

            assert_eq!(consign.velocity(-1.0), 0.0);
            assert_eq!(consign.velocity(tm + 1e-6), 0.0);
            assert_eq!(consign.velocity(1e9), 0.0);

            let n = 1000;
            for i in 0..=n {
                let t = -0.5 + (tm + 1.0) * i as f64 / n as f64;
                let v = consign.velocity(t);
                assert!(v.is_finite() && v >= 0.0, "v({}) = {}", t, v);
            }
        }
    }

    #[test]
    fn test_zero_distance() {
        for kind in KINDS.iter() {
            let consign = Consign::new(*kind, 0.0, 1.0, 1.0).unwrap();

            assert_eq!(consign.time_of_displacement(), 0.0);
            assert_eq!(consign.time_of_acceleration(), 0.0);
            assert_eq!(consign.velocity(0.0), 0.0);
            assert_eq!(consign.velocity(0.5), 0.0);
        }
    }

    #[test]
    fn test_invalid_limits() {
        for kind in KINDS.iter() {
            assert_eq!(
                Consign::new(*kind, 1.0, 1.0, 0.0),
                Err(ConsignError::NonPositiveAcceleration(0.0))
            );
            assert_eq!(
                Consign::new(*kind, 1.0, 1.0, -2.0),
                Err(ConsignError::NonPositiveAcceleration(-2.0))
            );
            assert_eq!(
                Consign::new(*kind, 1.0, 0.0, 1.0),
                Err(ConsignError::NonPositiveVelocity(0.0))
            );
            assert_eq!(
                Consign::new(*kind, -1.0, 1.0, 1.0),
                Err(ConsignError::NegativeDistance(-1.0))
            );
            assert!(Consign::new(*kind, 1.0, 1.0, f64::NAN).is_err());
        }
    }
}
