//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Saturate `value` to `[-limit, limit]`.
///
/// A negative limit is treated as its absolute value.
pub fn saturate<T>(value: T, limit: T) -> T
where
    T: Float
{
    let limit = limit.abs();

    value.max(-limit).min(limit)
}

/// Get the signed angular distance from `a` to `b`.
///
/// This function will return the shortest signed distance, accounting for
/// wrapping, so that `a + get_ang_dist(a, b)` points in the same direction as
/// `b`. The result is in the range `[-pi, pi)`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_pi(b - a)
}

/// Wrap an angle into the range `[-pi, pi)`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    rem_euclid(angle + pi_t, tau_t) - pi_t
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
/// This result is not an element of the function's codomain, but it is the
/// closest floating point number in the real numbers and thus fulfills the
/// property `self == self.div_euclid(rhs) * rhs + self.rem_euclid(rhs)`
/// approximatively.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}
