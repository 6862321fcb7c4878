//! Floating-point tolerance discipline
//!
//! Allocation volumes are redistributed proportionally many times per season,
//! so exact comparisons drift. Every "is it full", "is it zero" and
//! "did demand exceed supply" decision in the crate goes through these
//! helpers instead of `==`.

/// Relative tolerance used for volume comparisons
pub const REL_TOL: f64 = 1e-9;

/// Absolute floor for comparisons near zero (ML)
pub const ABS_TOL: f64 = 1e-6;

fn scale(a: f64, b: f64) -> f64 {
    a.abs().max(b.abs()).max(1.0)
}

/// `a == b` within the crate tolerance
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= ABS_TOL.max(REL_TOL * scale(a, b))
}

/// `a >= b` within the crate tolerance
pub fn approx_ge(a: f64, b: f64) -> bool {
    a >= b || approx_eq(a, b)
}

/// `a < b` by more than the crate tolerance
pub fn definitely_lt(a: f64, b: f64) -> bool {
    !approx_ge(a, b)
}

/// Snap values within tolerance of zero to exactly zero
pub fn snap_zero(value: f64, reference: f64) -> f64 {
    if value.abs() <= ABS_TOL.max(REL_TOL * reference.abs()) {
        0.0
    } else {
        value
    }
}

/// Clamp a fraction into [0, 1], absorbing tiny overshoot
///
/// # Example
/// ```
/// use catchment_policy_core_rs::core::tolerance::clamp_unit;
///
/// assert_eq!(clamp_unit(1.0 + 1e-12), 1.0);
/// assert_eq!(clamp_unit(-1e-12), 0.0);
/// assert_eq!(clamp_unit(0.4), 0.4);
/// ```
pub fn clamp_unit(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// `numerator / denominator`, or zero when the denominator is empty
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() <= ABS_TOL {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_relative() {
        assert!(approx_eq(250_000.0, 250_000.0 + 1e-5));
        assert!(!approx_eq(250_000.0, 250_001.0));
    }

    #[test]
    fn test_snap_zero() {
        assert_eq!(snap_zero(1e-10, 1000.0), 0.0);
        assert_eq!(snap_zero(0.5, 1000.0), 0.5);
    }

    #[test]
    fn test_safe_ratio_empty_denominator() {
        assert_eq!(safe_ratio(10.0, 0.0), 0.0);
        assert_eq!(safe_ratio(6000.0, 10_000.0), 0.6);
    }
}
