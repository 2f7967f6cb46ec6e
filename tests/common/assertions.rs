//! Assertion utilities for testing.
//!
//! Floating-point comparisons that treat NaN as a value, since missing data
//! is NaN throughout coldpix.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Assert that two values are approximately equal; two NaNs are equal.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    if expected.is_nan() {
        assert!(actual.is_nan(), "Expected NaN, got {}", actual);
        return;
    }
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Element-wise [`assert_approx_eq`] over two grids flattened row-major.
pub fn assert_grid_approx_eq(actual: &[f32], expected: &[f32], epsilon: Option<f64>) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Grids have different sizes: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
        let equal = if e.is_nan() {
            a.is_nan()
        } else {
            ((*a as f64) - (*e as f64)).abs() <= eps
        };
        assert!(
            equal,
            "Grids differ at index {}: actual = {}, expected = {}",
            i, a, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.0000001, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
        assert_approx_eq(f64::NAN, f64::NAN, None);
    }

    #[test]
    fn test_assert_grid_approx_eq() {
        assert_grid_approx_eq(&[1.0, f32::NAN], &[1.0, f32::NAN], None);
        assert_grid_approx_eq(&[1.0, 2.0], &[1.001, 2.001], Some(0.01));
    }
}
