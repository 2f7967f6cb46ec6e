//! Common utilities for interpolation algorithms.

/// Locate `value` on an ascending axis.
///
/// Returns the index of the lower bracketing node and the fractional position
/// between it and the next node. The lower index is always `< axis.len() - 1`,
/// so the last node is reported as `(len - 2, 1.0)`. Returns `None` for NaN,
/// for values outside `[axis[0], axis[len - 1]]` and for axes shorter than 2.
pub fn locate(axis: &[f64], value: f64) -> Option<(usize, f64)> {
    let n = axis.len();
    if n < 2 || value.is_nan() || value < axis[0] || value > axis[n - 1] {
        return None;
    }

    let upper = axis.partition_point(|&a| a <= value);
    let i = upper.saturating_sub(1).min(n - 2);
    let fraction = (value - axis[i]) / (axis[i + 1] - axis[i]);
    Some((i, fraction))
}

/// Clamp an index to valid bounds
pub fn clamp_index(index: f64, size: usize) -> f64 {
    index.max(0.0).min((size - 1) as f64)
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}
