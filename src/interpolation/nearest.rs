//! Nearest neighbor interpolation.
//!
//! This method selects the value of the nearest source node. Exact midpoints
//! resolve to the lower node.

use ndarray::ArrayView2;

use super::common::{clamp_index, locate};
use super::Interpolator;

/// Nearest neighbor interpolator
pub struct NearestInterpolator;

impl Interpolator for NearestInterpolator {
    fn interpolate(
        &self,
        data: &ArrayView2<f32>,
        x_axis: &[f64],
        y_axis: &[f64],
        x: f64,
        y: f64,
    ) -> f32 {
        let (Some((j, fx)), Some((i, fy))) = (locate(x_axis, x), locate(y_axis, y)) else {
            return f32::NAN;
        };

        let col = nearest_node(j, fx, x_axis.len());
        let row = nearest_node(i, fy, y_axis.len());
        data[[row, col]]
    }

    fn name(&self) -> &str {
        "nearest"
    }
}

fn nearest_node(lower: usize, fraction: f64, size: usize) -> usize {
    let offset = if fraction > 0.5 { 1.0 } else { 0.0 };
    clamp_index(lower as f64 + offset, size) as usize
}
