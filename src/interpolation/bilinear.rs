//! Bilinear interpolation.
//!
//! This method performs linear interpolation in two dimensions using
//! the four surrounding grid points. A missing (NaN) corner poisons the
//! result only when it carries a non-zero weight, so a destination node that
//! lands exactly on a valid source node keeps that node's value.
//!
//! This differs from the legacy basemap `interp` regridding, where `0 * NaN`
//! still yields NaN: next to a data gap, nodes that coincide with a source
//! node get a value here and were missing in the legacy output.

use ndarray::ArrayView2;

use super::common::{linear_weight, locate};
use super::Interpolator;

/// Bilinear interpolator
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
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

        let (wx0, wx1) = linear_weight(fx);
        let (wy0, wy1) = linear_weight(fy);
        let corners = [
            (i, j, wy0 * wx0),
            (i, j + 1, wy0 * wx1),
            (i + 1, j, wy1 * wx0),
            (i + 1, j + 1, wy1 * wx1),
        ];

        let mut value = 0.0f64;
        for (row, col, weight) in corners {
            if weight == 0.0 {
                continue;
            }
            let cell = data[[row, col]];
            if cell.is_nan() {
                return f32::NAN;
            }
            value += cell as f64 * weight;
        }

        value as f32
    }

    fn name(&self) -> &str {
        "bilinear"
    }
}
