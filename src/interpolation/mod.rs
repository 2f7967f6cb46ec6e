//! Interpolation algorithms for rectilinear source grids.
//!
//! The regridder samples an irregular pass at every node of the target mesh
//! through one of these methods. Source axes must be strictly ascending;
//! points outside the source axes never extrapolate and come back as NaN.

pub mod bilinear;
pub mod common;
pub mod nearest;

use ndarray::ArrayView2;

use crate::error::{ColdpixError, Result};

/// Trait for interpolation methods
pub trait Interpolator: Send + Sync {
    /// Sample `data` (shaped `(y, x)`) at the point `(x, y)`.
    fn interpolate(
        &self,
        data: &ArrayView2<f32>,
        x_axis: &[f64],
        y_axis: &[f64],
        x: f64,
        y: f64,
    ) -> f32;

    /// Get the name of this interpolation method
    fn name(&self) -> &str;
}

/// Get an interpolator by name
pub fn get_interpolator(name: &str) -> Result<Box<dyn Interpolator>> {
    match name.to_lowercase().as_str() {
        "nearest" => Ok(Box::new(nearest::NearestInterpolator)),
        "bilinear" => Ok(Box::new(bilinear::BilinearInterpolator)),
        _ => Err(ColdpixError::InvalidParameter {
            param: "interpolation".to_string(),
            message: format!("Unknown interpolation method: {}", name),
        }),
    }
}
