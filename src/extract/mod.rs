//! Point extraction.
//!
//! Reduces a gridded product to a single temperature at a query location:
//! a ±2° window around the point is cleaned according to the product's
//! [`ProductProfile`], distances to every window cell are computed, and the
//! query's [`RadiusPolicy`] picks and averages cells. Every failure mode
//! degrades to NaN so a batch of extractions is never aborted by one bad
//! file or point.

pub mod policy;
pub mod profile;

pub use policy::RadiusPolicy;
pub use profile::{ProductProfile, UnitTransform};

use ndarray::{Array2, Axis, Zip};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ColdpixError, Result};
use crate::geo::distances_km;
use crate::product::{AxisLayout, GriddedProduct};

/// Half-width of the coarse selection window, in degrees
pub const PREFILTER_DEGREES: f64 = 2.0;

/// A point to extract and the rule for reducing nearby cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtractionQuery {
    /// Query longitude, degrees east
    pub lon: f64,
    /// Query latitude, degrees north
    pub lat: f64,
    /// Radius policy
    pub policy: RadiusPolicy,
}

impl ExtractionQuery {
    pub fn new(lon: f64, lat: f64, policy: RadiusPolicy) -> Self {
        Self { lon, lat, policy }
    }
}

/// Extract a value in degrees Celsius, or NaN.
///
/// Errors reading the product (missing variables, inconsistent shapes) are
/// logged and reported as NaN.
pub fn extract(product: &GriddedProduct, profile: &ProductProfile, query: &ExtractionQuery) -> f64 {
    match try_extract(product, profile, query) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                profile = %profile,
                lon = query.lon,
                lat = query.lat,
                error = %e,
                "Extraction failed, returning NaN"
            );
            f64::NAN
        }
    }
}

/// Extract with a policy given as text (`"5"`, `"closest"`, `"closestwithin5"`).
///
/// An unparsable policy is reported as an invalid averaging option and
/// yields NaN.
pub fn extract_with_policy_str(
    product: &GriddedProduct,
    profile: &ProductProfile,
    lon: f64,
    lat: f64,
    policy: &str,
) -> f64 {
    match policy.parse::<RadiusPolicy>() {
        Ok(policy) => extract(product, profile, &ExtractionQuery::new(lon, lat, policy)),
        Err(e) => {
            warn!(policy = %policy, error = %e, "Invalid averaging option provided");
            f64::NAN
        }
    }
}

/// Extraction that surfaces read errors instead of turning them into NaN.
///
/// Degenerate data (no coverage, all-fill window, no valid cell under the
/// policy) is still `Ok(NaN)`.
pub fn try_extract(
    product: &GriddedProduct,
    profile: &ProductProfile,
    query: &ExtractionQuery,
) -> Result<f64> {
    let lon: Vec<f64> = product
        .axis_values(&profile.lon_var)?
        .into_iter()
        .map(|v| v + profile.lon_offset)
        .collect();
    let lat = product.axis_values(&profile.lat_var)?;

    let lon_idx = window_indices(&lon, query.lon);
    let lat_idx = window_indices(&lat, query.lat);
    if lon_idx.is_empty() || lat_idx.is_empty() {
        debug!(
            profile = %profile,
            lon = query.lon,
            lat = query.lat,
            "Query point outside product coverage"
        );
        return Ok(f64::NAN);
    }

    let field = product.field_2d(
        &profile.variable,
        &profile.lat_var,
        &profile.lon_var,
        profile.layout,
    )?;
    if field.dim() != (lat.len(), lon.len()) {
        return Err(ColdpixError::InvalidCoordinates {
            message: format!(
                "Variable {} has shape {:?} but coordinates are {}x{}",
                profile.variable,
                field.shape(),
                lat.len(),
                lon.len()
            ),
        });
    }
    let window = field.select(Axis(0), &lat_idx).select(Axis(1), &lon_idx);

    let fill = product.fill_value(&profile.variable).map(|v| v as f32);
    if profile.all_fill_short_circuit {
        if let Some(fill) = fill {
            if window.iter().all(|&v| v == fill) {
                debug!(profile = %profile, "Window holds only fill values");
                return Ok(f64::NAN);
            }
        }
    }

    let mut values = window.mapv(|v| {
        if !v.is_finite() || Some(v) == fill || Some(v) == profile.extra_missing {
            f64::NAN
        } else {
            profile.transform.apply(v as f64)
        }
    });

    if let Some(mask_name) = &profile.land_mask {
        if product.has_variable(mask_name) {
            let mask = product
                .field_2d(mask_name, &profile.lat_var, &profile.lon_var, AxisLayout::LatLon)?;
            if mask.dim() == field.dim() {
                let mask = mask.select(Axis(0), &lat_idx).select(Axis(1), &lon_idx);
                Zip::from(&mut values).and(&mask).for_each(|v, &m| {
                    if m == 1.0 {
                        *v = f64::NAN;
                    }
                });
            } else {
                warn!(mask = %mask_name, "Land mask shape does not match the product grid");
            }
        } else {
            debug!(mask = %mask_name, "Land mask not present in product");
        }
    }

    let window_lon: Vec<f64> = lon_idx.iter().map(|&j| lon[j]).collect();
    let window_lat: Vec<f64> = lat_idx.iter().map(|&i| lat[i]).collect();
    let shape = values.dim();
    let lons = Array2::from_shape_fn(shape, |(_, j)| window_lon[j]);
    let lats = Array2::from_shape_fn(shape, |(i, _)| window_lat[i]);
    let distances = distances_km(query.lon, query.lat, &lons.view(), &lats.view());

    let cells: Vec<(f64, f64)> = distances.iter().copied().zip(values.iter().copied()).collect();
    Ok(reduce(&cells, query.policy))
}

/// Indices of axis values strictly within the prefilter window around `center`
fn window_indices(axis: &[f64], center: f64) -> Vec<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, v)| **v > center - PREFILTER_DEGREES && **v < center + PREFILTER_DEGREES)
        .map(|(i, _)| i)
        .collect()
}

/// Mean of the non-NaN values, NaN if there are none
fn mean_valid<'a>(cells: impl Iterator<Item = &'a (f64, f64)>) -> f64 {
    let (sum, count) = cells
        .filter(|(_, v)| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), (_, v)| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Smallest non-NaN distance among `cells`
fn min_distance<'a>(cells: impl Iterator<Item = &'a (f64, f64)>) -> Option<f64> {
    cells
        .map(|(d, _)| *d)
        .filter(|d| !d.is_nan())
        .fold(None, |min, d| match min {
            Some(m) if m <= d => Some(m),
            _ => Some(d),
        })
}

/// Apply a radius policy to `(distance_km, value)` pairs.
///
/// Cells tied at the selected distance are averaged together.
pub fn reduce(cells: &[(f64, f64)], policy: RadiusPolicy) -> f64 {
    match policy {
        RadiusPolicy::Fixed(radius) => mean_valid(cells.iter().filter(|(d, _)| *d <= radius)),
        RadiusPolicy::Nearest => match min_distance(cells.iter()) {
            Some(min) => mean_valid(cells.iter().filter(|(d, _)| *d == min)),
            None => f64::NAN,
        },
        RadiusPolicy::NearestWithin(radius) => {
            let valid = || cells.iter().filter(|(d, v)| *d <= radius && !v.is_nan());
            match min_distance(valid()) {
                Some(min) => mean_valid(valid().filter(|(d, _)| *d == min)),
                None => f64::NAN,
            }
        }
    }
}
