//! Great-circle distances.

use ndarray::{Array2, ArrayView2, Zip};

/// Earth radius used for all distance computations, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6373.0;

/// Haversine distance in kilometres between two points given in degrees.
///
/// NaN coordinates yield NaN.
pub fn distance_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1) = (lon1.to_radians(), lat1.to_radians());
    let (lon2, lat2) = (lon2.to_radians(), lat2.to_radians());
    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance from one point to every cell of an equally shaped lon/lat mesh.
///
/// # Panics
///
/// Panics if `lons` and `lats` have different shapes.
pub fn distances_km(
    lon: f64,
    lat: f64,
    lons: &ArrayView2<f64>,
    lats: &ArrayView2<f64>,
) -> Array2<f64> {
    Zip::from(lons)
        .and(lats)
        .map_collect(|&cell_lon, &cell_lat| distance_km(lon, lat, cell_lon, cell_lat))
}
