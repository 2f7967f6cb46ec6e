//! Regular lon/lat grid.
//!
//! A [`GeoGrid`] is the fixed target of the compositor: two strictly
//! ascending 1-D axes and the 2-D mesh derived from them. Mesh arrays are
//! shaped `(lat, lon)` so they line up with the `(lat, lon)` fields read from
//! NetCDF files.

use ndarray::{Array2, Axis};

use crate::error::{ColdpixError, Result};

/// Ordering of a 1-D coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Strictly increasing
    Ascending,
    /// Strictly decreasing
    Descending,
    /// Repeated or out-of-order values
    Unordered,
}

/// Classify the ordering of an axis. Axes with fewer than two values count as ascending.
pub fn axis_order(values: &[f64]) -> AxisOrder {
    if values.windows(2).all(|w| w[0] < w[1]) {
        AxisOrder::Ascending
    } else if values.windows(2).all(|w| w[0] > w[1]) {
        AxisOrder::Descending
    } else {
        AxisOrder::Unordered
    }
}

/// Return the axis in ascending order together with a flag telling whether it
/// had to be reversed. `None` when the axis is not strictly monotonic.
pub fn normalize_axis(values: &[f64]) -> Option<(Vec<f64>, bool)> {
    match axis_order(values) {
        AxisOrder::Ascending => Some((values.to_vec(), false)),
        AxisOrder::Descending => Some((values.iter().rev().copied().collect(), true)),
        AxisOrder::Unordered => None,
    }
}

/// Regular lon/lat grid, held with strictly ascending axes.
///
/// Descending source axes are reversed on construction and the reversal is
/// remembered, so fields computed on the grid can be written back in the
/// source's order.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoGrid {
    lon: Vec<f64>,
    lat: Vec<f64>,
    lon_reversed: bool,
    lat_reversed: bool,
}

impl GeoGrid {
    /// Build a grid from strictly monotonic longitude and latitude axes.
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Result<Self> {
        let (lon, lon_reversed) = check_axis("lon", &lon)?;
        let (lat, lat_reversed) = check_axis("lat", &lat)?;
        Ok(Self {
            lon,
            lat,
            lon_reversed,
            lat_reversed,
        })
    }

    /// Longitude axis (degrees east, ascending)
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Latitude axis (degrees north, ascending)
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Whether the source longitude axis was descending
    pub fn lon_reversed(&self) -> bool {
        self.lon_reversed
    }

    /// Whether the source latitude axis was descending
    pub fn lat_reversed(&self) -> bool {
        self.lat_reversed
    }

    /// Longitude axis in the order it was given
    pub fn source_lon(&self) -> Vec<f64> {
        source_order(&self.lon, self.lon_reversed)
    }

    /// Latitude axis in the order it was given
    pub fn source_lat(&self) -> Vec<f64> {
        source_order(&self.lat, self.lat_reversed)
    }

    /// Grid shape as `(n_lat, n_lon)`
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// 2-D longitude and latitude meshes, each shaped `(n_lat, n_lon)`.
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let shape = self.shape();
        let lon_mesh = Array2::from_shape_fn(shape, |(_, j)| self.lon[j]);
        let lat_mesh = Array2::from_shape_fn(shape, |(i, _)| self.lat[i]);
        (lon_mesh, lat_mesh)
    }

    /// Bounding box as `(min_lon, min_lat, max_lon, max_lat)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.lon[0],
            self.lat[0],
            self.lon[self.lon.len() - 1],
            self.lat[self.lat.len() - 1],
        )
    }

    /// Whether a point lies inside the grid's bounding box (edges included)
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let (min_lon, min_lat, max_lon, max_lat) = self.bounds();
        (min_lon..=max_lon).contains(&lon) && (min_lat..=max_lat).contains(&lat)
    }

    /// An all-NaN field shaped like the grid
    pub fn nan_field(&self) -> Array2<f32> {
        Array2::from_elem(self.shape(), f32::NAN)
    }

    /// Copy of a `(lat, lon)` field on this grid, laid out in the source axis order
    pub fn to_source_order(&self, field: &Array2<f32>) -> Array2<f32> {
        let mut out = field.clone();
        if self.lat_reversed {
            out.invert_axis(Axis(0));
        }
        if self.lon_reversed {
            out.invert_axis(Axis(1));
        }
        out
    }
}

fn source_order(values: &[f64], reversed: bool) -> Vec<f64> {
    if reversed {
        values.iter().rev().copied().collect()
    } else {
        values.to_vec()
    }
}

/// Validate an axis and return it ascending with its reversal flag
fn check_axis(name: &str, values: &[f64]) -> Result<(Vec<f64>, bool)> {
    if values.is_empty() {
        return Err(ColdpixError::InvalidCoordinates {
            message: format!("{} axis is empty", name),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ColdpixError::InvalidCoordinates {
            message: format!("{} axis contains non-finite values", name),
        });
    }
    normalize_axis(values).ok_or_else(|| ColdpixError::InvalidCoordinates {
        message: format!("{} axis must be strictly monotonic", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meshgrid_layout() {
        let grid = GeoGrid::new(vec![-75.0, -74.5, -74.0], vec![38.0, 38.5]).unwrap();
        let (lon, lat) = grid.meshgrid();

        assert_eq!(lon.shape(), &[2, 3]);
        assert_eq!(lat.shape(), &[2, 3]);
        assert_eq!(lon[[1, 2]], -74.0);
        assert_eq!(lat[[1, 2]], 38.5);
        assert_eq!(lon[[0, 0]], lon[[1, 0]]);
        assert_eq!(lat[[0, 0]], lat[[0, 2]]);
    }

    #[test]
    fn test_contains() {
        let grid = GeoGrid::new(vec![-75.0, -74.0], vec![38.0, 39.0]).unwrap();
        assert!(grid.contains(-74.5, 38.5));
        assert!(grid.contains(-75.0, 39.0));
        assert!(!grid.contains(-73.9, 38.5));
        assert!(!grid.contains(-74.5, 37.99));
    }

    #[test]
    fn test_rejects_bad_axes() {
        assert!(GeoGrid::new(vec![], vec![1.0]).is_err());
        assert!(GeoGrid::new(vec![1.0, 1.0], vec![1.0]).is_err());
        assert!(GeoGrid::new(vec![1.0, 3.0, 2.0], vec![1.0]).is_err());
        assert!(GeoGrid::new(vec![1.0, f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_descending_axes_are_normalized() {
        let grid = GeoGrid::new(vec![-75.0, -74.0], vec![39.0, 38.5, 38.0]).unwrap();
        assert_eq!(grid.lat(), &[38.0, 38.5, 39.0]);
        assert!(grid.lat_reversed());
        assert!(!grid.lon_reversed());
        assert_eq!(grid.source_lat(), vec![39.0, 38.5, 38.0]);
        assert_eq!(grid.source_lon(), vec![-75.0, -74.0]);
        assert_eq!(grid.bounds(), (-75.0, 38.0, -74.0, 39.0));

        // Row 0 of the ascending field is the southernmost latitude
        let field = ndarray::array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let source = grid.to_source_order(&field);
        assert_eq!(source, ndarray::array![[5.0f32, 6.0], [3.0, 4.0], [1.0, 2.0]]);

        let both = GeoGrid::new(vec![-74.0, -75.0], vec![39.0, 38.0]).unwrap();
        assert_eq!(
            both.to_source_order(&ndarray::array![[1.0f32, 2.0], [3.0, 4.0]]),
            ndarray::array![[4.0f32, 3.0], [2.0, 1.0]]
        );
    }

    #[test]
    fn test_normalize_axis() {
        assert_eq!(
            normalize_axis(&[3.0, 2.0, 1.0]),
            Some((vec![1.0, 2.0, 3.0], true))
        );
        assert_eq!(normalize_axis(&[1.0, 2.0]), Some((vec![1.0, 2.0], false)));
        assert_eq!(normalize_axis(&[1.0, 3.0, 2.0]), None);
    }
}
