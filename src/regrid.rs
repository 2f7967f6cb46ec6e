//! Swath regridding.
//!
//! Maps one irregular satellite pass onto a [`GeoGrid`]. The pass is first
//! reduced to clean, ascending axes with a co-indexed temperature field
//! ([`clean_swath`]), then sampled at every target node by an
//! [`Interpolator`]. Target nodes outside the bounding box of the cleaned
//! source axes are always NaN. A pass that cannot be cleaned into at least a
//! 2x2 field regrids to an all-NaN grid, which the compositor treats as "no
//! contribution".

use ndarray::{Array2, Axis};
use tracing::{debug, warn};

use crate::geo::grid::{normalize_axis, GeoGrid};
use crate::interpolation::Interpolator;
use crate::swath::SwathObservation;

/// A pass reduced to valid, ascending axes
#[derive(Debug, Clone)]
pub struct CleanSwath {
    /// Ascending longitudes
    pub lon: Vec<f64>,
    /// Ascending latitudes
    pub lat: Vec<f64>,
    /// Temperatures shaped `(lat, lon)`, NaN where missing
    pub sst: Array2<f32>,
}

impl CleanSwath {
    /// Bounding box of the source axes as `(min_lon, min_lat, max_lon, max_lat)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.lon[0],
            self.lat[0],
            self.lon[self.lon.len() - 1],
            self.lat[self.lat.len() - 1],
        )
    }
}

/// Strip invalid coordinates and fill values and put both axes in ascending order.
///
/// Returns `None` when the pass is degenerate: mismatched shapes, fewer than
/// two valid entries on either axis, an empty field, or an axis that is not
/// monotonic.
pub fn clean_swath(swath: &SwathObservation) -> Option<CleanSwath> {
    let descriptor = swath.info.to_string();
    let lon = swath.lon_axis();
    let lat = swath.lat_axis();
    let (rows, cols) = swath.sst.dim();

    if rows == 0 || cols == 0 {
        debug!(pass = %descriptor, "Empty temperature field");
        return None;
    }
    if lon.len() != cols || lat.len() != rows {
        warn!(
            pass = %descriptor,
            lon_len = lon.len(),
            lat_len = lat.len(),
            shape = ?swath.sst.shape(),
            "Coordinate lengths do not match the temperature field"
        );
        return None;
    }

    let is_valid = |v: &f64| v.is_finite() && Some(*v) != swath.coord_fill;
    let lon_keep: Vec<usize> = (0..cols).filter(|&j| is_valid(&lon[j])).collect();
    let lat_keep: Vec<usize> = (0..rows).filter(|&i| is_valid(&lat[i])).collect();

    if lon_keep.len() < 2 || lat_keep.len() < 2 {
        debug!(
            pass = %descriptor,
            valid_lon = lon_keep.len(),
            valid_lat = lat_keep.len(),
            "Too few valid coordinates after cleanup"
        );
        return None;
    }

    let lon: Vec<f64> = lon_keep.iter().map(|&j| lon[j]).collect();
    let lat: Vec<f64> = lat_keep.iter().map(|&i| lat[i]).collect();

    let fill = swath.fill_value;
    let mut sst = swath
        .sst
        .select(Axis(0), &lat_keep)
        .select(Axis(1), &lon_keep);
    sst.mapv_inplace(|v| {
        if !v.is_finite() || Some(v) == fill {
            f32::NAN
        } else {
            v
        }
    });

    let Some((lon, lon_reversed)) = normalize_axis(&lon) else {
        warn!(pass = %descriptor, "Longitude axis is not monotonic");
        return None;
    };
    let Some((lat, lat_reversed)) = normalize_axis(&lat) else {
        warn!(pass = %descriptor, "Latitude axis is not monotonic");
        return None;
    };
    if lon_reversed {
        sst.invert_axis(Axis(1));
    }
    if lat_reversed {
        sst.invert_axis(Axis(0));
    }

    Some(CleanSwath { lon, lat, sst })
}

/// Regrid a pass onto `grid`, returning a `(lat, lon)` field shaped like the grid.
pub fn regrid(
    swath: &SwathObservation,
    grid: &GeoGrid,
    interpolator: &dyn Interpolator,
) -> Array2<f32> {
    match clean_swath(swath) {
        Some(clean) => regrid_clean(&clean, grid, interpolator),
        None => grid.nan_field(),
    }
}

/// Regrid an already cleaned pass.
pub fn regrid_clean(
    clean: &CleanSwath,
    grid: &GeoGrid,
    interpolator: &dyn Interpolator,
) -> Array2<f32> {
    let (min_lon, min_lat, max_lon, max_lat) = clean.bounds();
    let data = clean.sst.view();
    let (grid_lon, grid_lat) = (grid.lon(), grid.lat());

    Array2::from_shape_fn(grid.shape(), |(i, j)| {
        let (x, y) = (grid_lon[j], grid_lat[i]);
        if x < min_lon || x > max_lon || y < min_lat || y > max_lat {
            return f32::NAN;
        }
        interpolator.interpolate(&data, &clean.lon, &clean.lat, x, y)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::bilinear::BilinearInterpolator;
    use crate::swath::{Coordinates, PassInfo};
    use ndarray::array;

    fn swath(lon: Vec<f64>, lat: Vec<f64>, sst: Array2<f32>) -> SwathObservation {
        SwathObservation {
            info: PassInfo::from_file_name("190704.185.1620.n19.BPU.CF.nc").unwrap(),
            lon: Coordinates::Axis(lon),
            lat: Coordinates::Axis(lat),
            coord_fill: Some(-999.0),
            sst,
            fill_value: Some(-999.0),
        }
    }

    #[test]
    fn test_clean_reverses_descending_axes() {
        let s = swath(
            vec![2.0, 1.0, 0.0],
            vec![11.0, 10.0],
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
        );
        let clean = clean_swath(&s).unwrap();

        assert_eq!(clean.lon, vec![0.0, 1.0, 2.0]);
        assert_eq!(clean.lat, vec![10.0, 11.0]);
        // lat 10 / lon 0 was row 1, col 2 in the source
        assert_eq!(clean.sst[[0, 0]], 6.0);
        assert_eq!(clean.sst[[1, 2]], 1.0);
    }

    #[test]
    fn test_clean_drops_invalid_coordinates() {
        let s = swath(
            vec![0.0, -999.0, 1.0],
            vec![10.0, f64::NAN, 11.0],
            array![
                [1.0, 100.0, 2.0],
                [100.0, 100.0, 100.0],
                [3.0, 100.0, -999.0]
            ],
        );
        let clean = clean_swath(&s).unwrap();

        assert_eq!(clean.lon, vec![0.0, 1.0]);
        assert_eq!(clean.lat, vec![10.0, 11.0]);
        assert_eq!(clean.sst[[0, 0]], 1.0);
        assert_eq!(clean.sst[[0, 1]], 2.0);
        assert_eq!(clean.sst[[1, 0]], 3.0);
        assert!(clean.sst[[1, 1]].is_nan());
    }

    #[test]
    fn test_degenerate_passes() {
        // One valid longitude
        let s = swath(vec![0.0, f64::NAN], vec![10.0, 11.0], array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(clean_swath(&s).is_none());

        // Shape mismatch
        let s = swath(vec![0.0, 1.0, 2.0], vec![10.0, 11.0], array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(clean_swath(&s).is_none());

        // Non-monotonic latitude
        let s = swath(
            vec![0.0, 1.0],
            vec![10.0, 12.0, 11.0],
            array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
        );
        assert!(clean_swath(&s).is_none());

        let grid = GeoGrid::new(vec![0.0, 1.0], vec![10.0, 11.0]).unwrap();
        let out = regrid(&s, &grid, &BilinearInterpolator);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_mesh_with_fill_coordinate_still_regrids() {
        let s = SwathObservation {
            lon: Coordinates::Mesh(array![[-999.0, -74.0], [-75.0, -74.0]]),
            lat: Coordinates::Mesh(array![[38.0, 38.0], [39.0, 39.0]]),
            ..swath(vec![], vec![], array![[1.0, 2.0], [3.0, 4.0]])
        };
        assert_eq!(s.lon_axis(), vec![-75.0, -74.0]);

        let grid = GeoGrid::new(vec![-75.0, -74.5, -74.0], vec![38.0, 39.0]).unwrap();
        let out = regrid(&s, &grid, &BilinearInterpolator);
        assert!(out.iter().all(|v| !v.is_nan()));
        assert!((out[[0, 1]] - 1.5).abs() < 1e-6);
        assert_eq!(out[[1, 2]], 4.0);
    }

    #[test]
    fn test_regrid_no_extrapolation() {
        let s = swath(
            vec![0.0, 1.0, 2.0],
            vec![10.0, 11.0],
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
        );
        let grid = GeoGrid::new(vec![-0.5, 0.0, 1.5, 2.5], vec![9.5, 10.5, 11.5]).unwrap();
        let out = regrid(&s, &grid, &BilinearInterpolator);

        assert_eq!(out.shape(), &[3, 4]);
        for i in 0..3 {
            for j in 0..4 {
                let inside = (0.0..=2.0).contains(&grid.lon()[j])
                    && (10.0..=11.0).contains(&grid.lat()[i]);
                assert_eq!(out[[i, j]].is_nan(), !inside, "cell ({}, {})", i, j);
            }
        }
        assert!((out[[1, 1]] - 2.5).abs() < 1e-6);
        assert!((out[[1, 2]] - 4.0).abs() < 1e-6);
    }
}
