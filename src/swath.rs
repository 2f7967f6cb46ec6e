//! Satellite pass observations.
//!
//! A [`SwathObservation`] holds one AVHRR pass as read from disk: coordinates
//! that may still contain invalid entries, the raw temperature field and its
//! fill sentinel. [`PassInfo`] identifies the pass (satellite and capture
//! time), parsed from filenames shaped `YYMMDD.DDD.HHMM.<sat>.<suffix>`,
//! e.g. `131105.309.1854.n19.BPU.CF.nc`.

use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use ndarray::{Array2, Axis};
use serde::Serialize;

use crate::error::{ColdpixError, Result};

/// Identity of one satellite pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PassInfo {
    /// Satellite code as it appears in the filename (e.g. `n19`)
    pub satellite: String,
    /// Capture time, GMT
    pub time: NaiveDateTime,
}

impl PassInfo {
    /// Create pass info from its parts
    pub fn new(satellite: impl Into<String>, time: NaiveDateTime) -> Self {
        Self {
            satellite: satellite.into(),
            time,
        }
    }

    /// Parse pass info from a file path's name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ColdpixError::missing_input(path, "path has no file name"))?;
        Self::from_file_name(name).map_err(|e| match e {
            ColdpixError::MissingInput { message, .. } => {
                ColdpixError::missing_input(path, message)
            }
            other => other,
        })
    }

    /// Parse pass info from a name like `131105.309.1854.n19.BPU.CF.nc`.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let malformed = |reason: &str| {
            ColdpixError::missing_input(name, format!("malformed pass file name: {}", reason))
        };

        let mut parts = name.split('.');
        let (Some(date), Some(_day_of_year), Some(hhmm), Some(satellite)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("expected YYMMDD.DDD.HHMM.<sat>"));
        };

        if date.len() != 6 || hhmm.len() != 4 {
            return Err(malformed("bad date or time field"));
        }
        let date = NaiveDate::parse_from_str(date, "%y%m%d")
            .map_err(|_| malformed("invalid YYMMDD date"))?;
        let time = NaiveTime::parse_from_str(hhmm, "%H%M")
            .map_err(|_| malformed("invalid HHMM time"))?;
        if satellite.is_empty() {
            return Err(malformed("missing satellite id"));
        }

        Ok(Self::new(satellite, date.and_time(time)))
    }

    /// Hour of day (GMT) the pass was captured
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// Calendar day of the pass
    pub fn day(&self) -> NaiveDate {
        self.time.date()
    }

    /// Human-readable satellite name, `n19` -> `NOAA-19`
    pub fn satellite_name(&self) -> String {
        let number = self.satellite.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        if number.is_empty() {
            self.satellite.to_uppercase()
        } else {
            format!("NOAA-{}", number)
        }
    }
}

impl fmt::Display for PassInfo {
    /// Descriptor used in the `included_passes` output field, e.g. `NOAA-19 18:54GMT`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}GMT",
            self.satellite_name(),
            self.time.format("%H:%M")
        )
    }
}

/// Coordinate values of a swath along one direction
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinates {
    /// 1-D coordinate axis
    Axis(Vec<f64>),
    /// 2-D coordinate mesh shaped `(lat, lon)` like the data field
    Mesh(Array2<f64>),
}

impl Coordinates {
    /// Collapse to a 1-D axis running along `axis` of the `(lat, lon)` field.
    ///
    /// For a mesh, each position along `axis` takes the first finite value
    /// across the other direction that is not `fill`. A lane with no such
    /// value yields NaN so the cleanup step drops it.
    pub fn to_axis(&self, axis: Axis, fill: Option<f64>) -> Vec<f64> {
        match self {
            Coordinates::Axis(values) => values.clone(),
            Coordinates::Mesh(mesh) => mesh
                .axis_iter(axis)
                .map(|lane| {
                    lane.iter()
                        .copied()
                        .find(|&v| v.is_finite() && Some(v) != fill)
                        .unwrap_or(f64::NAN)
                })
                .collect(),
        }
    }
}

/// One satellite pass ready to be regridded
#[derive(Debug, Clone)]
pub struct SwathObservation {
    /// Pass identity
    pub info: PassInfo,
    /// Longitudes, possibly with invalid entries
    pub lon: Coordinates,
    /// Latitudes, possibly with invalid entries
    pub lat: Coordinates,
    /// Fill value of the coordinate variables, if declared
    pub coord_fill: Option<f64>,
    /// Temperature field shaped `(lat, lon)`, native units
    pub sst: Array2<f32>,
    /// Fill sentinel of the temperature field
    pub fill_value: Option<f32>,
}

impl SwathObservation {
    /// Longitude axis, collapsed from a mesh if needed
    pub fn lon_axis(&self) -> Vec<f64> {
        // lon varies along columns: one value per column
        self.lon.to_axis(Axis(1), self.coord_fill)
    }

    /// Latitude axis, collapsed from a mesh if needed
    pub fn lat_axis(&self) -> Vec<f64> {
        self.lat.to_axis(Axis(0), self.coord_fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_file_name() {
        let info = PassInfo::from_file_name("131105.309.1854.n19.BPU.CF.nc").unwrap();
        assert_eq!(info.satellite, "n19");
        assert_eq!(info.day(), NaiveDate::from_ymd_opt(2013, 11, 5).unwrap());
        assert_eq!(info.hour(), 18);
        assert_eq!(info.to_string(), "NOAA-19 18:54GMT");
    }

    #[test]
    fn test_parse_from_path() {
        let info = PassInfo::from_path(Path::new("/data/avhrr/161009.283.1348.n18.BPU.CF.nc"))
            .unwrap();
        assert_eq!(info.to_string(), "NOAA-18 13:48GMT");
    }

    #[test]
    fn test_parse_malformed_names() {
        assert!(PassInfo::from_file_name("avhrr_coldest-pixel_20190701.nc").is_err());
        assert!(PassInfo::from_file_name("131105.309.2554.n19.CF.nc").is_err());
        assert!(PassInfo::from_file_name("131305.309.1854.n19.CF.nc").is_err());
        assert!(PassInfo::from_file_name("131105.309.1854").is_err());

        let err = PassInfo::from_path(Path::new("/x/131105.309.99.n19.CF.nc")).unwrap_err();
        assert!(matches!(err, ColdpixError::MissingInput { ref path, .. } if path.ends_with("131105.309.99.n19.CF.nc")));
    }

    #[test]
    fn test_mesh_collapse() {
        let lon = Coordinates::Mesh(array![
            [f64::NAN, -74.0, f64::NAN],
            [-75.0, -74.0, f64::NAN]
        ]);
        let axis = lon.to_axis(Axis(1), None);
        assert_eq!(axis[0], -75.0);
        assert_eq!(axis[1], -74.0);
        assert!(axis[2].is_nan());

        let lat = Coordinates::Mesh(array![[38.0, 38.0], [39.0, 39.0]]);
        assert_eq!(lat.to_axis(Axis(0), None), vec![38.0, 39.0]);
    }

    #[test]
    fn test_mesh_collapse_skips_fill() {
        let lon = Coordinates::Mesh(array![[-999.0, -74.0], [-75.0, -74.0]]);
        assert_eq!(lon.to_axis(Axis(1), Some(-999.0)), vec![-75.0, -74.0]);
        assert_eq!(lon.to_axis(Axis(1), None), vec![-999.0, -74.0]);

        let lat = Coordinates::Mesh(array![[-999.0, -999.0], [39.0, -999.0]]);
        let axis = lat.to_axis(Axis(0), Some(-999.0));
        assert!(axis[0].is_nan());
        assert_eq!(axis[1], 39.0);
    }
}
