//! Per-product reading conventions.
//!
//! Each gridded product family names its coordinates and temperature
//! variable differently and may need extra cleanup before extraction. A
//! [`ProductProfile`] captures those differences as data so the extractor
//! itself stays generic.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ColdpixError, Result};
use crate::product::AxisLayout;

/// Conversion applied to cell values after fill handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitTransform {
    /// Values are already degrees Celsius
    None,
    /// Values are Kelvin
    KelvinToCelsius,
}

impl UnitTransform {
    /// Apply the transform to one value
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnitTransform::None => value,
            UnitTransform::KelvinToCelsius => value - 273.15,
        }
    }
}

/// How to read one family of gridded products
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductProfile {
    /// Profile name
    pub name: String,
    /// Temperature variable
    pub variable: String,
    /// Longitude coordinate variable
    pub lon_var: String,
    /// Latitude coordinate variable
    pub lat_var: String,
    /// Axis order used when the variable's dimension names are not the coordinate names
    pub layout: AxisLayout,
    /// Added to stored longitudes (`-360` for 0..360 products)
    pub lon_offset: f64,
    /// A second missing-value sentinel besides `_FillValue`
    pub extra_missing: Option<f32>,
    /// Unit conversion to Celsius
    pub transform: UnitTransform,
    /// `(lat, lon)` land mask variable; cells equal to 1 are land
    pub land_mask: Option<String>,
    /// Return NaN when the whole window holds only the fill value
    pub all_fill_short_circuit: bool,
}

impl ProductProfile {
    /// Names of the built-in profiles
    pub const NAMES: [&'static str; 6] =
        ["daily_avhrr", "avhrr", "cold_sport", "sport", "rtg", "nrel"];

    fn base(name: &str, variable: &str, layout: AxisLayout) -> Self {
        Self {
            name: name.to_string(),
            variable: variable.to_string(),
            lon_var: "lon".to_string(),
            lat_var: "lat".to_string(),
            layout,
            lon_offset: 0.0,
            extra_missing: None,
            transform: UnitTransform::None,
            land_mask: None,
            all_fill_short_circuit: false,
        }
    }

    /// Kelvin model output on a 0..360 longitude grid
    fn model(name: &str, variable: &str, suffix: &str) -> Self {
        Self {
            lon_var: format!("lon_{}", suffix),
            lat_var: format!("lat_{}", suffix),
            lon_offset: -360.0,
            extra_missing: Some(-9999.0),
            transform: UnitTransform::KelvinToCelsius,
            ..Self::base(name, variable, AxisLayout::LatLon)
        }
    }

    /// Daily coldest-pixel composites
    pub fn daily_avhrr() -> Self {
        Self {
            land_mask: Some("mask".to_string()),
            ..Self::base("daily_avhrr", "sst", AxisLayout::LatLon)
        }
    }

    /// Individual AVHRR passes
    pub fn avhrr() -> Self {
        Self {
            all_fill_short_circuit: true,
            ..Self::base("avhrr", "mcsst", AxisLayout::LatLon)
        }
    }

    /// Coldest-pixel SPoRT composites, stored `(lon, lat)`
    pub fn cold_sport() -> Self {
        Self::base("cold_sport", "sst", AxisLayout::LonLat)
    }

    /// SPoRT model SST
    pub fn sport() -> Self {
        Self::model("sport", "TMP_P0_L1_GLL0", "0")
    }

    /// RTG analysis SST
    pub fn rtg() -> Self {
        Self::model("rtg", "TMP_173_SFC", "173")
    }

    /// NREL model output, stored `(lon, lat)`
    pub fn nrel() -> Self {
        Self::base("nrel", "sst", AxisLayout::LonLat)
    }

    /// Read a different temperature variable with the same conventions
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }
}

impl FromStr for ProductProfile {
    type Err = ColdpixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily_avhrr" => Ok(Self::daily_avhrr()),
            "avhrr" => Ok(Self::avhrr()),
            "cold_sport" => Ok(Self::cold_sport()),
            "sport" => Ok(Self::sport()),
            "rtg" => Ok(Self::rtg()),
            "nrel" => Ok(Self::nrel()),
            other => Err(ColdpixError::InvalidParameter {
                param: "profile".to_string(),
                message: format!(
                    "Unknown product profile '{}'. Expected one of: {}",
                    other,
                    Self::NAMES.join(", ")
                ),
            }),
        }
    }
}

impl fmt::Display for ProductProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
