//! Composite output files.
//!
//! A finished [`CompositeGrid`] is written as a fresh NetCDF file that follows
//! the template's schema: the template's grid, land mask and text attributes,
//! a `(time, z, lat, lon)` temperature variable and the composite window and
//! pass log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use ndarray::Array2;
use tracing::{debug, info};

use crate::composite::CompositeGrid;
use crate::data_loader::load_product;
use crate::error::{ColdpixError, Result};
use crate::geo::GeoGrid;
use crate::product::{AttributeValue, AxisLayout, GriddedProduct};

/// Global attributes the writer sets itself
const GENERATED_ATTRIBUTES: [&str; 5] = [
    "date_created",
    "date_modified",
    "time_coverage_start",
    "time_coverage_end",
    "history",
];

/// Grid and schema every composite is written on
#[derive(Debug, Clone)]
pub struct CompositeTemplate {
    pub grid: Arc<GeoGrid>,
    pub product: GriddedProduct,
}

impl CompositeTemplate {
    /// Use a loaded product as template; it needs monotonic 1-D `lon` and `lat`
    pub fn from_product(product: GriddedProduct) -> Result<Self> {
        let grid = product.grid("lon", "lat")?;
        Ok(Self {
            grid: Arc::new(grid),
            product,
        })
    }

    /// Load a template file
    pub fn load(path: &Path) -> Result<Self> {
        let template = Self::from_product(load_product(path)?)?;
        let (nlat, nlon) = template.grid.shape();
        info!(
            file_path = %path.display(),
            nlat = nlat,
            nlon = nlon,
            has_mask = template.land_mask().is_some(),
            "Loaded composite template"
        );
        Ok(template)
    }

    /// The `(lat, lon)` land mask, if the template has one matching the grid
    pub fn land_mask(&self) -> Option<Array2<f32>> {
        if !self.product.has_variable("mask") {
            return None;
        }
        self.product
            .field_2d("mask", "lat", "lon", AxisLayout::LatLon)
            .ok()
            .filter(|mask| mask.dim() == self.grid.shape())
    }

    fn text_attributes(&self, variable: &str) -> Vec<(String, String)> {
        self.product
            .metadata
            .variables
            .get(variable)
            .map(|v| {
                v.attributes
                    .iter()
                    .filter_map(|(name, value)| match value {
                        AttributeValue::Text(text) => Some((name.clone(), text.clone())),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `<out_dir>/<YYYY>/avhrr_coldest-pixel_<YYYYMMDD>.nc`
pub fn output_path(out_dir: &Path, day: NaiveDate) -> PathBuf {
    out_dir
        .join(day.format("%Y").to_string())
        .join(format!("avhrr_coldest-pixel_{}.nc", day.format("%Y%m%d")))
}

/// Composite timestamp: the last minute of the day, in days since 1970-01-01
fn composite_time(day: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (day - epoch).num_days() as f64 + (23.0 * 60.0 + 59.0) / 1440.0
}

/// Write `composite` to `path` on the template's schema, replacing any existing file.
pub fn write_composite(
    path: &Path,
    composite: &CompositeGrid,
    template: &CompositeTemplate,
    variable: &str,
) -> Result<()> {
    let grid = composite.grid();
    if grid.shape() != template.grid.shape() {
        return Err(ColdpixError::InvalidCoordinates {
            message: format!(
                "Composite grid {:?} does not match template grid {:?}",
                grid.shape(),
                template.grid.shape()
            ),
        });
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (nlat, nlon) = grid.shape();
    let day = composite.day();
    let mut file = netcdf::create(path)?;

    file.add_dimension("time", 1)?;
    file.add_dimension("z", 1)?;
    file.add_dimension("lat", nlat)?;
    file.add_dimension("lon", nlon)?;

    for (name, value) in &template.product.metadata.global_attributes {
        if let AttributeValue::Text(text) = value {
            if !GENERATED_ATTRIBUTES.contains(&name.as_str()) {
                file.add_attribute(name, text.as_str())?;
            }
        }
    }
    let now = Utc::now().format("%B-%d-%Y GMT").to_string();
    file.add_attribute("date_created", now.as_str())?;
    file.add_attribute("date_modified", now.as_str())?;
    file.add_attribute("history", format!("Created {}", now).as_str())?;
    file.add_attribute(
        "time_coverage_start",
        day.format("%B-%d-%Y 00:00").to_string().as_str(),
    )?;
    file.add_attribute(
        "time_coverage_end",
        day.format("%B-%d-%Y 23:59").to_string().as_str(),
    )?;

    let mut time_var = file.add_variable::<f64>("time", &["time"])?;
    time_var.put_attribute("units", "days since 1970-01-01 00:00:00")?;
    time_var.put_attribute("calendar", "gregorian")?;
    time_var.put_values(&[composite_time(day)], ..)?;

    let mut z_var = file.add_variable::<f64>("z", &["z"])?;
    z_var.put_attribute("units", "m")?;
    z_var.put_attribute("positive", "down")?;
    z_var.put_values(&[0.0], ..)?;

    // Axes and fields go out in the template's order; the mask is already in it
    for (name, values) in [("lon", grid.source_lon()), ("lat", grid.source_lat())] {
        let mut var = file.add_variable::<f64>(name, &[name])?;
        for (attr, text) in template.text_attributes(name) {
            var.put_attribute(&attr, text.as_str())?;
        }
        var.put_values(&values, ..)?;
    }

    if let Some(mask) = template.land_mask() {
        let mut mask_var = file.add_variable::<i8>("mask", &["lat", "lon"])?;
        for (attr, text) in template.text_attributes("mask") {
            mask_var.put_attribute(&attr, text.as_str())?;
        }
        let values: Vec<i8> = mask.iter().map(|&v| v as i8).collect();
        mask_var.put_values(&values, ..)?;
    }

    let mut sst_var = file.add_variable::<f32>(variable, &["time", "z", "lat", "lon"])?;
    sst_var.set_fill_value(composite.fill_value())?;
    let sst_attributes = template.text_attributes(variable);
    if sst_attributes.is_empty() {
        sst_var.put_attribute("units", "degrees_C")?;
        sst_var.put_attribute("long_name", "Coldest pixel sea surface temperature")?;
    }
    for (attr, text) in sst_attributes {
        sst_var.put_attribute(&attr, text.as_str())?;
    }
    let values: Vec<f32> = grid.to_source_order(composite.sst()).iter().copied().collect();
    sst_var.put_values(&values, ..)?;

    let window = composite.window();
    for (name, hour) in [
        ("composite_start_time", window.start_hour),
        ("composite_end_time", window.end_hour),
    ] {
        let mut var = file.add_variable::<i8>(name, &["time"])?;
        var.put_attribute("units", "hour GMT")?;
        var.put_values(&[hour as i8], ..)?;
    }

    let mut passes_var = file.add_string_variable("included_passes", &["time"])?;
    passes_var.put_string(&composite.included_passes(), ..)?;

    debug!(
        file_path = %path.display(),
        day = %day,
        passes = composite.passes().len(),
        "Composite written"
    );
    Ok(())
}
