//! NetCDF fixtures.
//!
//! Builders for the three kinds of files coldpix reads: composite templates,
//! satellite passes and gridded products. Every builder writes a small file
//! with known values so tests can predict exact results.

use std::path::Path;

use netcdf::Error;
type Result<T> = std::result::Result<T, Error>;

/// Fill sentinel used by every fixture
pub const FILL: f32 = -999.0;

/// Template longitudes
pub const TEMPLATE_LON: [f64; 4] = [-75.0, -74.5, -74.0, -73.5];
/// Template latitudes
pub const TEMPLATE_LAT: [f64; 3] = [38.0, 38.5, 39.0];

/// Creates a composite template on [`TEMPLATE_LON`] x [`TEMPLATE_LAT`].
///
/// `mask` is row-major `(lat, lon)`, 1 for land.
pub fn create_template_nc(path: &Path, mask: Option<&[i8]>) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("lat", TEMPLATE_LAT.len())?;
    file.add_dimension("lon", TEMPLATE_LON.len())?;

    file.add_attribute("title", "AVHRR coldest pixel composite")?;
    file.add_attribute("institution", "coldpix test suite")?;
    file.add_attribute("history", "template")?;

    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_attribute("standard_name", "longitude")?;
        lon_var.put_values(&TEMPLATE_LON, ..)?;
    }
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_attribute("standard_name", "latitude")?;
        lat_var.put_values(&TEMPLATE_LAT, ..)?;
    }
    if let Some(mask) = mask {
        let mut mask_var = file.add_variable::<i8>("mask", &["lat", "lon"])?;
        mask_var.put_attribute("flag_meanings", "water land")?;
        mask_var.put_values(mask, ..)?;
    }
    {
        let mut sst_var = file.add_variable::<f32>("sst", &["lat", "lon"])?;
        sst_var.set_fill_value(FILL)?;
        sst_var.put_attribute("units", "degrees_C")?;
        sst_var.put_attribute("long_name", "sea surface temperature")?;
        let empty = vec![FILL; TEMPLATE_LAT.len() * TEMPLATE_LON.len()];
        sst_var.put_values(&empty, ..)?;
    }

    Ok(())
}

/// Pass longitudes, wider than the template
pub const PASS_LON: [f32; 5] = [-76.0, -75.0, -74.0, -73.0, -72.0];
/// Pass latitudes, wider than the template
pub const PASS_LAT: [f32; 4] = [37.0, 38.0, 39.0, 40.0];

/// Creates a pass file with 1-D coordinates and an `mcsst(lat, lon)` field.
///
/// `sst` is row-major over [`PASS_LAT`] x [`PASS_LON`]; cells equal to
/// [`FILL`] are missing.
pub fn create_pass_nc(path: &Path, sst: &[f32]) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("lat", PASS_LAT.len())?;
    file.add_dimension("lon", PASS_LON.len())?;

    {
        let mut lon_var = file.add_variable::<f32>("lon", &["lon"])?;
        lon_var.set_fill_value(FILL)?;
        lon_var.put_values(&PASS_LON, ..)?;
    }
    {
        let mut lat_var = file.add_variable::<f32>("lat", &["lat"])?;
        lat_var.set_fill_value(FILL)?;
        lat_var.put_values(&PASS_LAT, ..)?;
    }
    {
        let mut sst_var = file.add_variable::<f32>("mcsst", &["lat", "lon"])?;
        sst_var.set_fill_value(FILL)?;
        sst_var.put_attribute("units", "degrees_C")?;
        sst_var.put_values(sst, ..)?;
    }

    Ok(())
}

/// A pass field holding `value` everywhere
pub fn uniform_pass(value: f32) -> Vec<f32> {
    vec![value; PASS_LAT.len() * PASS_LON.len()]
}

/// Creates an RTG-style model product: 0..360 longitudes and Kelvin values.
///
/// `TMP_173_SFC(lat_173, lon_173)` on longitudes 284..287 and latitudes 37..40
/// (1 degree steps), with `kelvin` row-major and -9999 marking missing cells.
pub fn create_rtg_nc(path: &Path, kelvin: &[f32]) -> Result<()> {
    let lon: Vec<f32> = (0..4).map(|j| 284.0 + j as f32).collect();
    let lat: Vec<f32> = (0..4).map(|i| 37.0 + i as f32).collect();
    let mut file = netcdf::create(path)?;

    file.add_dimension("lat_173", lat.len())?;
    file.add_dimension("lon_173", lon.len())?;
    file.add_attribute("title", "RTG SST analysis")?;

    {
        let mut var = file.add_variable::<f32>("lon_173", &["lon_173"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(&lon, ..)?;
    }
    {
        let mut var = file.add_variable::<f32>("lat_173", &["lat_173"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(&lat, ..)?;
    }
    {
        let mut var = file.add_variable::<f32>("TMP_173_SFC", &["lat_173", "lon_173"])?;
        var.set_fill_value(1.0e20f32)?;
        var.put_attribute("units", "K")?;
        var.put_values(kelvin, ..)?;
    }

    Ok(())
}
