//! NetCDF data loading functionality.
//!
//! Gridded products are read whole into a [`GriddedProduct`]; satellite
//! passes are read into a [`SwathObservation`] with only the coordinates and
//! the one temperature variable the compositor needs.

use ndarray::{Array2, ArrayD, Axis, Ix2, IxDyn};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ColdpixError, Result};
use crate::product::{AttributeValue, Dimension, GriddedProduct, Metadata, Variable};
use crate::swath::{Coordinates, PassInfo, SwathObservation};

/// Open a NetCDF file, reporting absent or unreadable files as missing input
fn open(path: &Path) -> Result<netcdf::File> {
    if !path.exists() {
        return Err(ColdpixError::missing_input(path, "file not found"));
    }
    netcdf::open(path)
        .map_err(|e| ColdpixError::missing_input(path, format!("failed to open NetCDF file: {}", e)))
}

/// Load a NetCDF file into memory as a gridded product
pub fn load_product(path: &Path) -> Result<GriddedProduct> {
    let file = open(path)?;
    info!(file_path = %path.display(), "Opened NetCDF file");
    debug!(
        variables = file.variables().count(),
        dimensions = file.dimensions().count(),
        "NetCDF file layout"
    );

    let (metadata, data) = extract_contents(&file)?;
    let product = GriddedProduct::new(metadata, data);
    product.validate()?;
    Ok(product)
}

/// Read every variable's metadata and numeric data
fn extract_contents(
    file: &netcdf::File,
) -> Result<(Metadata, HashMap<String, ArrayD<f32>>)> {
    // Extract global attributes
    let mut global_attributes = HashMap::new();
    for attr in file.attributes() {
        let value = convert_attribute(&attr)?;
        global_attributes.insert(attr.name().to_string(), value);
    }

    // Extract dimensions
    let mut dimensions = HashMap::new();
    for dim in file.dimensions() {
        let dimension = Dimension {
            name: dim.name().to_string(),
            size: dim.len(),
            is_unlimited: dim.is_unlimited(),
        };
        dimensions.insert(dim.name().to_string(), dimension);
    }

    let mut variables = HashMap::new();
    let mut coordinates = HashMap::new();
    let mut data = HashMap::new();

    for var in file.variables() {
        let name = var.name().to_string();
        let var_dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|dim| dim.name().to_string())
            .collect();
        let var_shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        let values = match read_f32(&var) {
            Ok(values) => values,
            Err(_) => {
                // Text variables such as `included_passes`
                debug!(variable = %name, "Skipping non-numeric variable");
                continue;
            }
        };
        let array = ArrayD::from_shape_vec(IxDyn(&var_shape), values)?;

        let mut var_attrs = HashMap::new();
        for attr in var.attributes() {
            let value = convert_attribute(&attr)?;
            var_attrs.insert(attr.name().to_string(), value);
        }

        // Coordinate variables keep full precision
        if var_dims.len() == 1 && var_dims[0] == name {
            coordinates.insert(name.clone(), read_f64(&var)?);
        }

        variables.insert(
            name.clone(),
            Variable {
                name: name.clone(),
                dimensions: var_dims,
                shape: var_shape,
                attributes: var_attrs,
                dtype: format!("{:?}", var.vartype()),
            },
        );
        data.insert(name, array);
    }

    // Dimensions without a coordinate variable get index coordinates
    for (dim_name, dim) in &dimensions {
        if !coordinates.contains_key(dim_name) {
            let coord_values: Vec<f64> = (0..dim.size).map(|i| i as f64).collect();
            coordinates.insert(dim_name.to_string(), coord_values);
            debug!(dimension = %dim_name, "Created default coordinates for dimension");
        }
    }

    Ok((
        Metadata {
            global_attributes,
            dimensions,
            variables,
            coordinates,
        },
        data,
    ))
}

// netCDF refuses some numeric conversions depending on the build, so the
// common storage types are tried in turn.

/// Read a numeric variable as `f32`
fn read_f32(var: &netcdf::Variable) -> Result<Vec<f32>> {
    if let Ok(values) = var.get_values::<f32, _>(..) {
        return Ok(values);
    }
    read_f64(var).map(|values| values.into_iter().map(|v| v as f32).collect())
}

/// Read a numeric variable as `f64`
fn read_f64(var: &netcdf::Variable) -> Result<Vec<f64>> {
    if let Ok(values) = var.get_values::<f64, _>(..) {
        return Ok(values);
    }
    if let Ok(values) = var.get_values::<f32, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }
    if let Ok(values) = var.get_values::<i32, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }
    if let Ok(values) = var.get_values::<i16, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }
    if let Ok(values) = var.get_values::<i8, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }
    if let Ok(values) = var.get_values::<u8, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }
    Err(ColdpixError::DataNotFound {
        message: format!(
            "Unsupported variable type for {}: {:?}",
            var.name(),
            var.vartype()
        ),
    })
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &netcdf::Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as Nc;

    let value = attr.value()?;
    let converted = match value {
        Nc::Str(s) => AttributeValue::Text(s),
        Nc::Strs(s) => AttributeValue::Text(s.join(", ")),

        Nc::Uchar(v) => AttributeValue::Number(v as f64),
        Nc::Schar(v) => AttributeValue::Number(v as f64),
        Nc::Ushort(v) => AttributeValue::Number(v as f64),
        Nc::Short(v) => AttributeValue::Number(v as f64),
        Nc::Uint(v) => AttributeValue::Number(v as f64),
        Nc::Int(v) => AttributeValue::Number(v as f64),
        Nc::Ulonglong(v) => AttributeValue::Number(v as f64),
        Nc::Longlong(v) => AttributeValue::Number(v as f64),
        Nc::Float(v) => AttributeValue::Number(v as f64),
        Nc::Double(v) => AttributeValue::Number(v),

        Nc::Uchars(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Schars(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Ushorts(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Shorts(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Uints(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Ints(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Floats(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        Nc::Doubles(v) => AttributeValue::NumberArray(v),
        other => AttributeValue::Text(format!("{:?}", other)),
    };
    Ok(converted)
}

/// Numeric value of a variable attribute, if present
fn number_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    let attr = var.attribute(name)?;
    match convert_attribute(&attr).ok()? {
        AttributeValue::Number(v) => Some(v),
        AttributeValue::NumberArray(v) => v.first().copied(),
        AttributeValue::Text(_) => None,
    }
}

/// Read a swath coordinate variable, 1-D or 2-D
fn read_coordinates(file: &netcdf::File, name: &str, path: &Path) -> Result<Coordinates> {
    let var = file
        .variable(name)
        .ok_or_else(|| ColdpixError::missing_input(path, format!("no {} variable", name)))?;
    let values = read_f64(&var)?;
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    match shape.as_slice() {
        [_] => Ok(Coordinates::Axis(values)),
        [rows, cols] => Ok(Coordinates::Mesh(Array2::from_shape_vec(
            (*rows, *cols),
            values,
        )?)),
        _ => Err(ColdpixError::InvalidCoordinates {
            message: format!("{} has unsupported shape {:?}", name, shape),
        }),
    }
}

/// Drop length-1 axes until a 2-D field remains
fn squeeze_2d(mut array: ArrayD<f32>, path: &Path) -> Result<Array2<f32>> {
    while array.ndim() > 2 {
        let Some(axis) = array.shape().iter().position(|&n| n == 1) else {
            return Err(ColdpixError::missing_input(
                path,
                format!("cannot reduce shape {:?} to two dimensions", array.shape()),
            ));
        };
        array = array.index_axis_move(Axis(axis), 0);
    }
    Ok(array.into_dimensionality::<Ix2>()?)
}

/// Load one satellite pass.
///
/// The pass identity comes from the file name; `default_fill` applies when the
/// temperature variable declares no `_FillValue`.
pub fn load_swath(path: &Path, variable: &str, default_fill: f32) -> Result<SwathObservation> {
    let info = PassInfo::from_path(path)?;
    let file = open(path)?;

    let lon = read_coordinates(&file, "lon", path)?;
    let lat = read_coordinates(&file, "lat", path)?;
    let coord_fill = file
        .variable("lon")
        .and_then(|v| number_attribute(&v, "_FillValue"))
        .or_else(|| {
            file.variable("lat")
                .and_then(|v| number_attribute(&v, "_FillValue"))
        });

    let var = file.variable(variable).ok_or_else(|| {
        ColdpixError::missing_input(path, format!("no {} variable", variable))
    })?;
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let values = read_f32(&var)?;
    let sst = squeeze_2d(ArrayD::from_shape_vec(IxDyn(&shape), values)?, path)?;
    let fill_value = number_attribute(&var, "_FillValue")
        .map(|v| v as f32)
        .unwrap_or(default_fill);

    debug!(
        pass = %info,
        file_path = %path.display(),
        shape = ?sst.shape(),
        "Loaded swath"
    );

    if sst.is_empty() {
        warn!(pass = %info, "Swath has an empty temperature field");
    }

    Ok(SwathObservation {
        info,
        lon,
        lat,
        coord_fill,
        sst,
        fill_value: Some(fill_value),
    })
}
