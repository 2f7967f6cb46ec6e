//! In-memory gridded products.
//!
//! A [`GriddedProduct`] is a NetCDF file loaded whole: its metadata and every
//! numeric variable as an `f32` array. The point extractor and the composite
//! writer only ever look at products through this type, so they have no
//! knowledge of where the file came from.

use ndarray::{Array, Array2, Axis, Ix2, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ColdpixError, Result};
use crate::geo::GeoGrid;

/// Metadata about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the dimension
    pub name: String,
    /// Size of the dimension
    pub size: usize,
    /// Whether this dimension is unlimited
    pub is_unlimited: bool,
}

/// Metadata about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Name of the variable
    pub name: String,
    /// Dimensions of the variable
    pub dimensions: Vec<String>,
    /// Shape of the variable (dimension sizes)
    pub shape: Vec<usize>,
    /// Variable attributes
    pub attributes: HashMap<String, AttributeValue>,
    /// Data type as string
    pub dtype: String,
}

impl Variable {
    /// Numeric value of an attribute; the first element for arrays
    pub fn number_attribute(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            AttributeValue::Number(v) => Some(*v),
            AttributeValue::NumberArray(values) => values.first().copied(),
            AttributeValue::Text(_) => None,
        }
    }
}

/// Possible attribute values in NetCDF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

/// Complete metadata for a NetCDF file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// File-level attributes
    pub global_attributes: HashMap<String, AttributeValue>,
    /// Dimensions in the file
    pub dimensions: HashMap<String, Dimension>,
    /// Variables in the file
    pub variables: HashMap<String, Variable>,
    /// Coordinate variables (subset of variables that match dimension names)
    pub coordinates: HashMap<String, Vec<f64>>,
}

/// Order of the two horizontal axes in a stored field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisLayout {
    /// `(..., lat, lon)`
    LatLon,
    /// `(..., lon, lat)`
    LonLat,
}

/// A loaded gridded product
#[derive(Debug, Clone, Default)]
pub struct GriddedProduct {
    /// File metadata
    pub metadata: Metadata,
    /// Loaded data arrays
    pub data: HashMap<String, Array<f32, IxDyn>>,
}

impl GriddedProduct {
    /// Create a new product from metadata and data arrays
    pub fn new(metadata: Metadata, data: HashMap<String, Array<f32, IxDyn>>) -> Self {
        Self { metadata, data }
    }

    /// Get a variable's data array
    pub fn get_variable(&self, name: &str) -> Option<&Array<f32, IxDyn>> {
        self.data.get(name)
    }

    /// Get a variable's data array with error handling
    pub fn get_variable_checked(&self, name: &str) -> Result<&Array<f32, IxDyn>> {
        self.data
            .get(name)
            .ok_or_else(|| ColdpixError::data_not_found(format!("Variable not found: {}", name)))
    }

    /// Get variable metadata with error handling
    pub fn get_variable_metadata_checked(&self, name: &str) -> Result<&Variable> {
        self.metadata.variables.get(name).ok_or_else(|| {
            ColdpixError::data_not_found(format!("Variable metadata not found: {}", name))
        })
    }

    /// Check if a variable exists
    pub fn has_variable(&self, name: &str) -> bool {
        self.metadata.variables.contains_key(name)
    }

    /// Values of a 1-D coordinate, from the coordinate table or a plain 1-D variable
    pub fn axis_values(&self, name: &str) -> Result<Vec<f64>> {
        if let Some(coords) = self.metadata.coordinates.get(name) {
            return Ok(coords.clone());
        }
        match self.data.get(name) {
            Some(array) if array.ndim() == 1 => Ok(array.iter().map(|&v| v as f64).collect()),
            Some(array) => Err(ColdpixError::InvalidCoordinates {
                message: format!(
                    "Coordinate {} must be 1-D, found shape {:?}",
                    name,
                    array.shape()
                ),
            }),
            None => Err(ColdpixError::data_not_found(format!(
                "Coordinate not found: {}",
                name
            ))),
        }
    }

    /// The `_FillValue` attribute of a variable, if declared
    pub fn fill_value(&self, name: &str) -> Option<f64> {
        self.metadata
            .variables
            .get(name)?
            .number_attribute("_FillValue")
    }

    /// Build the product's regular grid from two 1-D coordinates.
    pub fn grid(&self, lon_name: &str, lat_name: &str) -> Result<GeoGrid> {
        GeoGrid::new(self.axis_values(lon_name)?, self.axis_values(lat_name)?)
    }

    /// Horizontal 2-D slice of a variable, always returned as `(lat, lon)`.
    ///
    /// When the variable's dimension names include `lat_dim` and `lon_dim`
    /// every other axis (time, depth) is taken at index 0 and the axis order
    /// follows the names. Otherwise leading axes are dropped at index 0 until
    /// two remain and `layout` tells which is which.
    pub fn field_2d(
        &self,
        name: &str,
        lat_dim: &str,
        lon_dim: &str,
        layout: AxisLayout,
    ) -> Result<Array2<f32>> {
        let array = self.get_variable_checked(name)?;
        if array.ndim() < 2 {
            return Err(ColdpixError::data_not_found(format!(
                "Variable {} has fewer than two dimensions",
                name
            )));
        }
        if array.is_empty() {
            return Err(ColdpixError::data_not_found(format!(
                "Variable {} is empty",
                name
            )));
        }

        let dims = self
            .metadata
            .variables
            .get(name)
            .map(|v| v.dimensions.as_slice())
            .unwrap_or_default();
        let lat_pos = dims.iter().position(|d| d == lat_dim);
        let lon_pos = dims.iter().position(|d| d == lon_dim);

        let (mut view, layout) = match (lat_pos, lon_pos) {
            (Some(lat_pos), Some(lon_pos)) if dims.len() == array.ndim() => {
                let mut view = array.view();
                for axis in (0..dims.len()).rev() {
                    if axis != lat_pos && axis != lon_pos {
                        view = view.index_axis_move(Axis(axis), 0);
                    }
                }
                let layout = if lat_pos < lon_pos {
                    AxisLayout::LatLon
                } else {
                    AxisLayout::LonLat
                };
                (view, layout)
            }
            _ => (array.view(), layout),
        };
        while view.ndim() > 2 {
            view = view.index_axis_move(Axis(0), 0);
        }

        let field = view.into_dimensionality::<Ix2>()?;
        Ok(match layout {
            AxisLayout::LatLon => field.to_owned(),
            AxisLayout::LonLat => field.reversed_axes().to_owned(),
        })
    }

    /// Validate that the product is consistent and ready for use
    pub fn validate(&self) -> Result<()> {
        // Ensure we have at least one variable
        if self.metadata.variables.is_empty() {
            return Err(ColdpixError::data_not_found(
                "No variables found in the NetCDF file",
            ));
        }

        // Validate that all referenced dimensions exist
        for (var_name, var) in &self.metadata.variables {
            for dim_name in &var.dimensions {
                if !self.metadata.dimensions.contains_key(dim_name) {
                    return Err(ColdpixError::data_not_found(format!(
                        "Variable {} references non-existent dimension {}",
                        var_name, dim_name
                    )));
                }
            }
        }

        // Validate that the data arrays match their metadata shape
        for (var_name, var) in &self.metadata.variables {
            if let Some(data) = self.data.get(var_name) {
                if data.shape() != var.shape.as_slice() {
                    return Err(ColdpixError::data_not_found(format!(
                        "Variable {} has inconsistent shape between metadata ({:?}) and data ({:?})",
                        var_name,
                        var.shape,
                        data.shape()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Approximate memory held by the data arrays, in bytes
    pub fn data_memory_bytes(&self) -> usize {
        self.data
            .values()
            .map(|a| a.len() * std::mem::size_of::<f32>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    fn variable(name: &str, dims: &[&str], shape: &[usize]) -> Variable {
        Variable {
            name: name.to_string(),
            dimensions: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            attributes: HashMap::new(),
            dtype: "f32".to_string(),
        }
    }

    fn product_with(name: &str, dims: &[&str], shape: &[usize]) -> GriddedProduct {
        let mut metadata = Metadata::default();
        for (d, &n) in dims.iter().zip(shape) {
            metadata.dimensions.insert(
                d.to_string(),
                Dimension {
                    name: d.to_string(),
                    size: n,
                    is_unlimited: false,
                },
            );
        }
        metadata
            .variables
            .insert(name.to_string(), variable(name, dims, shape));

        let len: usize = shape.iter().product();
        let values: Vec<f32> = (0..len).map(|i| i as f32).collect();
        let mut data = HashMap::new();
        data.insert(
            name.to_string(),
            ArrayD::from_shape_vec(IxDyn(shape), values).unwrap(),
        );
        GriddedProduct::new(metadata, data)
    }

    #[test]
    fn test_attribute_value_serialization() {
        let text = AttributeValue::Text("test".to_string());
        let json = serde_json::to_string(&text).unwrap();
        assert_eq!(json, r#""test""#);

        let number = AttributeValue::Number(42.0);
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "42.0");

        let array = AttributeValue::NumberArray(vec![1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&array).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0]");
    }

    #[test]
    fn test_field_2d_by_dimension_names() {
        // (time, z, lat, lon) = (1, 1, 2, 3)
        let product = product_with("sst", &["time", "z", "lat", "lon"], &[1, 1, 2, 3]);
        let field = product
            .field_2d("sst", "lat", "lon", AxisLayout::LonLat)
            .unwrap();
        assert_eq!(field.shape(), &[2, 3]);
        assert_eq!(field[[1, 2]], 5.0);

        // (lon, lat) storage is transposed to (lat, lon)
        let product = product_with("sst", &["lon", "lat"], &[3, 2]);
        let field = product
            .field_2d("sst", "lat", "lon", AxisLayout::LatLon)
            .unwrap();
        assert_eq!(field.shape(), &[2, 3]);
        // lon index 2, lat index 1 -> flat 2 * 2 + 1
        assert_eq!(field[[1, 2]], 5.0);
    }

    #[test]
    fn test_field_2d_layout_fallback() {
        let product = product_with("TMP", &["t", "x", "y"], &[1, 3, 2]);
        let field = product
            .field_2d("TMP", "lat", "lon", AxisLayout::LonLat)
            .unwrap();
        assert_eq!(field.shape(), &[2, 3]);
        assert_eq!(field[[0, 1]], 2.0);
    }

    #[test]
    fn test_axis_values_and_fill() {
        let mut product = product_with("lon", &["lon"], &[3]);
        assert_eq!(product.axis_values("lon").unwrap(), vec![0.0, 1.0, 2.0]);
        assert!(product.axis_values("lat").is_err());
        assert_eq!(product.fill_value("lon"), None);

        product
            .metadata
            .variables
            .get_mut("lon")
            .unwrap()
            .attributes
            .insert("_FillValue".to_string(), AttributeValue::Number(-999.0));
        assert_eq!(product.fill_value("lon"), Some(-999.0));
    }

    #[test]
    fn test_validate() {
        let product = product_with("sst", &["lat", "lon"], &[2, 3]);
        assert!(product.validate().is_ok());

        let mut broken = product.clone();
        broken.metadata.variables.get_mut("sst").unwrap().shape = vec![3, 2];
        assert!(broken.validate().is_err());

        assert!(GriddedProduct::default().validate().is_err());
    }
}
