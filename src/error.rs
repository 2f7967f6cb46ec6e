//! Error types for the coldpix crate.
//!
//! Most conditions listed here are recovered close to where they happen: a
//! compositing run skips a pass it cannot read, and an extraction answers NaN
//! instead of failing. Only configuration problems and output files that
//! cannot be created travel all the way up to `main`.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for coldpix operations.
#[derive(Error, Debug)]
pub enum ColdpixError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape mismatches when building ndarray views
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid coordinate errors
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Unrecognized radius policy string
    #[error("Invalid averaging option: {policy}")]
    InvalidPolicy { policy: String },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// A declared input file is absent, unreadable or misnamed
    #[error("Missing input {}: {message}", path.display())]
    MissingInput { path: PathBuf, message: String },

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl ColdpixError {
    /// Shorthand for a [`ColdpixError::MissingInput`] tied to a path.
    pub fn missing_input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ColdpixError::MissingInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`ColdpixError::DataNotFound`].
    pub fn data_not_found(message: impl Into<String>) -> Self {
        ColdpixError::DataNotFound {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with ColdpixError
pub type Result<T> = std::result::Result<T, ColdpixError>;
