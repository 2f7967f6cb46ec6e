//! # coldpix
//!
//! Daily coldest-pixel sea surface temperature composites from AVHRR passes,
//! and point extraction for comparing satellite products with buoys.
//!
//! ## Pipeline
//!
//! - **Regridding**: each pass is cleaned of invalid coordinates and
//!   interpolated onto a fixed template grid ([`regrid`]).
//! - **Compositing**: passes inside the month's daylight window are folded
//!   with a NaN-aware minimum into one grid per day ([`composite`]).
//! - **Extraction**: a gridded product is reduced to one value at a point
//!   under a radius policy ([`extract`]).
//! - **Statistics**: paired observed/predicted series give bias, RMSE and a
//!   percentile summary ([`stats`], [`buoy`]).
//!
//! NetCDF input and output ([`data_loader`], [`writer`]) and the batch
//! runners built on them ([`batch`]) need the default `netcdf` feature.

pub mod buoy;
pub mod composite;
pub mod config;
pub mod error;
pub mod extract;
pub mod geo;
pub mod handlers;
pub mod interpolation;
pub mod logging;
pub mod product;
pub mod regrid;
pub mod state;
pub mod stats;
pub mod swath;

#[cfg(feature = "netcdf")]
pub mod batch;
#[cfg(feature = "netcdf")]
pub mod data_loader;
#[cfg(feature = "netcdf")]
pub mod writer;

pub use composite::{CompositeBuilder, CompositeGrid, DaylightTable, DaylightWindow, IngestOutcome};
pub use config::Config;
pub use error::{ColdpixError, Result};
pub use extract::{extract, ExtractionQuery, ProductProfile, RadiusPolicy};
pub use geo::GeoGrid;
pub use logging::{init_tracing, log_product_stats};
pub use product::{AttributeValue, Dimension, GriddedProduct, Metadata, Variable};
pub use state::AppState;
pub use stats::{compare, Comparison, DiffSummary};
pub use swath::{PassInfo, SwathObservation};
