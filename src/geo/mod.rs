//! Geographic primitives shared by the compositor and the point extractor.
//!
//! This module provides the regular lon/lat target grid and great-circle
//! distances between a query point and a mesh of grid cells.

pub mod grid;
pub mod haversine;

pub use grid::{normalize_axis, GeoGrid};
pub use haversine::{distance_km, distances_km, EARTH_RADIUS_KM};
