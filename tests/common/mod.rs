//! Common test utilities for coldpix.
//!
//! Shared helpers for the integration tests: float assertions, NetCDF
//! fixture builders and a small HTTP client.

#![allow(dead_code)]

pub mod assertions;
pub mod http_client;
pub mod test_data;
