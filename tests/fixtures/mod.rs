//! Test fixtures for courier-route.
//!
//! Provides:
//! - Real Warsaw delivery locations (from OpenStreetMap)
//! - A deterministic stub provider for geocoding, directions and matrices

#![allow(dead_code)]

pub mod stub_provider;
pub mod warsaw_locations;

pub use stub_provider::*;
pub use warsaw_locations::*;
