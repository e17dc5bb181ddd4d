//! Provider interfaces consumed by the planner.
//!
//! Concrete adapters (OSRM, Nominatim) implement these over HTTP; tests
//! substitute deterministic stubs.

use crate::error::ProviderError;
use crate::model::Coordinate;
use crate::polyline::Polyline;

/// Pairwise travel durations in whole seconds, indexed by input order.
///
/// `None` marks a pair the provider could not route.
pub type DurationMatrix = Vec<Vec<Option<i32>>>;

/// Provides a duration matrix for a set of locations.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError>;
}

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub coordinate: Coordinate,
    pub formatted_address: String,
}

/// Resolves free-text addresses.
pub trait GeocodingProvider {
    /// One lookup. `Ok(None)` means the provider found no match.
    fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>, ProviderError>;
}

/// One leg of a provider directions reply, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLeg {
    pub distance_m: f64,
    pub duration_s: f64,
    /// Traffic-free baseline duration, when the provider reports one.
    pub free_flow_duration_s: Option<f64>,
    pub geometry: Polyline,
}

/// Provider-neutral directions reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDirections {
    pub legs: Vec<RawLeg>,
}

/// Computes directions for an already ordered multi-stop path.
pub trait DirectionsProvider {
    /// Issues exactly one directions request for the whole path.
    fn fetch_directions(
        &self,
        coordinates: &[Coordinate],
        include_traffic: bool,
    ) -> Result<RawDirections, ProviderError>;
}

impl<T: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for &T {
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError> {
        (**self).matrix_for(locations)
    }
}

impl<T: GeocodingProvider + ?Sized> GeocodingProvider for &T {
    fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>, ProviderError> {
        (**self).geocode(address)
    }
}

impl<T: DirectionsProvider + ?Sized> DirectionsProvider for &T {
    fn fetch_directions(
        &self,
        coordinates: &[Coordinate],
        include_traffic: bool,
    ) -> Result<RawDirections, ProviderError> {
        (**self).fetch_directions(coordinates, include_traffic)
    }
}
