//! Deterministic in-memory providers.
//!
//! `StubProvider` geocodes from a fixed table and builds directions from
//! straight-line distance at a constant free-flow speed, scaled by an
//! adjustable traffic factor. `FixedMatrix` serves a hand-written matrix.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use courier_route::haversine::haversine_km;
use courier_route::polyline::Polyline;
use courier_route::traits::{
    DirectionsProvider, DistanceMatrixProvider, DurationMatrix, GeocodeMatch, GeocodingProvider,
    RawDirections, RawLeg,
};
use courier_route::{Coordinate, ProviderError};

use super::warsaw_locations::{DELIVERIES, DEPOT, Location};

/// Free-flow speed used for stub directions.
pub const STUB_SPEED_KMH: f64 = 36.0;

pub struct StubProvider {
    places: HashMap<String, Coordinate>,
    traffic_factor: Mutex<f64>,
    failure: Mutex<Option<ProviderError>>,
    directions_calls: AtomicUsize,
    geocode_calls: AtomicUsize,
    matrix_calls: AtomicUsize,
    report_free_flow: AtomicBool,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            places: HashMap::new(),
            traffic_factor: Mutex::new(1.0),
            failure: Mutex::new(None),
            directions_calls: AtomicUsize::new(0),
            geocode_calls: AtomicUsize::new(0),
            matrix_calls: AtomicUsize::new(0),
            report_free_flow: AtomicBool::new(true),
        }
    }

    /// Stub preloaded with the depot and every Warsaw delivery address.
    pub fn warsaw() -> Self {
        let mut stub = Self::new();
        stub.add_location(&DEPOT);
        for location in DELIVERIES {
            stub.add_location(location);
        }
        stub
    }

    pub fn add_location(&mut self, location: &Location) {
        self.add_place(location.address, location.coordinate());
    }

    pub fn add_place(&mut self, address: &str, coordinate: Coordinate) {
        self.places.insert(address.to_string(), coordinate);
    }

    /// Multiplies every leg's duration; 1.0 means free flow.
    pub fn set_traffic_factor(&self, factor: f64) {
        *self.traffic_factor.lock().unwrap() = factor;
    }

    /// Makes every directions request fail with `error` until cleared.
    pub fn fail_with(&self, error: Option<ProviderError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn set_report_free_flow(&self, report: bool) {
        self.report_free_flow.store(report, Ordering::SeqCst);
    }

    pub fn directions_calls(&self) -> usize {
        self.directions_calls.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn matrix_calls(&self) -> usize {
        self.matrix_calls.load(Ordering::SeqCst)
    }

    pub fn free_flow_seconds(from: Coordinate, to: Coordinate) -> f64 {
        haversine_km(from, to) / STUB_SPEED_KMH * 3600.0
    }
}

impl GeocodingProvider for StubProvider {
    fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>, ProviderError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.places.get(address).map(|&coordinate| GeocodeMatch {
            coordinate,
            formatted_address: format!("{address}, Polska"),
        }))
    }
}

impl DirectionsProvider for StubProvider {
    fn fetch_directions(
        &self,
        coordinates: &[Coordinate],
        include_traffic: bool,
    ) -> Result<RawDirections, ProviderError> {
        self.directions_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }

        let factor = *self.traffic_factor.lock().unwrap();
        let report = include_traffic && self.report_free_flow.load(Ordering::SeqCst);
        let legs = coordinates
            .windows(2)
            .map(|pair| {
                let free_flow = Self::free_flow_seconds(pair[0], pair[1]);
                RawLeg {
                    distance_m: haversine_km(pair[0], pair[1]) * 1000.0,
                    duration_s: free_flow * factor,
                    free_flow_duration_s: report.then_some(free_flow),
                    geometry: Polyline::new(vec![pair[0], pair[1]]),
                }
            })
            .collect();
        Ok(RawDirections { legs })
    }
}

impl DistanceMatrixProvider for StubProvider {
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        Ok(locations
            .iter()
            .map(|&from| {
                locations
                    .iter()
                    .map(|&to| Some(Self::free_flow_seconds(from, to).round() as i32))
                    .collect()
            })
            .collect())
    }
}

/// Serves a fixed matrix regardless of the requested locations.
pub struct FixedMatrix {
    pub matrix: DurationMatrix,
    pub calls: AtomicUsize,
}

impl FixedMatrix {
    pub fn new(matrix: DurationMatrix) -> Self {
        Self {
            matrix,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fully connected matrix from whole-second rows.
    pub fn from_rows(rows: &[&[i32]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().copied().map(Some).collect())
                .collect(),
        )
    }
}

impl DistanceMatrixProvider for FixedMatrix {
    fn matrix_for(&self, _locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matrix.clone())
    }
}

/// Matrix provider that always fails.
pub struct FailingMatrix;

impl DistanceMatrixProvider for FailingMatrix {
    fn matrix_for(&self, _locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError> {
        Err(ProviderError::Timeout)
    }
}
