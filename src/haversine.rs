//! Haversine distance matrix provider (fallback when OSRM is unavailable).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than OSRM (ignores roads) but always available.

use rayon::prelude::*;

use crate::error::ProviderError;
use crate::model::Coordinate;
use crate::traits::{DistanceMatrixProvider, DurationMatrix};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Estimates travel time using straight-line distance and an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Convert distance in km to travel time in seconds.
    pub fn km_to_seconds(&self, km: f64) -> i32 {
        let hours = km / self.speed_kmh;
        (hours * 3600.0).round() as i32
    }

    /// Estimated travel time between two points in seconds.
    pub fn seconds_between(&self, from: Coordinate, to: Coordinate) -> i32 {
        self.km_to_seconds(haversine_km(from, to))
    }

    /// Builds the full matrix; rows are computed in parallel.
    pub fn matrix(&self, locations: &[Coordinate]) -> DurationMatrix {
        locations
            .par_iter()
            .enumerate()
            .map(|(i, from)| {
                locations
                    .iter()
                    .enumerate()
                    .map(|(j, to)| {
                        if i == j {
                            Some(0)
                        } else {
                            Some(self.seconds_between(*from, *to))
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError> {
        Ok(self.matrix(locations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let p = Coordinate::new(21.01, 52.23);
        assert!(haversine_km(p, p) < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Warsaw to Kraków, ~252 km great-circle
        let warsaw = Coordinate::new(21.0122, 52.2297);
        let krakow = Coordinate::new(19.9450, 50.0647);
        let dist = haversine_km(warsaw, krakow);
        assert!(dist > 240.0 && dist < 265.0, "WAW to KRK should be ~252km, got {}", dist);
    }

    #[test]
    fn test_matrix_diagonal_is_zero() {
        let provider = HaversineMatrix::default();
        let locations = vec![
            Coordinate::new(21.0, 52.2),
            Coordinate::new(21.1, 52.3),
            Coordinate::new(21.2, 52.1),
        ];
        let matrix = provider.matrix_for(&locations).unwrap();

        assert_eq!(matrix.len(), 3);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row[i], Some(0), "Diagonal should be zero");
        }
    }

    #[test]
    fn test_matrix_symmetric() {
        let provider = HaversineMatrix::default();
        let locations = vec![Coordinate::new(21.0, 52.2), Coordinate::new(21.1, 52.3)];
        let matrix = provider.matrix_for(&locations).unwrap();

        assert_eq!(matrix[0][1], matrix[1][0], "Matrix should be symmetric");
    }

    #[test]
    fn test_reasonable_travel_time() {
        let provider = HaversineMatrix::new(40.0);
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        assert_eq!(provider.km_to_seconds(10.0), 900);
    }
}
