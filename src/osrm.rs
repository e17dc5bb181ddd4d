//! OSRM HTTP adapter for duration matrices and multi-stop directions.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::model::Coordinate;
use crate::polyline::Polyline;
use crate::traits::{DirectionsProvider, DistanceMatrixProvider, DurationMatrix, RawDirections, RawLeg};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    /// Speed used to derive a free-flow baseline for traffic annotations.
    ///
    /// OSRM reports a single duration per leg; when this is set and traffic is
    /// requested, each leg's baseline is `distance / free_flow_speed_kmh`.
    pub free_flow_speed_kmh: Option<f64>,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
            free_flow_speed_kmh: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn service_url(&self, service: &str, locations: &[Coordinate]) -> String {
        let coords = locations
            .iter()
            .map(Coordinate::to_string)
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/{}/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            service,
            self.config.profile,
            coords
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self.client.get(url).send()?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status.is_server_error() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        // OSRM reports routing failures as 400 with a JSON `code`, so the body
        // is decoded before the status is judged.
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|err| {
            if status.is_success() {
                ProviderError::Malformed(err.to_string())
            } else {
                ProviderError::Http {
                    status: status.as_u16(),
                }
            }
        })
    }

    fn free_flow_duration(&self, distance_m: f64) -> Option<f64> {
        self.config
            .free_flow_speed_kmh
            .filter(|speed| *speed > 0.0)
            .map(|speed| distance_m / 1000.0 / speed * 3600.0)
    }
}

impl DistanceMatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<DurationMatrix, ProviderError> {
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}?annotations=duration",
            self.service_url("table", locations)
        );
        debug!(locations = locations.len(), "requesting OSRM table");

        let body: OsrmTableResponse = self.get_json(&url)?;
        check_code(&body.code, body.message.as_deref())?;

        let durations = body
            .durations
            .ok_or_else(|| ProviderError::Malformed("table response without durations".into()))?;

        if durations.len() != locations.len()
            || durations.iter().any(|row| row.len() != locations.len())
        {
            return Err(ProviderError::Malformed(format!(
                "table is not {0}x{0}",
                locations.len()
            )));
        }

        Ok(durations
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| value.map(|seconds| seconds.round() as i32))
                    .collect()
            })
            .collect())
    }
}

impl DirectionsProvider for OsrmClient {
    fn fetch_directions(
        &self,
        coordinates: &[Coordinate],
        include_traffic: bool,
    ) -> Result<RawDirections, ProviderError> {
        let url = format!(
            "{}?overview=false&steps=true&geometries=geojson",
            self.service_url("route", coordinates)
        );
        debug!(stops = coordinates.len(), include_traffic, "requesting OSRM route");

        let body: OsrmRouteResponse = self.get_json(&url)?;
        check_code(&body.code, body.message.as_deref())?;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyRoute)?;

        if include_traffic && self.config.free_flow_speed_kmh.is_none() {
            warn!("traffic requested but no free-flow baseline is configured");
        }

        let legs = route
            .legs
            .into_iter()
            .map(|leg| {
                let pieces: Vec<Polyline> = leg
                    .steps
                    .into_iter()
                    .map(|step| Polyline::new(step.geometry.coordinates))
                    .collect();
                RawLeg {
                    free_flow_duration_s: if include_traffic {
                        self.free_flow_duration(leg.distance)
                    } else {
                        None
                    },
                    distance_m: leg.distance,
                    duration_s: leg.duration,
                    geometry: Polyline::join(&pieces),
                }
            })
            .collect();

        Ok(RawDirections { legs })
    }
}

fn check_code(code: &str, message: Option<&str>) -> Result<(), ProviderError> {
    match code {
        "Ok" => Ok(()),
        "NoRoute" | "NoSegment" => Err(ProviderError::NoRoute(
            message.unwrap_or(code).to_string(),
        )),
        _ => Err(ProviderError::Rejected {
            code: code.to_string(),
            message: message.unwrap_or_default().to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<Coordinate>,
}
