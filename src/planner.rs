//! End-to-end planning: geocode, order, evaluate.

use jiff::civil::Time;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::directions::DirectionsClient;
use crate::error::PlanError;
use crate::geocoder::Geocoder;
use crate::model::{Coordinate, Stop, StopCategory, TimeWindow};
use crate::route::RouteResult;
use crate::solver::{compute_schedule, EstimatedArrival, RouteOptimizer, SolveOptions};
use crate::traits::{DirectionsProvider, DistanceMatrixProvider, DurationMatrix, GeocodingProvider};

/// Label used for the caller's live position.
pub const CURRENT_LOCATION_LABEL: &str = "Current location";

/// One destination as entered by the courier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    #[serde(default)]
    pub category: StopCategory,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub service_minutes: Option<u32>,
}

impl DeliveryAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            category: StopCategory::default(),
            time_window: None,
            service_minutes: None,
        }
    }

    fn into_stop(self, coordinate: Coordinate) -> Stop {
        let mut stop = Stop::new(coordinate).with_category(self.category);
        stop.time_window = self.time_window;
        if let Some(minutes) = self.service_minutes {
            stop.service_minutes = minutes;
        }
        stop
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Live position; becomes the pinned origin when present.
    #[serde(default)]
    pub current_location: Option<Coordinate>,
    pub addresses: Vec<DeliveryAddress>,
    #[serde(default = "default_include_traffic")]
    pub include_traffic: bool,
    /// Overrides the planner's configured departure time.
    #[serde(default)]
    pub departure: Option<Time>,
}

fn default_include_traffic() -> bool {
    true
}

/// A stop together with its display address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStop {
    pub address: String,
    pub stop: Stop,
}

/// Stops in visiting order plus the evaluated route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub stops: Vec<PlannedStop>,
    pub route: RouteResult,
    /// `stop_index` refers to positions in `stops`.
    pub arrivals: Vec<EstimatedArrival>,
}

#[derive(Debug, Clone)]
pub struct RoutePlanner<G, M, P> {
    geocoder: Geocoder<G>,
    matrix_provider: M,
    directions_provider: P,
    options: SolveOptions,
}

impl<G, M, P> RoutePlanner<G, M, P>
where
    G: GeocodingProvider + Sync,
    M: DistanceMatrixProvider,
    P: DirectionsProvider,
{
    pub fn new(geocoding: G, matrix_provider: M, directions_provider: P, options: SolveOptions) -> Self {
        Self {
            geocoder: Geocoder::new(geocoding),
            matrix_provider,
            directions_provider,
            options,
        }
    }

    fn optimizer(&self, options: SolveOptions) -> RouteOptimizer<&M, &P> {
        RouteOptimizer::new(
            &self.matrix_provider,
            DirectionsClient::new(&self.directions_provider),
            options,
        )
    }

    /// Geocodes the request's addresses, orders them and evaluates the route.
    pub fn plan(&self, request: PlanRequest) -> Result<PlannedRoute, PlanError> {
        let minimum = if request.current_location.is_some() { 1 } else { 2 };
        if request.addresses.len() < minimum {
            return Err(PlanError::Infeasible(format!(
                "need at least {minimum} address(es) to plan a route, got {}",
                request.addresses.len()
            )));
        }

        let queries: Vec<&str> = request
            .addresses
            .iter()
            .map(|entry| entry.address.as_str())
            .collect();
        let resolved = self.geocoder.resolve_all(&queries)?;

        let mut planned = Vec::with_capacity(resolved.len() + 1);
        if let Some(here) = request.current_location {
            planned.push(PlannedStop {
                address: CURRENT_LOCATION_LABEL.to_string(),
                stop: Stop::current_location(here),
            });
        }
        planned.extend(
            request
                .addresses
                .into_iter()
                .zip(resolved)
                .map(|(entry, hit)| PlannedStop {
                    address: hit.formatted_address,
                    stop: entry.into_stop(hit.coordinate),
                }),
        );

        let mut options = self.options.clone();
        options.include_traffic = request.include_traffic;
        if let Some(departure) = request.departure {
            options.departure = departure;
        }

        let stops: Vec<Stop> = planned.iter().map(|entry| entry.stop.clone()).collect();
        let optimized = self
            .optimizer(options)
            .optimize(&stops, request.current_location.is_some())?;

        let mut slots: Vec<Option<PlannedStop>> = planned.into_iter().map(Some).collect();
        let ordered: Vec<PlannedStop> = optimized
            .order
            .iter()
            .filter_map(|&index| slots[index].take())
            .collect();
        let arrivals = renumber(optimized.arrivals);

        info!(
            stops = ordered.len(),
            duration = %optimized.route.total_duration_text,
            distance_m = optimized.route.total_distance_m,
            "planned route"
        );

        Ok(PlannedRoute {
            stops: ordered,
            route: optimized.route,
            arrivals,
        })
    }

    /// Re-evaluates a saved route in its saved order.
    ///
    /// Makes one directions request; arrivals come from its leg durations.
    pub fn reload(&self, stops: Vec<PlannedStop>, include_traffic: bool) -> Result<PlannedRoute, PlanError> {
        if stops.len() < 2 {
            return Err(PlanError::Infeasible(format!(
                "a saved route needs at least two stops, got {}",
                stops.len()
            )));
        }

        let coordinates: Vec<Coordinate> = stops.iter().map(|entry| entry.stop.coordinate).collect();
        let route = DirectionsClient::new(&self.directions_provider)
            .directions(&coordinates, include_traffic)?;

        let plain: Vec<Stop> = stops.iter().map(|entry| entry.stop.clone()).collect();
        let origin_pinned = plain[0].category == StopCategory::CurrentLocation;
        let order: Vec<usize> = (0..plain.len()).collect();
        let arrivals = compute_schedule(&order, &plain, &leg_matrix(&route), origin_pinned, &self.options)
            .map(|schedule| schedule.arrivals)
            .unwrap_or_default();

        Ok(PlannedRoute {
            stops,
            route,
            arrivals,
        })
    }

    /// Directions from the courier's position to a single target.
    pub fn navigate(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, PlanError> {
        Ok(DirectionsClient::new(&self.directions_provider).directions(&[from, to], true)?)
    }
}

/// Matrix holding only the evaluated legs of `route`.
fn leg_matrix(route: &RouteResult) -> DurationMatrix {
    let size = route.coordinates.len();
    let mut matrix = vec![vec![None; size]; size];
    for segment in &route.segments {
        if let Some(cell) = matrix
            .get_mut(segment.start_index)
            .and_then(|row| row.get_mut(segment.end_index))
        {
            *cell = Some(segment.duration_s.round() as i32);
        }
    }
    matrix
}

fn renumber(arrivals: Vec<EstimatedArrival>) -> Vec<EstimatedArrival> {
    arrivals
        .into_iter()
        .enumerate()
        .map(|(position, arrival)| EstimatedArrival {
            stop_index: position,
            ..arrival
        })
        .collect()
}
