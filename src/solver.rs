//! Route ordering: nearest-neighbor construction plus local search.

use jiff::civil::Time;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directions::DirectionsClient;
use crate::error::{PlanError, ProviderError};
use crate::haversine::HaversineMatrix;
use crate::model::{seconds_from_midnight, Coordinate, Stop};
use crate::route::RouteResult;
use crate::traits::{DirectionsProvider, DistanceMatrixProvider, DurationMatrix};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Clock time the courier leaves the origin.
    pub departure: Time,
    /// Penalty per second of lateness against a stop's time window.
    pub lateness_weight: i64,
    /// Maximum iterations for local search improvement.
    pub local_search_iterations: usize,
    /// Request traffic annotations for the final evaluation.
    pub include_traffic: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            departure: Time::constant(8, 0, 0, 0),
            lateness_weight: 10,
            local_search_iterations: 100,
            include_traffic: true,
        }
    }
}

/// Estimated timing at one visited stop, seconds from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedArrival {
    /// Index into the stop list passed to the optimizer.
    pub stop_index: usize,
    pub arrival_secs: i32,
    pub departure_secs: i32,
    /// Seconds past the end of the stop's window, zero when on time.
    pub late_by_secs: i32,
}

/// A visiting order scored against a duration matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub order: Vec<usize>,
    pub cost: i64,
    pub travel_secs: i64,
    pub lateness_secs: i64,
    pub arrivals: Vec<EstimatedArrival>,
}

/// Output of [`RouteOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    /// Visiting order as indices into the input stops; `order[0] == 0`.
    pub order: Vec<usize>,
    pub route: RouteResult,
    pub arrivals: Vec<EstimatedArrival>,
}

#[derive(Debug, Clone)]
pub struct RouteOptimizer<M, P> {
    matrix_provider: M,
    directions: DirectionsClient<P>,
    fallback: HaversineMatrix,
    options: SolveOptions,
}

impl<M, P> RouteOptimizer<M, P>
where
    M: DistanceMatrixProvider,
    P: DirectionsProvider,
{
    pub fn new(matrix_provider: M, directions: DirectionsClient<P>, options: SolveOptions) -> Self {
        Self {
            matrix_provider,
            directions,
            fallback: HaversineMatrix::default(),
            options,
        }
    }

    /// Orders `stops` (stop 0 stays first) and evaluates the order once
    /// through the directions provider.
    pub fn optimize(&self, stops: &[Stop], origin_pinned: bool) -> Result<OptimizedRoute, PlanError> {
        let schedule = self.plan_order(stops, origin_pinned)?;

        let ordered: Vec<Coordinate> = schedule
            .order
            .iter()
            .map(|&index| stops[index].coordinate)
            .collect();

        let route = self
            .directions
            .directions(&ordered, self.options.include_traffic)
            .map_err(|err| match err {
                ProviderError::NoRoute(reason) => {
                    PlanError::Infeasible(format!("no drivable route through all stops: {reason}"))
                }
                other => PlanError::Provider(other),
            })?;

        Ok(OptimizedRoute {
            order: schedule.order,
            route,
            arrivals: schedule.arrivals,
        })
    }

    /// Chooses the visiting order without calling the directions provider.
    pub fn plan_order(&self, stops: &[Stop], origin_pinned: bool) -> Result<Schedule, PlanError> {
        if stops.len() < 2 {
            return Err(PlanError::Infeasible(format!(
                "at least two stops are required, got {}",
                stops.len()
            )));
        }
        if let Some(index) = stops.iter().position(|stop| !stop.coordinate.is_valid()) {
            return Err(PlanError::Infeasible(format!(
                "stop {index} has an invalid coordinate"
            )));
        }

        let coordinates: Vec<Coordinate> = stops.iter().map(|stop| stop.coordinate).collect();
        let matrix = self.cost_matrix(&coordinates);
        let identity: Vec<usize> = (0..stops.len()).collect();
        let baseline = compute_schedule(&identity, stops, &matrix, origin_pinned, &self.options);

        if stops.len() == 2 {
            return Ok(baseline.unwrap_or_else(|| unscored(identity)));
        }

        let mut order = nearest_neighbor(stops, &matrix, origin_pinned, &self.options);
        let mut current = compute_schedule(&order, stops, &matrix, origin_pinned, &self.options);
        if let Some(schedule) = current.as_mut() {
            local_search(schedule, stops, &matrix, origin_pinned, &self.options);
            order = schedule.order.clone();
        }

        let chosen = match (current, baseline) {
            (Some(optimized), Some(baseline)) if baseline.cost <= optimized.cost => baseline,
            (Some(optimized), _) => optimized,
            (None, Some(baseline)) => baseline,
            (None, None) => {
                return Err(PlanError::Infeasible(
                    "some stops cannot be reached from the others".to_string(),
                ));
            }
        };

        debug!(
            stops = stops.len(),
            cost = chosen.cost,
            travel_secs = chosen.travel_secs,
            lateness_secs = chosen.lateness_secs,
            nearest_neighbor_order = ?order,
            "planned visiting order"
        );

        Ok(chosen)
    }

    /// Scores a fixed order, e.g. a saved route that must not be reordered.
    pub fn schedule_for(
        &self,
        stops: &[Stop],
        order: &[usize],
        origin_pinned: bool,
    ) -> Option<Schedule> {
        let coordinates: Vec<Coordinate> = stops.iter().map(|stop| stop.coordinate).collect();
        let matrix = self.cost_matrix(&coordinates);
        compute_schedule(order, stops, &matrix, origin_pinned, &self.options)
    }

    fn cost_matrix(&self, coordinates: &[Coordinate]) -> DurationMatrix {
        match self.matrix_provider.matrix_for(coordinates) {
            Ok(matrix) if is_square(&matrix, coordinates.len()) => matrix,
            Ok(_) => {
                warn!("duration matrix has the wrong shape, using haversine estimate");
                self.fallback.matrix(coordinates)
            }
            Err(err) => {
                warn!(error = %err, "duration matrix unavailable, using haversine estimate");
                self.fallback.matrix(coordinates)
            }
        }
    }
}

fn is_square(matrix: &DurationMatrix, size: usize) -> bool {
    matrix.len() == size && matrix.iter().all(|row| row.len() == size)
}

fn unscored(order: Vec<usize>) -> Schedule {
    Schedule {
        order,
        cost: 0,
        travel_secs: 0,
        lateness_secs: 0,
        arrivals: Vec::new(),
    }
}

/// Service start and lateness when arriving at `stop` at `arrival`.
///
/// Early arrivals wait for the window to open.
fn service_start(stop: &Stop, arrival: i32) -> (i32, i32) {
    match stop.time_window {
        Some(window) => {
            let (open, close) = window.as_seconds();
            let start = arrival.max(open);
            (start, (start - close).max(0))
        }
        None => (arrival, 0),
    }
}

fn origin_departure(stops: &[Stop], origin_pinned: bool, options: &SolveOptions) -> i32 {
    let departure = seconds_from_midnight(options.departure);
    if origin_pinned {
        departure
    } else {
        departure.saturating_add(stops[0].service_seconds())
    }
}

/// Scores a visiting order. `None` when a leg is unreachable.
pub fn compute_schedule(
    order: &[usize],
    stops: &[Stop],
    matrix: &DurationMatrix,
    origin_pinned: bool,
    options: &SolveOptions,
) -> Option<Schedule> {
    let first = *order.first()?;
    if order
        .iter()
        .any(|&index| index >= stops.len() || index >= matrix.len())
    {
        return None;
    }
    let mut time = origin_departure(stops, origin_pinned, options);
    let mut travel_total: i64 = 0;
    let mut lateness_total: i64 = 0;
    let mut arrivals = Vec::with_capacity(order.len());

    arrivals.push(EstimatedArrival {
        stop_index: first,
        arrival_secs: seconds_from_midnight(options.departure),
        departure_secs: time,
        late_by_secs: 0,
    });

    let mut previous = first;
    for &index in &order[1..] {
        let travel = (*matrix[previous].get(index)?)?;
        let arrival = time.saturating_add(travel);
        let (start, late) = service_start(&stops[index], arrival);
        time = start.saturating_add(stops[index].service_seconds());

        travel_total += i64::from(travel);
        lateness_total += i64::from(late);
        arrivals.push(EstimatedArrival {
            stop_index: index,
            arrival_secs: arrival,
            departure_secs: time,
            late_by_secs: late,
        });
        previous = index;
    }

    Some(Schedule {
        order: order.to_vec(),
        cost: travel_total + options.lateness_weight * lateness_total,
        travel_secs: travel_total,
        lateness_secs: lateness_total,
        arrivals,
    })
}

/// Greedy construction from the origin, window-aware.
///
/// Ties go to the lowest stop index. Stops unreachable from the current
/// position are appended in input order.
fn nearest_neighbor(
    stops: &[Stop],
    matrix: &DurationMatrix,
    origin_pinned: bool,
    options: &SolveOptions,
) -> Vec<usize> {
    let n = stops.len();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    visited[0] = true;
    order.push(0);

    let mut current = 0;
    let mut time = origin_departure(stops, origin_pinned, options);

    while order.len() < n {
        let mut best: Option<(i64, usize, i32)> = None;

        for candidate in 0..n {
            if visited[candidate] {
                continue;
            }
            let Some(travel) = matrix[current][candidate] else {
                continue;
            };
            let (start, late) = service_start(&stops[candidate], time.saturating_add(travel));
            let score = i64::from(travel) + options.lateness_weight * i64::from(late);
            if best.is_none_or(|(best_score, _, _)| score < best_score) {
                best = Some((score, candidate, start));
            }
        }

        match best {
            Some((_, next, start)) => {
                visited[next] = true;
                order.push(next);
                time = start.saturating_add(stops[next].service_seconds());
                current = next;
            }
            None => {
                order.extend((0..n).filter(|&index| !visited[index]));
                break;
            }
        }
    }

    order
}

/// 2-opt: reverse a run of stops (never the origin).
/// Returns true if an improvement was made.
fn two_opt_improve(
    schedule: &mut Schedule,
    stops: &[Stop],
    matrix: &DurationMatrix,
    origin_pinned: bool,
    options: &SolveOptions,
) -> bool {
    let n = schedule.order.len();
    if n < 3 {
        return false;
    }

    for i in 1..n - 1 {
        for j in i + 1..n {
            let mut candidate = schedule.order.clone();
            candidate[i..=j].reverse();

            if let Some(better) = compute_schedule(&candidate, stops, matrix, origin_pinned, options)
            {
                if better.cost < schedule.cost {
                    *schedule = better;
                    return true;
                }
            }
        }
    }

    false
}

/// Relocate: move one stop to another position (never before the origin).
/// Returns true if an improvement was made.
fn relocate_improve(
    schedule: &mut Schedule,
    stops: &[Stop],
    matrix: &DurationMatrix,
    origin_pinned: bool,
    options: &SolveOptions,
) -> bool {
    let n = schedule.order.len();
    if n < 3 {
        return false;
    }

    for from in 1..n {
        for to in 1..n {
            if from == to {
                continue;
            }

            let mut candidate = schedule.order.clone();
            let stop = candidate.remove(from);
            candidate.insert(to, stop);

            if let Some(better) = compute_schedule(&candidate, stops, matrix, origin_pinned, options)
            {
                if better.cost < schedule.cost {
                    *schedule = better;
                    return true;
                }
            }
        }
    }

    false
}

/// Run local search improvement until no more improvements or max iterations reached.
fn local_search(
    schedule: &mut Schedule,
    stops: &[Stop],
    matrix: &DurationMatrix,
    origin_pinned: bool,
    options: &SolveOptions,
) {
    for _ in 0..options.local_search_iterations {
        let improved = two_opt_improve(schedule, stops, matrix, origin_pinned, options)
            || relocate_improve(schedule, stops, matrix, origin_pinned, options);

        if !improved {
            break;
        }
    }
}
