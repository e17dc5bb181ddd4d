//! Directions evaluation and reply normalization.

use jiff::Timestamp;
use tracing::debug;

use crate::error::ProviderError;
use crate::model::Coordinate;
use crate::polyline::Polyline;
use crate::route::{
    format_delay, format_duration, RouteResult, RouteTraffic, Segment, SegmentTraffic,
    TrafficCondition, TrafficLevel,
};
use crate::traits::{DirectionsProvider, RawDirections, RawLeg};

/// Evaluates ordered coordinate lists into [`RouteResult`]s.
#[derive(Debug, Clone)]
pub struct DirectionsClient<P> {
    provider: P,
}

impl<P: DirectionsProvider> DirectionsClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// One provider request for the whole path, normalized.
    pub fn directions(
        &self,
        coordinates: &[Coordinate],
        include_traffic: bool,
    ) -> Result<RouteResult, ProviderError> {
        if coordinates.len() < 2 {
            return Err(ProviderError::InvalidRequest(format!(
                "directions need at least two coordinates, got {}",
                coordinates.len()
            )));
        }

        let raw = self.provider.fetch_directions(coordinates, include_traffic)?;
        let route = normalize(coordinates, raw, include_traffic, Timestamp::now())?;

        debug!(
            stops = coordinates.len(),
            duration_s = route.total_duration_s,
            distance_m = route.total_distance_m,
            "evaluated directions"
        );

        Ok(route)
    }
}

/// Turns a provider reply into a [`RouteResult`] stamped with `evaluated_at`.
pub fn normalize(
    coordinates: &[Coordinate],
    raw: RawDirections,
    include_traffic: bool,
    evaluated_at: Timestamp,
) -> Result<RouteResult, ProviderError> {
    if coordinates.len() < 2 {
        return Err(ProviderError::InvalidRequest(format!(
            "directions need at least two coordinates, got {}",
            coordinates.len()
        )));
    }
    if raw.legs.is_empty() {
        return Err(ProviderError::EmptyRoute);
    }
    if raw.legs.len() + 1 != coordinates.len() {
        return Err(ProviderError::Malformed(format!(
            "expected {} legs for {} stops, got {}",
            coordinates.len() - 1,
            coordinates.len(),
            raw.legs.len()
        )));
    }

    let mut segments = Vec::with_capacity(raw.legs.len());
    let mut has_traffic_data = false;

    for (index, leg) in raw.legs.into_iter().enumerate() {
        validate_leg(index, &leg)?;

        let RawLeg {
            distance_m,
            duration_s,
            free_flow_duration_s,
            geometry,
        } = leg;

        let geometry = if geometry.is_empty() {
            Polyline::straight(coordinates[index], coordinates[index + 1])
        } else {
            geometry
        };

        let traffic = match free_flow_duration_s {
            Some(free_flow) if include_traffic => {
                has_traffic_data = true;
                Some(SegmentTraffic {
                    level: TrafficLevel::from_ratio(duration_s, free_flow),
                    delay_s: (duration_s - free_flow).max(0.0),
                })
            }
            _ => None,
        };

        segments.push(Segment {
            start_index: index,
            end_index: index + 1,
            geometry,
            duration_s,
            distance_m,
            traffic,
        });
    }

    let total_duration_s: f64 = segments.iter().map(|segment| segment.duration_s).sum();
    let total_distance_m: f64 = segments.iter().map(|segment| segment.distance_m).sum();

    let traffic = include_traffic.then(|| summarize_traffic(&segments, has_traffic_data));

    Ok(RouteResult {
        coordinates: coordinates.to_vec(),
        segments,
        total_duration_s,
        total_duration_text: format_duration(total_duration_s),
        total_distance_m,
        traffic,
        last_evaluated_at: evaluated_at,
    })
}

fn validate_leg(index: usize, leg: &RawLeg) -> Result<(), ProviderError> {
    let valid = |value: f64| value.is_finite() && value >= 0.0;
    if !valid(leg.distance_m) || !valid(leg.duration_s) {
        return Err(ProviderError::Malformed(format!(
            "leg {index} has invalid distance {} or duration {}",
            leg.distance_m, leg.duration_s
        )));
    }
    if let Some(free_flow) = leg.free_flow_duration_s {
        if !valid(free_flow) {
            return Err(ProviderError::Malformed(format!(
                "leg {index} has invalid free-flow duration {free_flow}"
            )));
        }
    }
    Ok(())
}

fn summarize_traffic(segments: &[Segment], has_traffic_data: bool) -> RouteTraffic {
    let conditions: Vec<TrafficCondition> = segments
        .iter()
        .enumerate()
        .filter_map(|(index, segment)| {
            segment.traffic.map(|traffic| TrafficCondition {
                segment: index,
                level: traffic.level,
                delay_s: traffic.delay_s,
            })
        })
        .collect();

    let delay_s: f64 = conditions.iter().map(|condition| condition.delay_s).sum();
    let delay_text = if has_traffic_data {
        format_delay(delay_s)
    } else {
        "No traffic data".to_string()
    };

    RouteTraffic {
        has_traffic_data,
        delay_s,
        delay_text,
        conditions,
    }
}
