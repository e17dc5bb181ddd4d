//! Normalized route output.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::Coordinate;
use crate::polyline::Polyline;

/// Coarse traffic severity for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    FreeFlow,
    Light,
    Moderate,
    Heavy,
}

impl TrafficLevel {
    /// Classifies a leg by how much slower it is than free flow.
    pub fn from_ratio(duration_s: f64, free_flow_s: f64) -> Self {
        if free_flow_s <= 0.0 {
            return TrafficLevel::FreeFlow;
        }
        let ratio = duration_s / free_flow_s;
        if ratio < 1.10 {
            TrafficLevel::FreeFlow
        } else if ratio < 1.25 {
            TrafficLevel::Light
        } else if ratio < 1.50 {
            TrafficLevel::Moderate
        } else {
            TrafficLevel::Heavy
        }
    }

    pub fn severity(self) -> u8 {
        match self {
            TrafficLevel::FreeFlow => 0,
            TrafficLevel::Light => 1,
            TrafficLevel::Moderate => 2,
            TrafficLevel::Heavy => 3,
        }
    }

    /// Map color used by the route display.
    pub fn color(self) -> &'static str {
        match self {
            TrafficLevel::FreeFlow => "green",
            TrafficLevel::Light => "yellow",
            TrafficLevel::Moderate => "orange",
            TrafficLevel::Heavy => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentTraffic {
    pub level: TrafficLevel,
    pub delay_s: f64,
}

/// One leg between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_index: usize,
    pub end_index: usize,
    pub geometry: Polyline,
    pub duration_s: f64,
    pub distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<SegmentTraffic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficCondition {
    pub segment: usize,
    pub level: TrafficLevel,
    pub delay_s: f64,
}

/// Route-wide traffic annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTraffic {
    pub has_traffic_data: bool,
    pub delay_s: f64,
    pub delay_text: String,
    pub conditions: Vec<TrafficCondition>,
}

/// A fully evaluated multi-stop route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub coordinates: Vec<Coordinate>,
    pub segments: Vec<Segment>,
    pub total_duration_s: f64,
    pub total_duration_text: String,
    pub total_distance_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<RouteTraffic>,
    pub last_evaluated_at: Timestamp,
}

impl RouteResult {
    pub fn total_duration_seconds(&self) -> u64 {
        self.total_duration_s.max(0.0).round() as u64
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_m / 1000.0
    }

    /// Total traffic delay, zero when no traffic data was requested.
    pub fn traffic_delay_s(&self) -> f64 {
        self.traffic.as_ref().map_or(0.0, |traffic| traffic.delay_s)
    }

    /// Full path, segment geometries joined at shared endpoints.
    pub fn geometry(&self) -> Polyline {
        Polyline::join(self.segments.iter().map(|segment| &segment.geometry))
    }

    /// Advances `last_evaluated_at`, never moving it backwards.
    pub fn mark_evaluated(&mut self, at: Timestamp) {
        if at > self.last_evaluated_at {
            self.last_evaluated_at = at;
        }
    }
}

/// Formats seconds like "1 h 5 min" or "12 min".
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as u64;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours} h {minutes} min")
    } else {
        format!("{minutes} min")
    }
}

/// Formats a traffic delay for display.
pub fn format_delay(delay_s: f64) -> String {
    if delay_s < 60.0 {
        "No delays".to_string()
    } else {
        format!("+{} min traffic delay", (delay_s / 60.0).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_level_thresholds() {
        assert_eq!(TrafficLevel::from_ratio(100.0, 100.0), TrafficLevel::FreeFlow);
        assert_eq!(TrafficLevel::from_ratio(115.0, 100.0), TrafficLevel::Light);
        assert_eq!(TrafficLevel::from_ratio(130.0, 100.0), TrafficLevel::Moderate);
        assert_eq!(TrafficLevel::from_ratio(200.0, 100.0), TrafficLevel::Heavy);
        assert_eq!(TrafficLevel::from_ratio(50.0, 0.0), TrafficLevel::FreeFlow);
    }

    #[test]
    fn traffic_level_display_values() {
        assert_eq!(TrafficLevel::Heavy.severity(), 3);
        assert_eq!(TrafficLevel::Light.color(), "yellow");
        assert_eq!(
            serde_json::to_string(&TrafficLevel::FreeFlow).unwrap(),
            "\"free_flow\""
        );
    }

    fn route_lasting(total_duration_s: f64) -> RouteResult {
        RouteResult {
            coordinates: Vec::new(),
            segments: Vec::new(),
            total_duration_s,
            total_duration_text: format_duration(total_duration_s),
            total_distance_m: 1500.0,
            traffic: None,
            last_evaluated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn whole_second_duration() {
        assert_eq!(route_lasting(719.4).total_duration_seconds(), 719);
        assert_eq!(route_lasting(719.5).total_duration_seconds(), 720);
        assert_eq!(route_lasting(-3.0).total_duration_seconds(), 0);
        assert_eq!(route_lasting(0.0).total_distance_km(), 1.5);
    }

    #[test]
    fn evaluation_mark_only_moves_forward() {
        let mut route = route_lasting(60.0);
        let later = Timestamp::from_second(1_000).unwrap();
        route.mark_evaluated(later);
        route.mark_evaluated(Timestamp::UNIX_EPOCH);
        assert_eq!(route.last_evaluated_at, later);
    }

    #[test]
    fn duration_text() {
        assert_eq!(format_duration(0.0), "0 min");
        assert_eq!(format_duration(721.0), "12 min");
        assert_eq!(format_duration(3900.0), "1 h 5 min");
    }

    #[test]
    fn delay_text() {
        assert_eq!(format_delay(0.0), "No delays");
        assert_eq!(format_delay(59.0), "No delays");
        assert_eq!(format_delay(420.0), "+7 min traffic delay");
    }
}
