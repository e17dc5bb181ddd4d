//! Stops and coordinates fed into the planner.

use std::fmt;

use jiff::civil::Time;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default service time at a delivery stop, in minutes.
pub const DEFAULT_SERVICE_MINUTES: u32 = 10;

/// Service time at the caller's live position, in minutes.
pub const CURRENT_LOCATION_SERVICE_MINUTES: u32 = 5;

/// WGS84 point, serialized as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both components are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coordinate: Coordinate) -> Self {
        [coordinate.lon, coordinate.lat]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lon, self.lat)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCategory {
    #[default]
    Home,
    Office,
    Business,
    PickupPoint,
    Other,
    CurrentLocation,
}

/// Delivery window as clock times without a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Time,
    pub end: Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time window: {0}")]
pub struct InvalidTimeWindow(pub String);

impl TimeWindow {
    pub fn new(start: Time, end: Time) -> Result<Self, InvalidTimeWindow> {
        if start > end {
            return Err(InvalidTimeWindow(format!("{start} is after {end}")));
        }
        Ok(Self { start, end })
    }

    /// Parses `HH:MM` bounds as entered in the delivery form.
    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidTimeWindow> {
        let parse = |value: &str| {
            Time::strptime("%H:%M", value.trim())
                .map_err(|err| InvalidTimeWindow(format!("{value:?}: {err}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// Window bounds in seconds from midnight.
    pub fn as_seconds(&self) -> (i32, i32) {
        (seconds_from_midnight(self.start), seconds_from_midnight(self.end))
    }
}

pub fn seconds_from_midnight(time: Time) -> i32 {
    i32::from(time.hour()) * 3600 + i32::from(time.minute()) * 60 + i32::from(time.second())
}

/// A point to visit with its scheduling metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub category: StopCategory,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default = "default_service_minutes")]
    pub service_minutes: u32,
}

fn default_service_minutes() -> u32 {
    DEFAULT_SERVICE_MINUTES
}

impl Stop {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            category: StopCategory::default(),
            time_window: None,
            service_minutes: DEFAULT_SERVICE_MINUTES,
        }
    }

    /// Pseudo-stop for the caller's live position.
    pub fn current_location(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            category: StopCategory::CurrentLocation,
            time_window: None,
            service_minutes: CURRENT_LOCATION_SERVICE_MINUTES,
        }
    }

    pub fn with_category(mut self, category: StopCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn with_service_minutes(mut self, minutes: u32) -> Self {
        self.service_minutes = minutes;
        self
    }

    pub fn service_seconds(&self) -> i32 {
        i32::try_from(self.service_minutes.saturating_mul(60)).unwrap_or(i32::MAX)
    }
}
