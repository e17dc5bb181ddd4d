//! courier-route core
//!
//! Multi-stop delivery route planning: address resolution, visiting order
//! optimization, directions normalization and traffic rechecks.

pub mod config;
pub mod directions;
pub mod error;
pub mod geocoder;
pub mod haversine;
pub mod model;
pub mod nominatim;
pub mod osrm;
pub mod planner;
pub mod polyline;
pub mod route;
pub mod solver;
pub mod traffic;
pub mod traits;

pub use error::{PlanError, ProviderError};
pub use model::{Coordinate, Stop, StopCategory, TimeWindow};
pub use route::{RouteResult, Segment, TrafficLevel};
