//! Pull-based traffic staleness monitor.
//!
//! A [`RouteResult`] is `Fresh` until its last evaluation is older than the
//! staleness threshold. Checking a stale (or force-checked) route re-evaluates
//! the same coordinate order and reports whether the caller's copy should be
//! replaced. There are no timers here: the caller decides when to check.

use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::directions::DirectionsClient;
use crate::error::ProviderError;
use crate::route::{RouteResult, TrafficLevel};
use crate::traits::DirectionsProvider;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrafficMonitorConfig {
    /// Age after which a route is considered stale.
    pub staleness: Duration,
    /// Duration changes at or below this are ignored.
    pub duration_tolerance: Duration,
}

impl Default for TrafficMonitorConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(120),
            duration_tolerance: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Outcome of a traffic check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficAssessment {
    pub needs_update: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_route: Option<RouteResult>,
    /// When the route was last evaluated after this check.
    pub evaluated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct TrafficMonitor<P> {
    directions: DirectionsClient<P>,
    config: TrafficMonitorConfig,
}

impl<P: DirectionsProvider> TrafficMonitor<P> {
    pub fn new(directions: DirectionsClient<P>, config: TrafficMonitorConfig) -> Self {
        Self { directions, config }
    }

    /// A route evaluated in the future (clock skew) counts as fresh.
    pub fn freshness(&self, route: &RouteResult, now: Timestamp) -> Freshness {
        let age = now.duration_since(route.last_evaluated_at);
        let staleness = SignedDuration::try_from(self.config.staleness).unwrap_or(SignedDuration::MAX);
        if age > staleness {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// [`TrafficMonitor::check`] at the current time.
    pub fn check_now(
        &self,
        route: &mut RouteResult,
        force: bool,
    ) -> Result<TrafficAssessment, ProviderError> {
        self.check(route, force, Timestamp::now())
    }

    /// Rechecks `route` if it is stale or `force` is set.
    ///
    /// On a material change `route` is replaced and the replacement is also
    /// returned. Otherwise only its evaluation time is advanced. On error
    /// `route` is left untouched.
    pub fn check(
        &self,
        route: &mut RouteResult,
        force: bool,
        now: Timestamp,
    ) -> Result<TrafficAssessment, ProviderError> {
        if !force && self.freshness(route, now) == Freshness::Fresh {
            return Ok(TrafficAssessment {
                needs_update: false,
                reason: "route is fresh".to_string(),
                new_route: None,
                evaluated_at: route.last_evaluated_at,
            });
        }

        // Recheck with the same annotations the route was evaluated with.
        let include_traffic = route.traffic.is_some();
        debug!(force, include_traffic, "checking route for traffic changes");
        let mut fresh = self.directions.directions(&route.coordinates, include_traffic)?;
        fresh.last_evaluated_at = route.last_evaluated_at.max(now);

        match self.material_change(route, &fresh) {
            Some(reason) => {
                info!(%reason, "traffic changed, replacing route");
                *route = fresh.clone();
                Ok(TrafficAssessment {
                    needs_update: true,
                    reason,
                    evaluated_at: fresh.last_evaluated_at,
                    new_route: Some(fresh),
                })
            }
            None => {
                route.mark_evaluated(now);
                Ok(TrafficAssessment {
                    needs_update: false,
                    reason: "traffic unchanged".to_string(),
                    new_route: None,
                    evaluated_at: route.last_evaluated_at,
                })
            }
        }
    }

    fn material_change(&self, old: &RouteResult, new: &RouteResult) -> Option<String> {
        let old_delay = old.traffic_delay_s();
        let new_delay = new.traffic_delay_s();
        if new_delay.round() != old_delay.round() {
            let verb = if new_delay > old_delay { "increased" } else { "decreased" };
            return Some(format!(
                "traffic delay {verb} from {} to {} min",
                (old_delay / 60.0).round(),
                (new_delay / 60.0).round()
            ));
        }

        if segment_levels(old) != segment_levels(new) {
            return Some("traffic conditions changed along the route".to_string());
        }

        let delta = new.total_duration_s - old.total_duration_s;
        if delta.abs() > self.config.duration_tolerance.as_secs_f64() {
            return Some(format!(
                "estimated duration changed from {} to {}",
                old.total_duration_text, new.total_duration_text
            ));
        }

        None
    }
}

fn segment_levels(route: &RouteResult) -> Vec<Option<TrafficLevel>> {
    route
        .segments
        .iter()
        .map(|segment| segment.traffic.map(|traffic| traffic.level))
        .collect()
}
