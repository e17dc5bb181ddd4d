//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use crate::nominatim::NominatimConfig;
use crate::osrm::OsrmConfig;
use crate::traffic::TrafficMonitorConfig;

pub const OSRM_URL_ENV_VAR: &str = "COURIER_OSRM_URL";
pub const OSRM_PROFILE_ENV_VAR: &str = "COURIER_OSRM_PROFILE";
pub const FREE_FLOW_SPEED_ENV_VAR: &str = "COURIER_FREE_FLOW_SPEED_KMH";
pub const NOMINATIM_URL_ENV_VAR: &str = "COURIER_NOMINATIM_URL";
pub const COUNTRY_CODES_ENV_VAR: &str = "COURIER_COUNTRY_CODES";
pub const USER_AGENT_ENV_VAR: &str = "COURIER_USER_AGENT";
pub const HTTP_TIMEOUT_ENV_VAR: &str = "COURIER_HTTP_TIMEOUT_SECS";
pub const STALENESS_ENV_VAR: &str = "COURIER_STALENESS_SECS";

#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    pub osrm: OsrmConfig,
    pub nominatim: NominatimConfig,
    pub traffic: TrafficMonitorConfig,
}

impl PlannerConfig {
    /// Reads overrides from the process environment; unset or unparsable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(OSRM_URL_ENV_VAR) {
            config.osrm.base_url = url;
        }
        if let Some(profile) = lookup(OSRM_PROFILE_ENV_VAR) {
            config.osrm.profile = profile;
        }
        if let Some(speed) = parsed::<f64>(&lookup, FREE_FLOW_SPEED_ENV_VAR) {
            config.osrm.free_flow_speed_kmh = Some(speed);
        }
        if let Some(url) = lookup(NOMINATIM_URL_ENV_VAR) {
            config.nominatim.base_url = url;
        }
        if let Some(codes) = lookup(COUNTRY_CODES_ENV_VAR) {
            config.nominatim.country_codes = Some(codes);
        }
        if let Some(agent) = lookup(USER_AGENT_ENV_VAR) {
            config.nominatim.user_agent = agent;
        }
        if let Some(secs) = parsed::<u64>(&lookup, HTTP_TIMEOUT_ENV_VAR) {
            config.osrm.timeout_secs = secs;
            config.nominatim.timeout_secs = secs;
        }
        if let Some(secs) = parsed::<u64>(&lookup, STALENESS_ENV_VAR) {
            config.traffic.staleness = Duration::from_secs(secs);
        }

        config
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = PlannerConfig::from_lookup(|_| None);
        assert_eq!(config.osrm.base_url, "http://localhost:5000");
        assert_eq!(config.traffic.staleness, Duration::from_secs(120));
        assert!(config.osrm.free_flow_speed_kmh.is_none());
    }

    #[test]
    fn overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (OSRM_URL_ENV_VAR, "http://osrm:5000"),
            (FREE_FLOW_SPEED_ENV_VAR, "50"),
            (HTTP_TIMEOUT_ENV_VAR, "3"),
            (STALENESS_ENV_VAR, "300"),
            (COUNTRY_CODES_ENV_VAR, "pl"),
        ]);
        let config = PlannerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.osrm.base_url, "http://osrm:5000");
        assert_eq!(config.osrm.free_flow_speed_kmh, Some(50.0));
        assert_eq!(config.osrm.timeout_secs, 3);
        assert_eq!(config.nominatim.timeout_secs, 3);
        assert_eq!(config.nominatim.country_codes.as_deref(), Some("pl"));
        assert_eq!(config.traffic.staleness, Duration::from_secs(300));
    }

    #[test]
    fn unparsable_values_keep_defaults() {
        let config = PlannerConfig::from_lookup(|key| {
            (key == STALENESS_ENV_VAR).then(|| "soon".to_string())
        });
        assert_eq!(config.traffic.staleness, Duration::from_secs(120));
    }
}
