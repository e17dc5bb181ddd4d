//! Nominatim (OpenStreetMap) HTTP adapter for address lookup.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::model::Coordinate;
use crate::traits::{GeocodeMatch, GeocodingProvider};

pub const DEFAULT_USER_AGENT: &str = concat!("courier-route/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,
    /// Comma-separated ISO country codes to restrict results, e.g. `"pl"`.
    pub country_codes: Option<String>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            country_codes: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl GeocodingProvider for NominatimClient {
    fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>, ProviderError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let mut query = vec![("q", address), ("format", "jsonv2"), ("limit", "1")];
        if let Some(codes) = self.config.country_codes.as_deref() {
            query.push(("countrycodes", codes));
        }

        debug!(address, "geocoding address");

        let places: Vec<NominatimPlace> = self
            .client
            .get(url)
            .query(&query)
            .send()
            .and_then(|resp| resp.error_for_status())?
            .json()?;

        places.into_iter().next().map(NominatimPlace::into_match).transpose()
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimPlace {
    fn into_match(self) -> Result<GeocodeMatch, ProviderError> {
        let parse = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| ProviderError::Malformed(format!("invalid coordinate {value:?}")))
        };
        let coordinate = Coordinate::new(parse(&self.lon)?, parse(&self.lat)?);
        if !coordinate.is_valid() {
            return Err(ProviderError::Malformed(format!(
                "coordinate out of range: {coordinate}"
            )));
        }

        Ok(GeocodeMatch {
            coordinate,
            formatted_address: self.display_name,
        })
    }
}
