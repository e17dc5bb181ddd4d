//! Address resolution on top of a [`GeocodingProvider`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PlanError;
use crate::model::Coordinate;
use crate::traits::GeocodingProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub coordinate: Coordinate,
    pub formatted_address: String,
}

#[derive(Debug, Clone)]
pub struct Geocoder<P> {
    provider: P,
}

impl<P: GeocodingProvider> Geocoder<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Resolves one address with a single provider lookup.
    pub fn resolve(&self, address: &str) -> Result<ResolvedAddress, PlanError> {
        let query = address.trim();
        if query.is_empty() {
            return Err(PlanError::NotFound {
                address: address.to_string(),
            });
        }

        match self.provider.geocode(query) {
            Ok(Some(hit)) => Ok(ResolvedAddress {
                coordinate: hit.coordinate,
                formatted_address: hit.formatted_address,
            }),
            Ok(None) => Err(PlanError::NotFound {
                address: query.to_string(),
            }),
            Err(err) => {
                warn!(address = query, error = %err, "geocoding failed");
                Err(err.into())
            }
        }
    }
}

impl<P: GeocodingProvider + Sync> Geocoder<P> {
    /// Resolves addresses concurrently; results keep the input order.
    ///
    /// Any failure aborts the batch.
    pub fn resolve_all<S: AsRef<str> + Sync>(
        &self,
        addresses: &[S],
    ) -> Result<Vec<ResolvedAddress>, PlanError> {
        addresses
            .par_iter()
            .map(|address| self.resolve(address.as_ref()))
            .collect()
    }
}
