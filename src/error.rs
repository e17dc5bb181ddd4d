//! Error types shared by the planner components.

use thiserror::Error;

/// Failure talking to an external geocoding/directions/matrix provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("provider returned HTTP {status}")]
    Http { status: u16 },

    #[error("provider connection failed: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider found no route: {0}")]
    NoRoute(String),

    #[error("provider rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("provider returned no route segments")]
    EmptyRoute,

    #[error("invalid provider request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited | Self::Transport(_) | Self::Http { .. }
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                ProviderError::RateLimited
            } else {
                ProviderError::Http {
                    status: status.as_u16(),
                }
            }
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Error returned by a planning request.
///
/// Every variant aborts the whole request; no partial route is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("address not found: {address}")]
    NotFound { address: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("route is infeasible: {0}")]
    Infeasible(String),
}

impl PlanError {
    /// Message suitable for showing to the person who submitted the request.
    pub fn user_message(&self) -> String {
        match self {
            PlanError::NotFound { address } => format!("Could not find address: {address}"),
            PlanError::Provider(_) => {
                "The routing service is unavailable right now, please try again later.".to_string()
            }
            PlanError::Infeasible(_) => {
                "Please enter at least two locations to optimize a route.".to_string()
            }
        }
    }
}
