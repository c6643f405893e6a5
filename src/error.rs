//! Error types for the price widgets

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WidgetError {
    /// Non-success status, timeout or transport failure talking to the market-data API
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Neither leg of a cross rate resolved to a finite price
    #[error("Price fields not found or not finite")]
    InvalidPrices,

    #[error("Poll failed: {0}")]
    ClientPollFailure(String),

    /// Pool ids are opaque but restricted to `[A-Za-z0-9_]`
    #[error("Invalid pool id: {0:?}")]
    InvalidPoolId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WidgetError {
    /// True for failures that originate upstream and map to a 502
    pub fn is_upstream(&self) -> bool {
        matches!(self, WidgetError::UpstreamUnavailable(_))
    }

    /// True for failures caused by the caller's input
    pub fn is_bad_request(&self) -> bool {
        matches!(self, WidgetError::InvalidPoolId(_))
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WidgetError::UpstreamUnavailable(format!("request timed out: {}", err))
        } else if let Some(status) = err.status() {
            WidgetError::UpstreamUnavailable(format!("Upstream {}", status.as_u16()))
        } else {
            WidgetError::UpstreamUnavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, WidgetError>;
