//! GeckoTerminal API client for pool data
//!
//! Fetches `/networks/{network}/pools/{pool}` and hands back the raw attributes.

use super::PoolSource;
use crate::config::UpstreamConfig;
use crate::error::{Result, WidgetError};
use crate::types::{is_valid_pool_id, RawPoolAttributes};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// GeckoTerminal API client
pub struct GeckoTerminalClient {
    http: Client,
    base_url: String,
    network: String,
}

impl GeckoTerminalClient {
    /// Create a new client with a bounded request timeout
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WidgetError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            network: config.network.clone(),
        })
    }

    pub fn pool_url(&self, pool_id: &str) -> String {
        format!("{}/networks/{}/pools/{}", self.base_url, self.network, pool_id)
    }

    pub fn network(&self) -> &str {
        &self.network
    }
}

#[async_trait]
impl PoolSource for GeckoTerminalClient {
    async fn fetch_pool(&self, pool_id: &str) -> Result<RawPoolAttributes> {
        if !is_valid_pool_id(pool_id) {
            return Err(WidgetError::InvalidPoolId(pool_id.to_string()));
        }
        let url = self.pool_url(pool_id);
        debug!(%url, "Fetching pool");

        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WidgetError::UpstreamUnavailable(format!(
                "Upstream {}",
                status.as_u16()
            )));
        }

        let body = resp.bytes().await?;
        Ok(parse_pool_body(pool_id, &body))
    }
}

/// Decode an upstream body, degrading anything unexpected to an empty bag
pub fn parse_pool_body(pool_id: &str, body: &[u8]) -> RawPoolAttributes {
    match serde_json::from_slice(body) {
        Ok(value) => {
            let attrs = RawPoolAttributes::from_body(value);
            if attrs.is_empty() {
                warn!(pool_id, "{}", WidgetError::MalformedResponse("no data.attributes".into()));
            }
            attrs
        }
        Err(e) => {
            warn!(pool_id, "{}", WidgetError::MalformedResponse(e.to_string()));
            RawPoolAttributes::default()
        }
    }
}
