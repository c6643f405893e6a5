//! Poll tasks for the pair view and the dashboard cards

use super::{Observation, PollTask};
use crate::client::PoolSource;
use crate::error::Result;
use crate::normalize::{normalize, price_quote};
use crate::types::{CrossRatePrice, NormalizedPoolMetrics, Trend};
use async_trait::async_trait;
use std::sync::Arc;

/// Cross-rate price with trends against the previous cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSnapshot {
    pub price: CrossRatePrice,
    pub usd_trend: Trend,
    pub rate_trend: Trend,
}

impl PairSnapshot {
    pub fn new(price: CrossRatePrice) -> Self {
        Self {
            price,
            usd_trend: Trend::Flat,
            rate_trend: Trend::Flat,
        }
    }
}

impl Observation for PairSnapshot {
    fn follow(&mut self, previous: Option<&Self>) {
        if let Some(prev) = previous {
            self.usd_trend = Trend::between(prev.price.subject_usd, self.price.subject_usd);
            self.rate_trend = Trend::between(prev.price.cross_rate, self.price.cross_rate);
        }
    }
}

/// Fetches one pair pool and derives the subject's cross rate
pub struct PairQuoteTask {
    source: Arc<dyn PoolSource>,
    pool_id: String,
    target_symbol: String,
}

impl PairQuoteTask {
    pub fn new(source: Arc<dyn PoolSource>, pool_id: &str, target_symbol: &str) -> Self {
        Self {
            source,
            pool_id: pool_id.to_string(),
            target_symbol: target_symbol.to_string(),
        }
    }
}

#[async_trait]
impl PollTask for PairQuoteTask {
    type Output = PairSnapshot;

    async fn poll(&self) -> Result<PairSnapshot> {
        let attrs = self.source.fetch_pool(&self.pool_id).await?;
        let price = price_quote(&attrs, &self.target_symbol)?;
        Ok(PairSnapshot::new(price))
    }
}

/// Fetches one pool and normalizes it for a dashboard card
pub struct PoolMetricsTask {
    source: Arc<dyn PoolSource>,
    pool_id: String,
}

impl PoolMetricsTask {
    pub fn new(source: Arc<dyn PoolSource>, pool_id: &str) -> Self {
        Self {
            source,
            pool_id: pool_id.to_string(),
        }
    }
}

#[async_trait]
impl PollTask for PoolMetricsTask {
    type Output = NormalizedPoolMetrics;

    async fn poll(&self) -> Result<NormalizedPoolMetrics> {
        let attrs = self.source.fetch_pool(&self.pool_id).await?;
        Ok(normalize(&attrs))
    }
}
