//! Core types shared by the normalizer, pollers and server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream pool snapshot as delivered, untrusted and loosely typed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPoolAttributes(Map<String, Value>);

impl RawPoolAttributes {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Extract `data.attributes` from an upstream body.
    ///
    /// Anything that does not have that shape yields an empty bag.
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut root) => match root.remove("data") {
                Some(Value::Object(mut data)) => match data.remove("attributes") {
                    Some(Value::Object(attrs)) => Self(attrs),
                    _ => Self::default(),
                },
                _ => Self::default(),
            },
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up `outer.inner`, e.g. `volume_usd.h24`
    pub fn get_nested(&self, outer: &str, inner: &str) -> Option<&Value> {
        self.0.get(outer)?.as_object()?.get(inner)
    }

    /// Pair name such as `"COIN / WRON"`, empty when absent or not a string
    pub fn name(&self) -> &str {
        self.0.get("name").and_then(Value::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawPoolAttributes {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Stable view of one pool, recomputed on every fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPoolMetrics {
    pub price_usd: f64,
    pub change_percent_24h: f64,
    #[serde(rename = "volume24hUsd")]
    pub volume_24h_usd: f64,
    pub liquidity_usd: f64,
}

/// Two USD legs after role assignment, plus the derived ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossRatePrice {
    pub base_usd: f64,
    pub quote_usd: f64,
    pub subject_usd: f64,
    pub counter_usd: f64,
    /// Counter units per one subject unit
    pub cross_rate: f64,
}

/// Body served by `GET /api/price`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub subject_usd: f64,
    pub cross_rate: f64,
    pub updated_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(price: &CrossRatePrice, updated_at: DateTime<Utc>) -> Self {
        Self {
            subject_usd: price.subject_usd,
            cross_rate: price.cross_rate,
            updated_at,
        }
    }
}

/// Direction of a value between two consecutive polls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Flat,
}

impl Trend {
    /// Strict comparison of the new value against the previous one
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Trend::Up
        } else if current < previous {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// Pool ids end up in upstream URL paths, so only `[A-Za-z0-9_]+` is accepted
pub fn is_valid_pool_id(pool_id: &str) -> bool {
    !pool_id.is_empty() && pool_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A dashboard pool entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub note: Option<String>,
}
