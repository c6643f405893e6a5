//! Scripted pool source for tests
//!
//! Replays queued responses in call order, each with its own latency, then
//! keeps answering with a fallback.

use super::PoolSource;
use crate::error::{Result, WidgetError};
use crate::types::RawPoolAttributes;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockReply {
    Attributes(RawPoolAttributes),
    Status(u16),
}

#[derive(Debug, Clone)]
struct MockStep {
    delay: Duration,
    reply: MockReply,
}

pub struct ScriptedPoolSource {
    script: Mutex<VecDeque<MockStep>>,
    fallback: MockReply,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedPoolSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: MockReply::Status(503),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Answer every unscripted call with these attributes
    pub fn always(mut self, attrs: RawPoolAttributes) -> Self {
        self.fallback = MockReply::Attributes(attrs);
        self
    }

    /// Answer every unscripted call with this HTTP status
    pub fn always_status(mut self, status: u16) -> Self {
        self.fallback = MockReply::Status(status);
        self
    }

    pub fn then(self, attrs: RawPoolAttributes) -> Self {
        self.then_after(Duration::ZERO, MockReply::Attributes(attrs))
    }

    pub fn then_status(self, status: u16) -> Self {
        self.then_after(Duration::ZERO, MockReply::Status(status))
    }

    pub fn then_after(self, delay: Duration, reply: MockReply) -> Self {
        self.script.lock().push_back(MockStep { delay, reply });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

impl Default for ScriptedPoolSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PoolSource for ScriptedPoolSource {
    async fn fetch_pool(&self, pool_id: &str) -> Result<RawPoolAttributes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(pool_id.to_string());

        let step = self.script.lock().pop_front().unwrap_or(MockStep {
            delay: Duration::ZERO,
            reply: self.fallback.clone(),
        });

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        match step.reply {
            MockReply::Attributes(attrs) => Ok(attrs),
            MockReply::Status(status) => Err(WidgetError::UpstreamUnavailable(format!(
                "Upstream {}",
                status
            ))),
        }
    }
}

/// Attribute bag for a pair pool with string-typed prices, as GeckoTerminal sends them
pub fn pair_attributes(name: &str, base_usd: f64, quote_usd: f64) -> RawPoolAttributes {
    attributes(json!({
        "name": name,
        "base_token_price_usd": base_usd.to_string(),
        "quote_token_price_usd": quote_usd.to_string(),
        "price_change_percentage": { "h1": "0.1", "h24": "-1.5" },
        "volume_usd": { "h24": "15234.5" },
        "reserve_in_usd": "987654.321"
    }))
}

pub fn attributes(value: Value) -> RawPoolAttributes {
    match value {
        Value::Object(map) => RawPoolAttributes::new(map),
        _ => RawPoolAttributes::default(),
    }
}
