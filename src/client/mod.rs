//! Market-data API client
//!
//! This module provides interfaces to fetch pool snapshots:
//! - `PoolSource`: the seam pollers and the server depend on
//! - `GeckoTerminalClient`: HTTP implementation over the GeckoTerminal v2 API

mod gecko;
#[cfg(test)]
pub mod mock;

pub use gecko::{parse_pool_body, GeckoTerminalClient};

use crate::error::Result;
use crate::types::RawPoolAttributes;
use async_trait::async_trait;

/// Anything that can deliver a raw pool snapshot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolSource: Send + Sync {
    /// Fetch the current attributes of one pool, always bypassing caches
    async fn fetch_pool(&self, pool_id: &str) -> Result<RawPoolAttributes>;
}
