//! Pool Price Widgets
//!
//! Live price widgets for DEX liquidity pools backed by the GeckoTerminal API:
//! a single-pair cross-rate widget, a multi-pool dashboard, and a small HTTP
//! endpoint serving the subject token's USD price and cross rate.

pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod normalize;
pub mod render;
pub mod server;
pub mod types;
