//! Configuration management

use crate::error::{Result, WidgetError};
use crate::types::{is_valid_pool_id, PoolInfo};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub pair: PairConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Market-data API root (GeckoTerminal v2)
    pub base_url: String,
    /// Network slug used in pool URLs
    pub network: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    /// Pool that carries both legs of the cross rate
    pub pool_id: String,
    /// Display label, e.g. "COIN / WRON"
    pub label: String,
    /// Token being priced
    pub target_symbol: String,
    /// Token the cross rate is denominated in
    pub counter_symbol: String,
    pub poll_interval_secs: u64,
    /// One-off extra fetch shortly after start
    pub kick_delay_secs: Option<u64>,
    /// Cross rate below this is shown in the alert color
    pub alert_low: Option<f64>,
    /// Cross rate above this is shown in the alert color
    pub alert_high: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll_interval_secs: u64,
    pub pools: Vec<PoolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from file, layered with `PRICE_WIDGETS__*` env vars.
    ///
    /// The file must exist.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let path = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Config path is not valid UTF-8: {}", path.display()))?;

        Self::build(Some(path))
    }

    fn build(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("PRICE_WIDGETS").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations, falling back to built-in defaults
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["config.toml", "config.yaml", "~/.config/pool-price-widgets/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Self::build(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upstream.timeout_secs == 0 {
            return Err(WidgetError::Config(
                "upstream.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.pair.poll_interval_secs == 0 || self.dashboard.poll_interval_secs == 0 {
            return Err(WidgetError::Config(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if !is_valid_pool_id(&self.pair.pool_id) {
            return Err(WidgetError::Config(format!(
                "pair.pool_id {:?} is not a valid pool id",
                self.pair.pool_id
            )));
        }
        if let Some(pool) = self.dashboard.pools.iter().find(|p| !is_valid_pool_id(&p.id)) {
            return Err(WidgetError::Config(format!(
                "dashboard pool {:?} has invalid id {:?}",
                pool.label, pool.id
            )));
        }
        if let (Some(low), Some(high)) = (self.pair.alert_low, self.pair.alert_high) {
            if low > high {
                return Err(WidgetError::Config(format!(
                    "pair.alert_low ({}) is above pair.alert_high ({})",
                    low, high
                )));
            }
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.geckoterminal.com/api/v2".to_string(),
            network: "ronin".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            pool_id: "0xda021b3d91f82bf2bcfc1a8709545c3a643d47de".to_string(),
            label: "COIN / WRON".to_string(),
            target_symbol: "COIN".to_string(),
            counter_symbol: "WRON".to_string(),
            poll_interval_secs: 60,
            kick_delay_secs: Some(5),
            alert_low: Some(0.0005),
            alert_high: Some(0.0007),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let pool = |id: &str, label: &str, note: &str| PoolInfo {
            id: id.to_string(),
            label: label.to_string(),
            note: Some(note.to_string()),
        };

        Self {
            poll_interval_secs: 30,
            pools: vec![
                pool(
                    "0xda021b3d91f82bf2bcfc1a8709545c3a643d47de",
                    "COIN / WRON",
                    "CraftWorld COIN pool",
                ),
                pool(
                    "0x93171ecace2f6b8be8dd09539f55fabe7f805af1",
                    "RICE / Ronke (Katana V3)",
                    "Ronke Rice Farmers",
                ),
                pool(
                    "0x75ae353997242927c701d4d6c2722ebef43fd2d3",
                    "RONKE / WRON (Katana)",
                    "Ronke Token",
                ),
                pool(
                    "0x2ecb08f87f075b5769fe543d0e52e40140575ea7",
                    "RON / USDC (Katana V3)",
                    "Ronin Stable Pool",
                ),
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
