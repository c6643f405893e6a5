//! HTTP server for the price endpoint and widgets
//!
//! Every request fetches fresh upstream data; responses are never cacheable.

mod routes;

pub use routes::{create_router, ApiError};

use crate::client::PoolSource;
use crate::config::{Config, ServerConfig};
use crate::monitor::{PairSnapshot, PollState};
use crate::types::PoolInfo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Shared state handed to every handler
pub struct AppState {
    pub source: Arc<dyn PoolSource>,
    pub pair_pool_id: String,
    pub pair_label: String,
    pub target_symbol: String,
    pub counter_symbol: String,
    pub alert_low: Option<f64>,
    pub alert_high: Option<f64>,
    pub network: String,
    pub pools: Vec<PoolInfo>,
    /// Background pair poller, used for widget trends
    pub pair_state: Option<watch::Receiver<PollState<PairSnapshot>>>,
}

impl AppState {
    pub fn new(config: &Config, source: Arc<dyn PoolSource>) -> Self {
        Self {
            source,
            pair_pool_id: config.pair.pool_id.clone(),
            pair_label: config.pair.label.clone(),
            target_symbol: config.pair.target_symbol.clone(),
            counter_symbol: config.pair.counter_symbol.clone(),
            alert_low: config.pair.alert_low,
            alert_high: config.pair.alert_high,
            network: config.upstream.network.clone(),
            pools: config.dashboard.pools.clone(),
            pair_state: None,
        }
    }

    pub fn with_pair_state(mut self, rx: watch::Receiver<PollState<PairSnapshot>>) -> Self {
        self.pair_state = Some(rx);
        self
    }

    /// Latest value the background pair poller accepted, if any
    pub fn previous_pair(&self) -> Option<PairSnapshot> {
        self.pair_state.as_ref().and_then(|rx| rx.borrow().value)
    }
}

/// Serve until Ctrl-C
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", config.host, config.port, e))?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => {
            anyhow::anyhow!("Failed to bind to {}: address already in use", addr)
        }
        _ => anyhow::anyhow!("Failed to bind to {}: {}", addr, e),
    })?;

    info!("Listening on http://{}", addr);
    info!("Price endpoint at http://{}/api/price", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, stopping server...");
    };

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}
