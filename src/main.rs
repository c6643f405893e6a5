//! Pool Price Widgets
//!
//! Live DEX pool prices in the terminal and over HTTP.

use clap::{Parser, Subcommand};
use pool_price_widgets::{
    client::{GeckoTerminalClient, PoolSource},
    config::Config,
    monitor::{PairQuoteTask, PairSnapshot, PollState, Poller, PollerConfig, PoolMetricsTask},
    normalize::price_quote,
    render::{pair_card, AlertBand, PoolCard},
    server::{start_server, AppState},
    types::{NormalizedPoolMetrics, PriceQuote},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "price-widgets")]
#[command(about = "Live price widgets for DEX liquidity pools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: config.toml, then ~/.config/pool-price-widgets/)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the price endpoint and widget API
    Serve {
        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch the pair price once and print it as JSON
    Price,
    /// Live single-pair card; press Enter to refresh
    Watch,
    /// Live multi-pool dashboard
    Dashboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let source: Arc<dyn PoolSource> = Arc::new(GeckoTerminalClient::new(&config.upstream)?);

    match cli.command {
        Commands::Serve { port } => serve(config, source, port).await,
        Commands::Price => show_price(config, source).await,
        Commands::Watch => watch_pair(config, source).await,
        Commands::Dashboard => show_dashboard(config, source).await,
    }
}

fn pair_poller(config: &Config, source: Arc<dyn PoolSource>) -> Poller<PairSnapshot> {
    let pair = &config.pair;
    let mut poller_config = PollerConfig::every(Duration::from_secs(pair.poll_interval_secs));
    if let Some(kick) = pair.kick_delay_secs {
        poller_config = poller_config.with_kick(Duration::from_secs(kick));
    }

    Poller::spawn(
        format!("pair:{}", pair.label),
        PairQuoteTask::new(source, &pair.pool_id, &pair.target_symbol),
        poller_config,
    )
}

async fn serve(mut config: Config, source: Arc<dyn PoolSource>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    tracing::info!("Starting price server for {}", config.pair.label);

    let poller = pair_poller(&config, Arc::clone(&source));
    let state = AppState::new(&config, source).with_pair_state(poller.subscribe());

    start_server(&config.server, Arc::new(state)).await
}

async fn show_price(config: Config, source: Arc<dyn PoolSource>) -> anyhow::Result<()> {
    let attrs = source.fetch_pool(&config.pair.pool_id).await?;
    let price = price_quote(&attrs, &config.pair.target_symbol)?;
    let quote = PriceQuote::new(&price, chrono::Utc::now());

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn watch_pair(config: Config, source: Arc<dyn PoolSource>) -> anyhow::Result<()> {
    let pair = &config.pair;
    let band = AlertBand::new(pair.alert_low, pair.alert_high);
    let poller = pair_poller(&config, source);
    let mut updates = poller.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let card = |state: &PollState<PairSnapshot>| {
        pair_card(
            &pair.label,
            &pair.target_symbol,
            &pair.counter_symbol,
            state,
            band,
            pair.poll_interval_secs,
        )
    };

    println!("{}", card(&*updates.borrow()));

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    tracing::warn!("Poller {} stopped", poller.name());
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if !state.loading {
                    println!("{}", card(&state));
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => poller.refresh(),
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

async fn show_dashboard(config: Config, source: Arc<dyn PoolSource>) -> anyhow::Result<()> {
    let interval = Duration::from_secs(config.dashboard.poll_interval_secs);
    let network = config.upstream.network.clone();

    let pollers: Vec<Poller<NormalizedPoolMetrics>> = config
        .dashboard
        .pools
        .iter()
        .map(|pool| {
            Poller::spawn(
                format!("pool:{}", pool.label),
                PoolMetricsTask::new(Arc::clone(&source), &pool.id),
                PollerConfig::every(interval),
            )
        })
        .collect();

    // One merged stream of "something changed" across all pools
    let (changed_tx, mut changed_rx) = watch::channel(());
    for poller in &pollers {
        let mut rx = poller.subscribe();
        let tx = changed_tx.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
    }

    println!("Pool dashboard ({} pools, refresh every {}s)", pollers.len(), interval.as_secs());

    let mut printed_cycles = vec![0u64; pollers.len()];
    loop {
        tokio::select! {
            changed = changed_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let states: Vec<PollState<NormalizedPoolMetrics>> =
                    pollers.iter().map(|p| p.snapshot()).collect();
                let cycles: Vec<u64> = states.iter().map(|s| s.cycles()).collect();
                if !dashboard_needs_reprint(&printed_cycles, &cycles) {
                    continue;
                }
                printed_cycles = cycles;
                println!("\n{}", "-".repeat(60));
                for (pool, state) in config.dashboard.pools.iter().zip(&states) {
                    print!("{}", PoolCard::from_state(pool, &network, state).render_text());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Reprint once every pool has answered at least once and some pool has a new answer.
/// Loading toggles alone never trigger a reprint.
fn dashboard_needs_reprint(printed: &[u64], current: &[u64]) -> bool {
    current.iter().all(|&c| c > 0) && current.iter().zip(printed).any(|(c, p)| c > p)
}
