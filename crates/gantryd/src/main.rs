//! Gantry build coordinator daemon.
//!
//! Wires the log distribution relay over a SurrealDB store and runs until
//! interrupted. The distributor side publishes into the process-local event
//! bus; subscribers attach to the channel hub.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use gantry_relay::{
    spawn_router, BuildEventBus, ChannelHub, ChannelRegistry, ChannelSink, EventRouter,
    RelayMetrics, StorageBridge, DEFAULT_CHANNEL_CAPACITY,
};
use gantry_store::{BuildStore, LogStore, ProjectStore, SurrealStore};

#[derive(Parser)]
#[command(name = "gantryd")]
#[command(author = "Gantry CI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Gantry build coordinator daemon", long_about = None)]
struct Cli {
    /// SurrealDB endpoint URL (ws://, surrealkv://path, mem://)
    #[arg(long, env = "GANTRY_DB_URL")]
    db_url: Option<String>,

    /// Use ephemeral in-memory storage (logs vanish on exit)
    #[arg(long)]
    memory: bool,

    /// Per-channel broadcast ring size
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

/// Initialise the global tracing subscriber.
///
/// Respects `RUST_LOG` for fine-grained filtering; falls back to the
/// supplied `level` when it is not set. Safe to call more than once.
fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let store = if cli.memory {
        SurrealStore::in_memory().await
    } else if let Some(url) = cli.db_url.as_deref() {
        SurrealStore::connect(url).await
    } else {
        SurrealStore::from_env().await
    }
    .context("Failed to connect to gantry database")?;

    let hub = Arc::new(ChannelHub::new(cli.channel_capacity));
    let metrics = Arc::new(RelayMetrics::new());

    let registry = Arc::new(ChannelRegistry::new(
        Arc::clone(&hub) as Arc<dyn ChannelSink>,
        Arc::new(store.clone()) as Arc<dyn LogStore>,
        Arc::clone(&metrics),
    ));
    let bridge = Arc::new(StorageBridge::new(
        Arc::new(store.clone()) as Arc<dyn BuildStore>,
        Arc::new(store.clone()) as Arc<dyn LogStore>,
        Arc::new(store) as Arc<dyn ProjectStore>,
        Arc::clone(&metrics),
    ));
    let router = Arc::new(EventRouter::new(
        registry,
        Arc::clone(&hub) as Arc<dyn ChannelSink>,
        bridge,
        Arc::clone(&metrics),
    ));

    // The bus handle stays alive here; dropping it would end the router task.
    let bus = BuildEventBus::new(cli.channel_capacity);
    let router_task = spawn_router(&bus, router);

    info!(
        channels = hub.channel_count(),
        capacity = cli.channel_capacity,
        "gantryd ready, awaiting distributor events"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("shutdown signal received");
    drop(bus);
    router_task.await.ok();
    metrics.flush();

    Ok(())
}
