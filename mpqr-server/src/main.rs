//! Mercado Pago QR Server
//!
//! Creates provider QR orders for local transactions, tracks them to
//! settlement, and notifies a downstream system once they settle.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use mpqr_core::LifecycleManager;
use mpqr_core::events::settlement_event_channel;
use mpqr_core::processors::SettlementNotifier;
use mpqr_core::store::PgTransactionStore;
use mpqr_sdk::client::MercadoPagoClient;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::{AppState, DynTransactionStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Mercado Pago QR - in-store QR order lifecycle service
#[derive(Parser, Debug)]
#[command(name = "mpqr-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./mpqr-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting mpqr-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Convert to shared config with a separate store for each section
    let shared_config = loaded_config.into_shared();

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Settlement events flow from the lifecycle manager to the notifier
    let (settlement_tx, settlement_rx) = settlement_event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notifier = SettlementNotifier::new(
        settlement_rx,
        shutdown_rx,
        shared_config.notifications.clone(),
    );
    let notifier_handle = tokio::spawn(notifier.run());

    // Create application state
    let client = MercadoPagoClient::new();
    let store: DynTransactionStore = Arc::new(PgTransactionStore::new(db_pool.clone()));
    let lifecycle =
        LifecycleManager::new(store, client.clone()).with_settlement_events(settlement_tx);
    let state = AppState::new(lifecycle, client, shared_config.clone());

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(shared_config, config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Signal the config reload handler and the notifier to stop
    shutdown_notify.notify_one();
    if shutdown_tx.send(true).is_err() {
        tracing::debug!("SettlementNotifier already stopped");
    }
    if let Err(e) = notifier_handle.await {
        tracing::error!("SettlementNotifier task failed: {}", e);
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
