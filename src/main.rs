//! stompsql - Session and Upload Log Server
//!
//! This is the main entry point for the server.
//! It opens the store, sets up the TCP listener and serves connections
//! until Ctrl+C.

use clap::Parser;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use stompsql::commands::CommandHandler;
use stompsql::connection::ConnectionStats;
use stompsql::server::{self, ServerOptions};
use stompsql::storage::{SqliteStore, Store};
use stompsql::Config;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
[{}] stompsql v{}
──────────────────────────────────────────────────────────────
Database:  {}
Listening: {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        stompsql::SERVER_NAME,
        stompsql::VERSION,
        config.database,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Open the store (shared across all connections)
    let store = Arc::new(if config.in_memory() {
        SqliteStore::in_memory()?
    } else {
        SqliteStore::open(&config.database)?
    });
    info!(database = %config.database, "Store initialized");

    let handler = CommandHandler::new(store.clone());
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    print_banner(&config);

    let options = ServerOptions {
        max_connections: config.max_connections as usize,
        max_frame: config.max_frame_bytes,
    };

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server::run(listener, handler, Arc::clone(&stats), options, shutdown).await;

    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        store = ?store.stats(),
        "Server shutdown complete"
    );
    Ok(())
}
