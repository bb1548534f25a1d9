//! TCP Listener
//!
//! Accepts connections and spawns one `ConnectionHandler` task per client.
//! A semaphore bounds how many connections are served at once; when every
//! permit is taken the loop stops accepting and further clients wait in the
//! kernel's backlog until a connection ends.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Listener settings
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Connections served concurrently
    pub max_connections: usize,
    /// Optional cap on an unterminated frame
    pub max_frame: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_connections: crate::DEFAULT_MAX_CONNECTIONS as usize,
            max_frame: None,
        }
    }
}

/// Serves connections until `shutdown` completes.
///
/// Connections still open when `shutdown` fires keep running on the runtime
/// until it is dropped.
pub async fn run(
    listener: TcpListener,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    options: ServerOptions,
    shutdown: impl Future,
) {
    tokio::select! {
        _ = accept_loop(listener, handler, stats, options) => {}
        _ = shutdown => {
            info!("Shutdown signal received, stopping server...");
        }
    }
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    options: ServerOptions,
) {
    let limit = Arc::new(Semaphore::new(options.max_connections));

    loop {
        if limit.available_permits() == 0 {
            debug!(max = options.max_connections, "Connection limit reached, pausing accept");
        }

        // The semaphore is never closed
        let Ok(permit) = Arc::clone(&limit).acquire_owned().await else {
            return;
        };

        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, options.max_frame).await;
                    drop(permit);
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
