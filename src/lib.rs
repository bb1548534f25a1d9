//! # stompsql - Session and Upload Log Server for a STOMP Front-End
//!
//! stompsql is a small TCP server that a STOMP messaging server talks to for
//! persistence. Each request is a line of text terminated by a NUL byte; the
//! server records logins, logouts and file uploads in SQLite and answers
//! ad-hoc read queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              stompsql                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────┐    │
//! │                     │ FrameReader │    │        SqliteStore        │    │
//! │                     │ (per conn)  │    │  users │ logins │ files   │    │
//! │                     └─────────────┘    └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use stompsql::commands::CommandHandler;
//! use stompsql::connection::ConnectionStats;
//! use stompsql::server::{self, ServerOptions};
//! use stompsql::storage::SqliteStore;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteStore::open("stomp_server.db")?);
//!     let handler = CommandHandler::new(store);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:7778").await?;
//!     server::run(listener, handler, stats, ServerOptions::default(), tokio::signal::ctrl_c()).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `LOGIN <username> <password>` - `login success` or `login failed`;
//!   unknown users are registered on first login
//! - `LOGOUT <username>` - closes the user's most recent open session
//! - `ADD_FILE <username> <filename>` - records an upload
//! - `SELECT ...` - read-only query, rows as `col|col` lines
//!
//! Anything else gets `ERROR: Unknown Command`.
//!
//! ## Module Overview
//!
//! - [`protocol`]: Frame reader, command parser, response encoding
//! - [`commands`]: Command dispatch
//! - [`storage`]: The store interface and its SQLite implementation
//! - [`connection`]: Client connection management
//! - [`server`]: Accept loop with a connection limit
//! - [`client`]: Async client and the statistics report

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError};
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, CommandKind, FrameReader, Response};
pub use server::ServerOptions;
pub use storage::{SqliteStore, Store, StoreError};

/// The default port the server listens on
pub const DEFAULT_PORT: u16 = 7778;

/// The default host the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default database file
pub const DEFAULT_DATABASE: &str = "stomp_server.db";

/// Connections served at once unless configured otherwise
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1024;

/// Name printed in the startup banner
pub const SERVER_NAME: &str = "STOMP_SQL_SERVER";

/// Version of stompsql
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
