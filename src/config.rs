//! Command-line configuration for the server.

use crate::{DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT};
use clap::Parser;

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "stompsql")]
#[command(version)]
#[command(about = "NUL-framed command server that logs STOMP sessions to SQLite", long_about = None)]
pub struct Config {
    /// Port to listen on (same as --port)
    #[arg(value_name = "PORT", conflicts_with = "port")]
    pub port_arg: Option<u16>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// SQLite database file (":memory:" for a throwaway store)
    #[arg(short, long, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Connections served at once; further clients wait in the accept backlog
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_connections: u32,

    /// Close connections whose unterminated frame exceeds this many bytes
    #[arg(long)]
    pub max_frame_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// The port from either the positional argument or `--port`.
    pub fn port(&self) -> u16 {
        self.port_arg.or(self.port).unwrap_or(DEFAULT_PORT)
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    /// Returns true if the store should live only in memory.
    pub fn in_memory(&self) -> bool {
        self.database == ":memory:"
    }
}
