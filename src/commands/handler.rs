//! Command Handler Module
//!
//! Dispatches parsed commands to their handlers and turns the outcome into a
//! [`Response`]. Each command is handled independently: there is no session
//! state carried between messages, everything lives in the store.
//!
//! ## Commands
//!
//! | Command | Args | Result |
//! |---|---|---|
//! | `LOGIN user pass` | 2 | `login success` / `login failed` |
//! | `LOGOUT user` | 1 | `done` |
//! | `ADD_FILE user filename` | 2 | `done` |
//! | `SELECT ...` | raw | rows as `a\|b\nc\|d`, empty for no rows |
//! | anything else | - | `ERROR: Unknown Command` |
//!
//! Argument-count mismatches are answered before the store is touched.
//! Store failures come back as `ERROR: <detail>`.

use crate::protocol::{Command, CommandKind, Response};
use crate::storage::{Store, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Timestamp layout written to `login_time`, `logout_time` and `upload_time`
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Reply to an accepted login
pub const LOGIN_SUCCESS: &str = "login success";

/// Reply to a rejected login
pub const LOGIN_FAILED: &str = "login failed";

/// Error detail for unrecognized commands
pub const UNKNOWN_COMMAND: &str = "Unknown Command";

/// Produces the timestamp stored with each row.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

fn local_now() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// Handles commands by dispatching them against a shared store.
#[derive(Clone)]
pub struct CommandHandler {
    /// The store (shared across connections)
    store: Arc<dyn Store>,
    clock: Clock,
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

impl CommandHandler {
    /// Creates a handler that stamps rows with the local time.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_clock(store, Arc::new(local_now))
    }

    /// Creates a handler with a custom timestamp source.
    pub fn with_clock(store: Arc<dyn Store>, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Parses a frame and executes it.
    pub fn execute_frame(&self, frame: &str) -> Response {
        self.execute(&Command::parse(frame))
    }

    /// Executes a command and returns the response.
    pub fn execute(&self, command: &Command) -> Response {
        debug!(command = %command.kind, args = command.args.len(), "Dispatching command");

        if let Some(expected) = command.kind.arity() {
            if command.args.len() != expected {
                return Response::error(format!(
                    "wrong number of arguments for '{}' command (expected {}, got {})",
                    command.kind,
                    expected,
                    command.args.len()
                ));
            }
        }

        let result = match command.kind {
            CommandKind::Login => self.cmd_login(&command.args[0], &command.args[1]),
            CommandKind::Logout => self.cmd_logout(&command.args[0]),
            CommandKind::AddFile => self.cmd_add_file(&command.args[0], &command.args[1]),
            CommandKind::Select => self.cmd_select(&command.raw),
            CommandKind::Unknown => return Response::error(UNKNOWN_COMMAND),
        };

        result.unwrap_or_else(|e| {
            warn!(command = %command.kind, error = %e, "Store rejected command");
            Response::error(e.to_string())
        })
    }

    /// LOGIN username password
    fn cmd_login(&self, username: &str, password: &str) -> Result<Response, StoreError> {
        let outcome = self.store.login(username, password, &(self.clock)())?;
        debug!(user = username, outcome = ?outcome, "Login");

        Ok(if outcome.is_success() {
            Response::text(LOGIN_SUCCESS)
        } else {
            Response::text(LOGIN_FAILED)
        })
    }

    /// LOGOUT username
    fn cmd_logout(&self, username: &str) -> Result<Response, StoreError> {
        let closed = self.store.logout(username, &(self.clock)())?;
        debug!(user = username, closed, "Logout");
        Ok(Response::done())
    }

    /// ADD_FILE username filename
    fn cmd_add_file(&self, username: &str, filename: &str) -> Result<Response, StoreError> {
        self.store.add_file(username, filename, &(self.clock)())?;
        Ok(Response::done())
    }

    /// SELECT ... (forwarded verbatim)
    fn cmd_select(&self, sql: &str) -> Result<Response, StoreError> {
        let rows = self.store.query(sql)?;
        debug!(rows = rows.len(), "Query");
        Ok(Response::rows(&rows))
    }
}
