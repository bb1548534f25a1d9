//! SQLite-Backed Store
//!
//! The durable store behind the dispatcher. All access goes through one
//! connection guarded by a mutex, and every operation runs inside a single
//! transaction, which makes each logical operation atomic against
//! concurrent connections.
//!
//! ## Schema
//!
//! ```text
//! users  (username TEXT PRIMARY KEY, password TEXT NOT NULL)
//! logins (id INTEGER PRIMARY KEY AUTOINCREMENT, username, login_time, logout_time NULL)
//! files  (id INTEGER PRIMARY KEY AUTOINCREMENT, username, filename, upload_time)
//! ```
//!
//! Foreign keys to `users` are declared but not enforced, so a file can be
//! recorded for a user that never logged in.

use crate::storage::store::{
    LoginOutcome, Row, Store, StoreError, StoreResult, StoreStats, Value,
};
use rusqlite::types::ValueRef;
use rusqlite::{params, Batch, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Reported when a query carries more than one statement
const MULTIPLE_STATEMENTS: &str = "You can only execute one statement at a time.";

/// How long a statement waits on a locked database file before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        password TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS logins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        login_time DATETIME NOT NULL,
        logout_time DATETIME,
        FOREIGN KEY(username) REFERENCES users(username)
    );
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        filename TEXT NOT NULL,
        upload_time DATETIME,
        FOREIGN KEY(username) REFERENCES users(username)
    );
";

/// A [`Store`] backed by an SQLite database.
pub struct SqliteStore {
    connection: Mutex<Connection>,

    sessions_opened: AtomicU64,
    users_registered: AtomicU64,
    logins_rejected: AtomicU64,
    sessions_closed: AtomicU64,
    files_recorded: AtomicU64,
    queries: AtomicU64,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("stats", &self.stats())
            .finish()
    }
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path` and ensures the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path)?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        info!(path = %path.display(), "Opened database");
        Self::with_connection(connection)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> StoreResult<Self> {
        connection.execute_batch(SCHEMA)?;
        debug!("Schema initialized");

        Ok(Self {
            connection: Mutex::new(connection),
            sessions_opened: AtomicU64::new(0),
            users_registered: AtomicU64::new(0),
            logins_rejected: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            files_recorded: AtomicU64::new(0),
            queries: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for SqliteStore {
    fn login(&self, username: &str, password: &str, at: &str) -> StoreResult<LoginOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)
             ON CONFLICT(username) DO NOTHING",
            params![username, password],
        )?;

        let outcome = if inserted == 1 {
            LoginOutcome::Registered
        } else {
            let stored: Option<String> = tx
                .query_row(
                    "SELECT password FROM users WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            match stored {
                Some(stored) if stored == password => LoginOutcome::Accepted,
                _ => LoginOutcome::Rejected,
            }
        };

        if outcome.is_success() {
            tx.execute(
                "INSERT INTO logins (username, login_time) VALUES (?1, ?2)",
                params![username, at],
            )?;
        }
        tx.commit()?;

        match outcome {
            LoginOutcome::Registered => {
                self.users_registered.fetch_add(1, Ordering::Relaxed);
                self.sessions_opened.fetch_add(1, Ordering::Relaxed);
            }
            LoginOutcome::Accepted => {
                self.sessions_opened.fetch_add(1, Ordering::Relaxed);
            }
            LoginOutcome::Rejected => {
                self.logins_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(outcome)
    }

    fn logout(&self, username: &str, at: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let closed = conn.execute(
            "UPDATE logins SET logout_time = ?1
             WHERE id = (
                 SELECT MAX(id) FROM logins
                 WHERE username = ?2 AND logout_time IS NULL
             )",
            params![at, username],
        )?;

        self.sessions_closed.fetch_add(closed as u64, Ordering::Relaxed);
        Ok(closed)
    }

    fn add_file(&self, username: &str, filename: &str, at: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files (username, filename, upload_time) VALUES (?1, ?2, ?3)",
            params![username, filename, at],
        )?;

        self.files_recorded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn query(&self, sql: &str) -> StoreResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut batch = Batch::new(&conn, sql);
        let Some(mut stmt) = batch.next()? else {
            return Ok(Vec::new());
        };
        // Empty tails such as a trailing `;` are skipped by the batch
        if batch.next()?.is_some() {
            return Err(StoreError::Database(MULTIPLE_STATEMENTS.to_string()));
        }
        if !stmt.readonly() {
            return Err(StoreError::NotReadOnly);
        }

        let columns = stmt.column_count();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns);
            for i in 0..columns {
                let value = match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(n) => Value::Integer(n),
                    ValueRef::Real(r) => Value::Real(r),
                    ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => Value::Blob(b.to_vec()),
                };
                values.push(value);
            }
            out.push(values);
        }

        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(out)
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            users_registered: self.users_registered.load(Ordering::Relaxed),
            logins_rejected: self.logins_rejected.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            files_recorded: self.files_recorded.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
        }
    }
}
