//! Storage Module
//!
//! The persistence layer behind the command dispatcher. The dispatcher holds
//! no state of its own; every command reads or writes through a [`Store`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │ Arc<dyn Store>
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SqliteStore                            │
//! │   Mutex<Connection>  ── one transaction per operation       │
//! │   users │ logins │ files                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use stompsql::storage::{LoginOutcome, SqliteStore, Store};
//!
//! let store = SqliteStore::in_memory().unwrap();
//! let at = "2024-01-01 10:00:00";
//!
//! assert_eq!(store.login("alice", "secret", at), Ok(LoginOutcome::Registered));
//! assert_eq!(store.login("alice", "wrong", at), Ok(LoginOutcome::Rejected));
//! ```

pub mod sqlite;
pub mod store;

// Re-export commonly used types
pub use sqlite::SqliteStore;
pub use store::{LoginOutcome, Row, Store, StoreError, StoreResult, StoreStats, Value};
