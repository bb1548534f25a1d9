//! Command Handler Module
//!
//! This module implements the command processing layer. It receives parsed
//! commands, executes them against the store, and returns the text response.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  FrameReader    │  (protocol module)
//! │  Command::parse │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Route        │
//! │  - Check arity  │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `LOGIN`, `LOGOUT`
//! - `ADD_FILE`
//! - `SELECT`

pub mod handler;

// Re-export the main command handler
pub use handler::{Clock, CommandHandler, TIME_FORMAT};
