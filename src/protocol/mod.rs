//! Wire Protocol
//!
//! Requests and responses are UTF-8 text terminated by a single NUL byte.
//! There is no length prefix, so a message may arrive split across reads
//! or several may arrive in one read.
//!
//! ## Modules
//!
//! - `frame`: Per-connection buffer that extracts NUL-delimited frames
//! - `command`: Splits a frame into a command name and arguments
//! - `types`: The `Response` type and its wire encoding
//!
//! ## Example
//!
//! ```
//! use stompsql::protocol::{Command, CommandKind, FrameReader, Response};
//!
//! let mut reader = FrameReader::new();
//! reader.feed(b"LOGIN alice secret\0");
//!
//! let frame = reader.try_extract().unwrap();
//! let cmd = Command::parse(&frame);
//! assert_eq!(cmd.kind, CommandKind::Login);
//!
//! let bytes = Response::text("login success").serialize();
//! assert_eq!(bytes, b"login success\0");
//! ```

pub mod command;
pub mod frame;
pub mod types;

// Re-export commonly used types for convenience
pub use command::{Command, CommandKind};
pub use frame::{FrameError, FrameReader, TERMINATOR};
pub use types::Response;
