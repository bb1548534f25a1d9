//! Response Types
//!
//! Every request gets exactly one response: plain UTF-8 text followed by a
//! single NUL byte.
//!
//! ## Examples
//!
//! Success: `login success\0`
//! Write acknowledged: `done\0`
//! Query rows: `alice|2024-01-01 10:00:00|None\nbob|2024-01-01 10:05:00|None\0`
//! Empty query: `\0`
//! Error: `ERROR: Unknown Command\0`

use crate::protocol::frame::TERMINATOR;
use crate::storage::Row;
use std::fmt;

/// Column separator used when rendering query rows
pub const COLUMN_DELIMITER: char = '|';

/// Row separator used when rendering query rows
pub const ROW_DELIMITER: char = '\n';

/// Prefix carried by every error response
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Written in place of a NUL inside a response body
const REPLACEMENT: &str = "\u{fffd}";

/// A response to a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Successful result text (may be empty)
    Text(String),

    /// Failure detail, sent as `ERROR: <detail>`
    Error(String),
}

impl Response {
    /// Creates a text response.
    pub fn text(s: impl Into<String>) -> Self {
        Response::Text(s.into())
    }

    /// Creates an error response from its detail.
    ///
    /// # Example
    /// ```
    /// use stompsql::protocol::Response;
    /// let err = Response::error("Unknown Command");
    /// assert_eq!(err.to_string(), "ERROR: Unknown Command");
    /// ```
    pub fn error(detail: impl Into<String>) -> Self {
        Response::Error(detail.into())
    }

    /// Acknowledges a write
    pub fn done() -> Self {
        Response::Text("done".to_string())
    }

    /// Renders query rows: columns joined by `|`, rows joined by `\n`.
    /// No rows yields an empty response.
    pub fn rows(rows: &[Row]) -> Self {
        let mut out = String::new();
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                out.push(ROW_DELIMITER);
            }
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push(COLUMN_DELIMITER);
                }
                out.push_str(&value.to_string());
            }
        }
        Response::Text(out)
    }

    /// Serializes the response for the wire: text plus terminator.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    ///
    /// The body never contains the terminator: NUL bytes inside stored
    /// values are written as U+FFFD.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Text(s) => push_body(buf, s),
            Response::Error(detail) => {
                buf.extend_from_slice(ERROR_PREFIX.as_bytes());
                push_body(buf, detail);
            }
        }
        buf.push(TERMINATOR);
    }

    /// Returns true if this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

fn push_body(buf: &mut Vec<u8>, text: &str) {
    for (i, part) in text.split(TERMINATOR as char).enumerate() {
        if i > 0 {
            buf.extend_from_slice(REPLACEMENT.as_bytes());
        }
        buf.extend_from_slice(part.as_bytes());
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Text(s) => f.write_str(s),
            Response::Error(detail) => write!(f, "{}{}", ERROR_PREFIX, detail),
        }
    }
}
