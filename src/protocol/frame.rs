//! NUL-Delimited Frame Reader
//!
//! TCP is a stream protocol: one `read()` can return half a message, or
//! several messages glued together. The `FrameReader` owns a connection's
//! receive buffer and turns that stream back into discrete frames.
//!
//! ## How the Reader Works
//!
//! ```text
//!   feed("LOGIN a")   buffer: [L O G I N ␠ a]               -> try_extract() = None
//!   feed(" b\0LOG")   buffer: [L O G I N ␠ a ␠ b ␀ L O G]   -> try_extract() = "LOGIN a b"
//!                     buffer: [L O G]                       -> try_extract() = None
//! ```
//!
//! 1. Append incoming network data with `feed()`
//! 2. Call `try_extract()` until it returns `None`
//! 3. Bytes after a terminator always stay buffered for the next cycle
//!
//! Each connection owns exactly one reader; it is never shared.

use bytes::{Buf, BytesMut};
use thiserror::Error;

/// The byte that terminates every request and response.
pub const TERMINATOR: u8 = b'\0';

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Errors raised while accumulating a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffered data without a terminator grew past the configured limit
    #[error("frame too large: {size} bytes buffered (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// Per-connection buffer that extracts terminator-delimited frames.
///
/// # Example
///
/// ```
/// use stompsql::protocol::FrameReader;
///
/// let mut reader = FrameReader::new();
/// reader.feed(b"LOGOUT a\0ADD_FILE a f\0");
///
/// assert_eq!(reader.try_extract().as_deref(), Some("LOGOUT a"));
/// assert_eq!(reader.try_extract().as_deref(), Some("ADD_FILE a f"));
/// assert_eq!(reader.try_extract(), None);
/// ```
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    /// Where the terminator search resumes; bytes before it are known NUL-free
    scanned: usize,
    max_frame: Option<usize>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Creates a reader that accepts frames of any length.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            scanned: 0,
            max_frame: None,
        }
    }

    /// Creates a reader that refuses to buffer more than `max` bytes of an
    /// unterminated frame.
    pub fn with_limit(max: usize) -> Self {
        Self {
            max_frame: Some(max),
            ..Self::new()
        }
    }

    /// Appends raw bytes received from the transport.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Gives direct access to the buffer so the transport can read into it
    /// without an intermediate copy (`AsyncReadExt::read_buf`).
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Removes and returns the first complete frame, if any.
    ///
    /// The frame excludes its terminator and is decoded as UTF-8, replacing
    /// invalid sequences with U+FFFD. Two consecutive terminators yield an
    /// empty frame.
    pub fn try_extract(&mut self) -> Option<String> {
        let start = self.scanned.min(self.buffer.len());
        let pos = self.buffer[start..]
            .iter()
            .position(|&b| b == TERMINATOR)
            .map(|offset| start + offset);

        match pos {
            Some(pos) => {
                let frame = self.buffer.split_to(pos);
                self.buffer.advance(1);
                self.scanned = 0;
                Some(String::from_utf8_lossy(&frame).into_owned())
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Checks the unterminated remainder against the configured limit.
    pub fn check_limit(&self) -> Result<(), FrameError> {
        match self.max_frame {
            Some(max) if self.buffer.len() > max => Err(FrameError::TooLarge {
                size: self.buffer.len(),
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Number of bytes waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops any partial data.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}
