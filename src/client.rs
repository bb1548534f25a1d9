//! Async client for the NUL-framed protocol.
//!
//! Used by the STOMP front-end to record logins, logouts and uploads, and to
//! build the server statistics report from three queries.

use crate::protocol::{FrameReader, TERMINATOR};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

/// Errors raised by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server closed the connection before replying
    #[error("connection closed by server")]
    ConnectionClosed,

    /// An argument would break the framing or tokenization
    #[error("invalid argument: {0:?}")]
    InvalidArgument(String),
}

/// A connection to the server.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    reader: FrameReader,
}

impl Client {
    /// Connects to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            reader: FrameReader::new(),
        })
    }

    /// Sends one message and waits for its response.
    pub async fn request(&mut self, message: &str) -> Result<String, ClientError> {
        if message.as_bytes().contains(&TERMINATOR) {
            return Err(ClientError::InvalidArgument(message.to_string()));
        }

        let mut bytes = Vec::with_capacity(message.len() + 1);
        bytes.extend_from_slice(message.as_bytes());
        bytes.push(TERMINATOR);
        self.stream.write_all(&bytes).await?;
        trace!(bytes = bytes.len(), "Sent request");

        loop {
            if let Some(response) = self.reader.try_extract() {
                return Ok(response);
            }
            let n = self.stream.read_buf(self.reader.buffer_mut()).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
        }
    }

    /// Logs in, registering the user on first use.
    ///
    /// Returns true only for an exact `login success` reply.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool, ClientError> {
        let response = self
            .request(&format!("LOGIN {} {}", token(username)?, token(password)?))
            .await?;
        Ok(response == "login success")
    }

    /// Closes the user's most recent open session.
    pub async fn logout(&mut self, username: &str) -> Result<String, ClientError> {
        self.request(&format!("LOGOUT {}", token(username)?)).await
    }

    /// Records an uploaded file. An empty filename is skipped.
    pub async fn add_file(&mut self, username: &str, filename: &str) -> Result<(), ClientError> {
        if filename.is_empty() {
            return Ok(());
        }
        let response = self
            .request(&format!("ADD_FILE {} {}", token(username)?, token(filename)?))
            .await?;
        debug!(response = %response, "Recorded file");
        Ok(())
    }

    /// Fetches users, sessions and files and renders the statistics report.
    pub async fn generate_report(&mut self) -> Result<String, ClientError> {
        let users = self.request("SELECT username FROM users").await?;
        let logins = self
            .request("SELECT username, login_time, logout_time FROM logins")
            .await?;
        let files = self
            .request("SELECT username, filename, upload_time FROM files")
            .await?;
        Ok(format_report(&users, &logins, &files))
    }
}

/// Rejects values that would split into several tokens.
fn token(value: &str) -> Result<&str, ClientError> {
    if value.is_empty() || value.contains(char::is_whitespace) || value.contains('\0') {
        return Err(ClientError::InvalidArgument(value.to_string()));
    }
    Ok(value)
}

/// Lines of a query response; empty for errors and empty results.
fn result_lines(response: &str) -> impl Iterator<Item = &str> {
    let usable = !response.is_empty() && !response.starts_with("ERROR");
    response
        .lines()
        .filter(move |line| usable && !line.trim().is_empty())
}

/// Renders the statistics report from three raw query responses.
///
/// ```text
/// Server Stats:
/// Users:
///  alice
/// Stats:
///  alice: 2024-01-01 10:00:00 - null
/// Files:
///  alice uploaded notes.txt
/// ```
pub fn format_report(users: &str, logins: &str, files: &str) -> String {
    let mut out = String::from("Server Stats:\n");

    out.push_str("Users:\n");
    for line in result_lines(users) {
        out.push(' ');
        out.push_str(line.trim());
        out.push('\n');
    }

    out.push_str("Stats:\n");
    for line in result_lines(logins) {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 2 {
            continue;
        }
        let logout = match parts.get(2) {
            Some(&t) if t != "None" && !t.is_empty() => t,
            _ => "null",
        };
        out.push_str(&format!(" {}: {} - {}\n", parts[0], parts[1], logout));
    }

    out.push_str("Files:\n");
    for line in result_lines(files) {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 2 {
            continue;
        }
        out.push_str(&format!(" {} uploaded {}\n", parts[0], parts[1]));
    }

    out
}
