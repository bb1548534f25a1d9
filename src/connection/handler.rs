//! Connection Handler Module
//!
//! This module handles individual client connections. Each client gets its
//! own handler task that runs in a loop, reading frames and sending
//! responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Extract frame (or read) │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse + dispatch        │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send response + NUL     │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / transport error
//!        │
//!        ▼
//! 5. Buffer dropped, socket shut down, task ends
//! ```
//!
//! Commands on one connection are answered strictly in arrival order: a
//! frame is fully resolved and its response written before the next frame
//! is extracted.

use crate::commands::CommandHandler;
use crate::protocol::{FrameError, FrameReader, Response};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::task::JoinError;
use tracing::{debug, info, trace, warn};

/// Minimum spare capacity kept in the read buffer before each read
const MIN_READ_CAPACITY: usize = 1024;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the connection's `FrameReader`; no other task ever sees it.
pub struct ConnectionHandler<S = TcpStream> {
    /// The transport for this connection
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    reader: FrameReader,

    /// The command handler (shared store behind it)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The transport for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            reader: FrameReader::new(),
            command_handler,
            stats,
        }
    }

    /// Closes the connection if an unterminated frame grows past `max` bytes.
    pub fn with_frame_limit(mut self, max: Option<usize>) -> Self {
        if let Some(max) = max {
            self.reader = FrameReader::with_limit(max);
        }
        self
    }

    /// Runs the main connection loop.
    ///
    /// Reads frames from the client, executes them, and sends back
    /// responses until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    info!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::UnexpectedEof => {
                    debug!(
                        client = %self.addr,
                        discarded = self.reader.buffered(),
                        "Client closed mid-frame"
                    )
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.reader.clear();
        let _ = self.stream.shutdown().await;
        self.stats.connection_closed();
        result
    }

    /// The main read-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(frame) = self.reader.try_extract() {
                trace!(
                    client = %self.addr,
                    remaining = self.reader.buffered(),
                    "Extracted frame"
                );

                let response = self.dispatch(frame).await?;
                self.stats.command_processed();

                self.send_response(&response).await?;
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Runs the command off the async workers; the store blocks.
    async fn dispatch(&self, frame: String) -> Result<Response, ConnectionError> {
        let handler = self.command_handler.clone();
        let response = tokio::task::spawn_blocking(move || handler.execute_frame(&frame)).await?;
        Ok(response)
    }

    /// Reads more data from the socket into the frame buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        self.reader.check_limit()?;

        let buffer = self.reader.buffer_mut();
        if buffer.capacity() - buffer.len() < MIN_READ_CAPACITY {
            buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(self.reader.buffer_mut()).await?;

        if n == 0 {
            // Connection closed by client
            if self.reader.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial frame in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unterminated frame grew too large
    #[error("Frame error: {0}")]
    FrameError(#[from] FrameError),

    /// The blocking dispatch task did not complete
    #[error("Dispatch failed: {0}")]
    DispatchFailed(#[from] JoinError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial frame)
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors never propagate past this point.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `addr` - The client's socket address
/// * `command_handler` - The command handler for executing commands
/// * `stats` - Shared connection statistics
/// * `max_frame` - Optional cap on an unterminated frame
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_frame: Option<usize>,
) {
    let handler =
        ConnectionHandler::new(stream, addr, command_handler, stats).with_frame_limit(max_frame);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected | ConnectionError::UnexpectedEof => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};

    async fn create_test_server(
        max_frame: Option<usize>,
    ) -> (SocketAddr, Arc<SqliteStore>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let stats = Arc::new(ConnectionStats::new());

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(store_clone.clone());
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler,
                    stats,
                    max_frame,
                ));
            }
        });

        (addr, store, stats)
    }

    /// Reads one NUL-terminated response.
    async fn read_response(client: &mut TcpStream, reader: &mut FrameReader) -> String {
        loop {
            if let Some(frame) = reader.try_extract() {
                return frame;
            }
            let mut buf = [0u8; 256];
            let n = timeout(Duration::from_secs(2), client.read(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "server closed the connection");
            reader.feed(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let (addr, _, _) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut reader = FrameReader::new();

        client.write_all(b"LOGIN alice secret\0").await.unwrap();
        assert_eq!(read_response(&mut client, &mut reader).await, "login success");

        client.write_all(b"LOGIN alice wrong\0").await.unwrap();
        assert_eq!(read_response(&mut client, &mut reader).await, "login failed");
    }

    #[tokio::test]
    async fn test_split_message_over_tcp() {
        let (addr, _, _) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.set_nodelay(true).unwrap();
        let mut reader = FrameReader::new();

        for part in [&b"LOGIN a"[..], b" b", b"\0"] {
            client.write_all(part).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(read_response(&mut client, &mut reader).await, "login success");
    }

    #[tokio::test]
    async fn test_coalesced_messages_in_order() {
        let (addr, _, _) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut reader = FrameReader::new();

        client
            .write_all(b"LOGIN a pw\0ADD_FILE a f\0FOO\0SELECT username, filename FROM files\0")
            .await
            .unwrap();

        assert_eq!(read_response(&mut client, &mut reader).await, "login success");
        assert_eq!(read_response(&mut client, &mut reader).await, "done");
        assert_eq!(
            read_response(&mut client, &mut reader).await,
            "ERROR: Unknown Command"
        );
        assert_eq!(read_response(&mut client, &mut reader).await, "a|f");
    }

    #[tokio::test]
    async fn test_errors_keep_connection_open() {
        let (addr, _, _) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut reader = FrameReader::new();

        client.write_all(b"\0").await.unwrap();
        assert_eq!(
            read_response(&mut client, &mut reader).await,
            "ERROR: Unknown Command"
        );

        client.write_all(b"SELECT * FROM nowhere\0").await.unwrap();
        assert!(read_response(&mut client, &mut reader)
            .await
            .starts_with("ERROR: "));

        client.write_all(b"LOGOUT\0").await.unwrap();
        assert!(read_response(&mut client, &mut reader)
            .await
            .starts_with("ERROR: wrong number of arguments"));

        client.write_all(b"SELECT 1\0").await.unwrap();
        assert_eq!(read_response(&mut client, &mut reader).await, "1");
    }

    #[tokio::test]
    async fn test_empty_query_response() {
        let (addr, _, _) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SELECT * FROM users\0").await.unwrap();

        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"\0");
    }

    #[tokio::test]
    async fn test_nul_in_value_keeps_stream_in_sync() {
        let (addr, _, _) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut reader = FrameReader::new();

        client
            .write_all(b"SELECT 'x' || char(0) || 'y'\0LOGIN a b\0SELECT 42\0")
            .await
            .unwrap();

        assert_eq!(read_response(&mut client, &mut reader).await, "x\u{fffd}y");
        assert_eq!(read_response(&mut client, &mut reader).await, "login success");
        assert_eq!(read_response(&mut client, &mut reader).await, "42");
    }

    #[tokio::test]
    async fn test_connections_share_store() {
        let (addr, _, _) = create_test_server(None).await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut first_reader = FrameReader::new();
        let mut second_reader = FrameReader::new();

        first.write_all(b"LOGIN bob pw\0").await.unwrap();
        assert_eq!(read_response(&mut first, &mut first_reader).await, "login success");

        second.write_all(b"LOGIN bob nope\0").await.unwrap();
        assert_eq!(read_response(&mut second, &mut second_reader).await, "login failed");
    }

    #[tokio::test]
    async fn test_partial_frame_discarded_on_close() {
        let (addr, store, stats) = create_test_server(None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"ADD_FILE a never-sent").await.unwrap();
        drop(client);

        tokio::time::sleep(Duration::from_millis(100)).await;

        use crate::storage::Store;
        assert_eq!(store.query("SELECT * FROM files"), Ok(vec![]));
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_frame_limit_closes_connection() {
        let (addr, _, stats) = create_test_server(Some(16)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(&[b'x'; 64]).await.unwrap();

        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server(None).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"LOGIN s pw\0").await.unwrap();
        let mut reader = FrameReader::new();
        read_response(&mut client, &mut reader).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 11);
        assert_eq!(
            stats.bytes_written.load(Ordering::Relaxed),
            "login success\0".len() as u64
        );

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_mock_stream_reassembly() {
        let stream = tokio_test::io::Builder::new()
            .read(b"LOGIN a")
            .read(b" b\0LOGOUT a\0")
            .write(b"login success\0")
            .write(b"done\0")
            .build();

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let stats = Arc::new(ConnectionStats::new());
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let handler =
            ConnectionHandler::new(stream, addr, CommandHandler::new(store), stats.clone());
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
