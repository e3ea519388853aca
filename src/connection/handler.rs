//! Connection Servicing
//!
//! Services one client connection end-to-end: read exactly one request
//! line, dispatch it, write exactly one response, close. There are no
//! persistent sessions and no pipelining; a connection carries one
//! request, which keeps the sequential accept loop trivial to reason
//! about.
//!
//! ## Buffer Management
//!
//! A `BytesMut` accumulates incoming data until the line terminator
//! arrives; a stream read may deliver the line in pieces. The buffer is
//! bounded so a client cannot grow it without limit.

use crate::commands::CommandHandler;
use crate::protocol::{parse_request, ErrorKind, Response};
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, trace, warn};

/// Longest accepted request line, terminator included (8 KiB)
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 256;

/// Counters over the daemon's whole lifetime.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total connections accepted
    pub connections_accepted: AtomicU64,
    /// Requests answered with a success response
    pub requests_served: AtomicU64,
    /// Requests answered with an error response, or dropped connections
    pub request_errors: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self) {
        self.request_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors that can occur while servicing a connection.
///
/// None of these reach the client as-is; they are logged and rendered as a
/// bare `ERROR` response where the stream still permits a write.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error on the socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream before completing a request line
    #[error("connection closed before a full request line arrived")]
    UnexpectedEof,

    /// Request line exceeded [`MAX_LINE_BYTES`]
    #[error("request line exceeds {MAX_LINE_BYTES} bytes")]
    LineTooLong,

    /// Request line is not valid UTF-8
    #[error("request line is not valid UTF-8")]
    InvalidUtf8,
}

/// Services a single connection.
struct Connection {
    stream: UnixStream,
    buffer: BytesMut,
    handler: CommandHandler,
}

impl Connection {
    fn new(stream: UnixStream, handler: CommandHandler) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            handler,
        }
    }

    /// Reads one request, executes it, writes the response.
    ///
    /// Returns the response that was sent, so the caller can account for
    /// successes and failures.
    async fn serve_one(&mut self) -> Result<Response, ConnectionError> {
        let line = self.read_line().await?;
        trace!(len = line.len(), "request line received");

        let response = match parse_request(&line) {
            Ok(request) => self.handler.execute(request),
            Err(err) => {
                debug!(error = %err, "rejected request line");
                Response::Error(ErrorKind::InvalidCommand)
            }
        };

        self.stream.write_all(&response.to_bytes()).await?;
        self.stream.flush().await?;
        Ok(response)
    }

    /// Accumulates stream data until one full line is buffered.
    async fn read_line(&mut self) -> Result<String, ConnectionError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                let text =
                    std::str::from_utf8(&line).map_err(|_| ConnectionError::InvalidUtf8)?;
                return Ok(text.trim_end_matches(['\r', '\n']).to_string());
            }

            if self.buffer.len() >= MAX_LINE_BYTES {
                return Err(ConnectionError::LineTooLong);
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ConnectionError::UnexpectedEof);
            }
        }
    }
}

/// Handles one accepted connection to completion.
///
/// Protocol-level failures come back as typed wire errors; anything else
/// (I/O trouble, an overlong line) is logged, answered with a bare `ERROR`
/// when the stream still accepts a write, and the connection closed. The
/// accept loop keeps running either way.
pub async fn handle_connection(
    stream: UnixStream,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    stats.connection_opened();

    let mut connection = Connection::new(stream, handler);
    match connection.serve_one().await {
        Ok(Response::Error(_)) => stats.request_failed(),
        Ok(_) => stats.request_served(),
        Err(err) => {
            stats.request_failed();
            warn!(error = %err, "connection ended without a valid request");
            // best effort; the peer may already be gone
            let _ = connection
                .stream
                .write_all(&Response::Error(ErrorKind::Internal).to_bytes())
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SecretStore;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicU32;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    static SOCKET_SEQ: AtomicU32 = AtomicU32::new(0);

    fn test_socket_path() -> PathBuf {
        let seq = SOCKET_SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "credcache-conn-test-{}-{}.sock",
            std::process::id(),
            seq
        ))
    }

    async fn spawn_test_server() -> (PathBuf, Arc<SecretStore>, Arc<ConnectionStats>) {
        let path = test_socket_path();
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let store = Arc::new(SecretStore::new());
        let stats = Arc::new(ConnectionStats::new());

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&store_clone), 600);
                handle_connection(stream, handler, Arc::clone(&stats_clone)).await;
            }
        });

        (path, store, stats)
    }

    async fn roundtrip(path: &PathBuf, request: &[u8]) -> Vec<u8> {
        let mut client = UnixStream::connect(path).await.unwrap();
        client.write_all(request).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (path, _, _) = spawn_test_server().await;

        let response = roundtrip(&path, b"SET mercurial fooobar\r\n").await;
        assert_eq!(response, b"OK\r\n");

        let response = roundtrip(&path, b"GET mercurial\r\n").await;
        assert_eq!(response, b"fooobar\r\nOK\r\n");
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let (path, _, _) = spawn_test_server().await;

        let response = roundtrip(&path, b"GET absent\r\n").await;
        assert_eq!(response, b"MissingEntry\r\nERROR\r\n");
    }

    #[tokio::test]
    async fn test_unknown_verb() {
        let (path, _, _) = spawn_test_server().await;

        let response = roundtrip(&path, b"PING x\r\n").await;
        assert_eq!(response, b"InvalidCommand\r\nERROR\r\n");
    }

    #[tokio::test]
    async fn test_line_delivered_in_pieces() {
        let (path, _, _) = spawn_test_server().await;

        let mut client = UnixStream::connect(&path).await.unwrap();
        client.write_all(b"SET mercu").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.write_all(b"rial stuff 600\r\n").await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"OK\r\n");
    }

    #[tokio::test]
    async fn test_eof_before_terminator() {
        let (path, _, stats) = spawn_test_server().await;

        {
            let mut client = UnixStream::connect(&path).await.unwrap();
            client.write_all(b"GET trunc").await.unwrap();
            client.shutdown().await.unwrap();
            let mut response = Vec::new();
            let _ = client.read_to_end(&mut response).await;
            assert_eq!(response, b"ERROR\r\n");
        }

        // the server survives and keeps answering
        let response = roundtrip(&path, b"GET still-alive\r\n").await;
        assert_eq!(response, b"MissingEntry\r\nERROR\r\n");
        assert!(stats.request_errors.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn test_stats_accounting() {
        let (path, _, stats) = spawn_test_server().await;

        roundtrip(&path, b"SET svc secret\r\n").await;
        roundtrip(&path, b"GET svc\r\n").await;
        roundtrip(&path, b"GET nothing\r\n").await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 3);
        assert_eq!(stats.requests_served.load(Ordering::Relaxed), 2);
        assert_eq!(stats.request_errors.load(Ordering::Relaxed), 1);
    }
}
