//! Blocking Convenience Client
//!
//! A thin synchronous wrapper over the wire protocol for tools that just
//! want a cached secret: one connection per request, one request line out,
//! the full response back, connection closed.
//!
//! Callers that compose compound service keys (for example
//! `"<username>@<service>"`) do so before calling in; the daemon treats the
//! key as opaque.
//!
//! A failed `get` usually just means "nothing cached": callers are
//! expected to fall back to prompting and then `set` the fresh secret.

use crate::protocol::CRLF;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach or talk to the daemon
    #[error("I/O error talking to the daemon: {0}")]
    Io(#[from] std::io::Error),

    /// A field contains space/CR/LF, which the line protocol cannot carry
    #[error("field contains space or line-break characters")]
    InvalidField,

    /// The daemon answered with an error response
    #[error("daemon reported an error: {}", detail.as_deref().unwrap_or("unspecified"))]
    Request { detail: Option<String> },
}

/// Checks a field against the wire framing rules before it is sent.
fn valid_field(s: &str) -> bool {
    !s.is_empty() && !s.contains([' ', '\r', '\n'])
}

/// A client for one daemon socket.
///
/// # Example
///
/// ```no_run
/// use credcache::client::Client;
///
/// let client = Client::new("/home/alice/.credcache/socket");
/// client.set("alice@git", "hunter2", Some(900))?;
/// let secret = client.get("alice@git")?;
/// # Ok::<(), credcache::client::ClientError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
}

impl Client {
    /// Creates a client talking to the daemon at `socket_path`.
    ///
    /// The path is explicit; resolving it from the environment (the
    /// `CREDCACHE_SOCKET` line the daemon prints at startup) is the
    /// caller's business.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Fetches the cached secret for `service`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Request`] for any daemon-side failure; a missing or
    /// expired entry carries `MissingEntry` as detail and is normally
    /// treated as a cache miss rather than a hard error.
    pub fn get(&self, service: &str) -> Result<String, ClientError> {
        if !valid_field(service) {
            return Err(ClientError::InvalidField);
        }

        match self.request(&format!("GET {service}"))? {
            Some(secret) => Ok(secret),
            // a success response without a payload never follows a GET
            None => Err(ClientError::Request { detail: None }),
        }
    }

    /// Caches `secret` for `service`.
    ///
    /// With `ttl_secs: None` the field is omitted from the request and the
    /// daemon applies its configured default.
    pub fn set(&self, service: &str, secret: &str, ttl_secs: Option<u64>) -> Result<(), ClientError> {
        if !valid_field(service) || !valid_field(secret) {
            return Err(ClientError::InvalidField);
        }

        let line = match ttl_secs {
            Some(ttl) => format!("SET {service} {secret} {ttl}"),
            None => format!("SET {service} {secret}"),
        };
        self.request(&line)?;
        Ok(())
    }

    /// Sends one request line and decodes the response.
    ///
    /// Returns the payload line of a success response, if there is one.
    fn request(&self, line: &str) -> Result<Option<String>, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.write_all(line.as_bytes())?;
        stream.write_all(CRLF.as_bytes())?;

        // the daemon answers and closes, so read to EOF
        let mut response = String::new();
        stream.read_to_string(&mut response)?;

        let trimmed = response.trim();
        match trimmed.split_once(CRLF) {
            Some((payload, "OK")) => Ok(Some(payload.to_string())),
            Some((payload, _)) => Err(ClientError::Request {
                detail: Some(payload.to_string()),
            }),
            None if trimmed == "OK" => Ok(None),
            None => Err(ClientError::Request { detail: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandHandler;
    use crate::connection::{handle_connection, ConnectionStats};
    use crate::store::SecretStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UnixListener;

    static SOCKET_SEQ: AtomicU32 = AtomicU32::new(0);

    async fn spawn_test_server() -> PathBuf {
        let seq = SOCKET_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "credcache-client-test-{}-{}.sock",
            std::process::id(),
            seq
        ));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let store = Arc::new(SecretStore::new());
        let stats = Arc::new(ConnectionStats::new());

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&store), 600);
                handle_connection(stream, handler, Arc::clone(&stats)).await;
            }
        });

        path
    }

    #[tokio::test]
    async fn test_cache_session_end_to_end() {
        let path = spawn_test_server().await;

        tokio::task::spawn_blocking(move || {
            let client = Client::new(&path);

            // cache with the daemon default, read it straight back
            client.set("mercurial", "fooobar", None).unwrap();
            assert_eq!(client.get("mercurial").unwrap(), "fooobar");

            // overwrite with a one-second ttl
            client.set("mercurial", "stuff", Some(1)).unwrap();
            assert_eq!(client.get("mercurial").unwrap(), "stuff");

            // no reads for three seconds: the entry expires
            std::thread::sleep(Duration::from_secs(3));
            match client.get("mercurial") {
                Err(ClientError::Request { detail }) => {
                    assert_eq!(detail.as_deref(), Some("MissingEntry"))
                }
                other => panic!("expected a cache miss, got {:?}", other),
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_surfaces_detail() {
        let path = spawn_test_server().await;

        tokio::task::spawn_blocking(move || {
            let client = Client::new(&path);
            match client.get("absent") {
                Err(ClientError::Request { detail }) => {
                    assert_eq!(detail.as_deref(), Some("MissingEntry"))
                }
                other => panic!("expected Request error, got {:?}", other),
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fields_validated_before_sending() {
        let path = spawn_test_server().await;

        tokio::task::spawn_blocking(move || {
            let client = Client::new(&path);
            assert!(matches!(
                client.set("svc", "two words", None),
                Err(ClientError::InvalidField)
            ));
            assert!(matches!(
                client.set("", "secret", None),
                Err(ClientError::InvalidField)
            ));
            assert!(matches!(
                client.get("bad service"),
                Err(ClientError::InvalidField)
            ));
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_connect_failure_is_io() {
        let client = Client::new("/nonexistent/credcache.sock");
        assert!(matches!(client.get("svc"), Err(ClientError::Io(_))));
    }
}
