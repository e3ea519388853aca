//! # credcache - A Local Credential-Caching Daemon
//!
//! credcache holds short-lived secrets (passwords, tokens) in volatile
//! memory on behalf of client processes on the same host, reachable over a
//! Unix domain socket. Interactive tools (version-control clients,
//! credential-helper shims) ask it before re-prompting, so a password
//! typed once stays usable for a configurable time window.
//!
//! Nothing is ever written to disk: restarting the daemon forgets every
//! cached secret. Access control is the socket file's owner-only
//! permission bits.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         credcache                            │
//! │                                                              │
//! │  ┌────────────┐   ┌────────────┐   ┌─────────────┐           │
//! │  │ Unix socket│──>│ Connection │──>│  Command    │           │
//! │  │ (accept    │   │  Handler   │   │  Handler    │           │
//! │  │  loop)     │   │ (one req.) │   └──────┬──────┘           │
//! │  └────────────┘   └────────────┘          │                  │
//! │                                           ▼                  │
//! │  ┌────────────┐              ┌─────────────────────────┐     │
//! │  │ Line       │              │       SecretStore       │     │
//! │  │ Parser     │              │  Mutex<HashMap<service, │     │
//! │  └────────────┘              │        SecretEntry>>    │     │
//! │                              └────────────▲────────────┘     │
//! │                                           │                  │
//! │                              ┌────────────┴────────────┐     │
//! │                              │         Sweeper         │     │
//! │                              │  (background tokio task)│     │
//! │                              └─────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! One CRLF-terminated line per connection:
//!
//! - `SET <service> <secret> [<ttlSeconds>]` → `OK`
//! - `GET <service>` → `<secret>` then `OK`
//! - any failure → `<ErrorKind>` then `ERROR`
//!
//! ## Module Overview
//!
//! - [`store`]: the expiring secret store and its background sweeper
//! - [`protocol`]: request/response line codec
//! - [`commands`]: dispatching decoded requests to the store
//! - [`connection`]: one-request-per-connection servicing
//! - [`daemon`]: single-instance supervision, socket lifecycle, control
//! - [`client`]: blocking convenience client
//!
//! ## Design Highlights
//!
//! ### Sliding Expiration
//!
//! Every successful read pushes an entry's deadline out to `now + ttl`
//! again, so a credential in active use never expires mid-session.
//!
//! ### Lazy + Active Expiry
//!
//! A `GET` checks the deadline before answering and evicts on the spot, so
//! an expired secret is never served. The background sweeper additionally
//! reclaims entries nobody queries again.
//!
//! ### Single Instance Per Directory
//!
//! A PID lock file marks the owning process. Stale locks (dead owner) are
//! removed automatically; a live owner either aborts startup or is
//! terminated and replaced, depending on configuration.

pub mod client;
pub mod commands;
pub mod connection;
pub mod daemon;
pub mod protocol;
pub mod store;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError};
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use daemon::{Control, Daemon, DaemonConfig, DaemonError};
pub use protocol::{parse_request, ErrorKind, ParseError, Request, Response};
pub use store::{SecretStore, StoreError, Sweeper, SweeperConfig};

/// Environment variable naming the daemon's socket, emitted at startup
pub const SOCKET_ENV_VAR: &str = "CREDCACHE_SOCKET";

/// TTL in seconds applied when a SET carries no explicit ttl
pub const DEFAULT_TTL_SECS: i64 = 600;

/// Version of credcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
