//! Connection Handling Module
//!
//! Services accepted Unix-socket connections, one request per connection.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          accept loop (daemon module)        │
//! └──────────────────────┬──────────────────────┘
//!                        │ one connection at a time
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │  read line ──> parse ──> execute ──> write  │
//! │                 then close                  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The accept loop awaits each connection to completion before accepting
//! the next; the daemon bounds that wait with a per-connection deadline so
//! one hung client cannot starve the socket forever.

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionStats, MAX_LINE_BYTES};
