//! Wire Protocol Data Types
//!
//! One CRLF-terminated request line per connection, space-separated tokens:
//!
//! ```text
//! GET <service>\r\n
//! SET <service> <secret> [<ttlSeconds>]\r\n
//! ```
//!
//! Responses:
//!
//! ```text
//! GET success:  <secret>\r\nOK\r\n
//! SET success:  OK\r\n
//! failure:      <ErrorKind>\r\nERROR\r\n     (kind may be empty: bare ERROR\r\n)
//! ```
//!
//! Because space separates tokens and CRLF terminates the line, none of
//! them may appear inside a field. The parser enforces this by rejecting
//! wrong token counts; the store rejects embedded separators arriving
//! through the library API.

use crate::store::StoreError;
use std::fmt;

/// The line terminator used on the wire
pub const CRLF: &str = "\r\n";

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `GET <service>` - look up a cached secret
    Get { service: String },
    /// `SET <service> <secret> [<ttlSeconds>]` - cache a secret.
    /// An omitted ttl means the daemon's configured default applies.
    Set {
        service: String,
        secret: String,
        ttl_secs: Option<i64>,
    },
}

/// The failure category carried on the wire before the `ERROR` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key absent or expired at lookup time
    MissingEntry,
    /// Malformed SET arguments: empty field, embedded separator, negative ttl
    InvalidEntry,
    /// Unparseable line, unknown verb, or wrong argument count
    InvalidCommand,
    /// Anything unexpected; rendered as an empty kind
    Internal,
}

impl ErrorKind {
    /// The token written on the wire. `Internal` has none.
    pub fn as_wire(&self) -> &'static str {
        match self {
            ErrorKind::MissingEntry => "MissingEntry",
            ErrorKind::InvalidEntry => "InvalidEntry",
            ErrorKind::InvalidCommand => "InvalidCommand",
            ErrorKind::Internal => "",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl From<StoreError> for ErrorKind {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingEntry => ErrorKind::MissingEntry,
            StoreError::InvalidEntry => ErrorKind::InvalidEntry,
        }
    }
}

/// An encoded response, one per connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK` - successful SET
    Ok,
    /// `<secret>` then `OK` - successful GET
    Secret(String),
    /// `<kind>` then `ERROR` - any failure
    Error(ErrorKind),
}

impl Response {
    /// Serializes the response to its wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::Ok => format!("OK{CRLF}").into_bytes(),
            Response::Secret(secret) => format!("{secret}{CRLF}OK{CRLF}").into_bytes(),
            Response::Error(kind) => {
                let wire = kind.as_wire();
                if wire.is_empty() {
                    format!("ERROR{CRLF}").into_bytes()
                } else {
                    format!("{wire}{CRLF}ERROR{CRLF}").into_bytes()
                }
            }
        }
    }
}
