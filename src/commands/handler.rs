//! Request Dispatcher
//!
//! Executes decoded requests against the secret store and produces the
//! wire response. This is the seam between protocol and storage: the
//! connection handler hands a [`Request`] in, gets a [`Response`] back,
//! and no store error ever escapes as anything but a typed wire error.

use crate::protocol::{ErrorKind, Request, Response};
use crate::store::SecretStore;
use std::sync::Arc;
use tracing::debug;

/// Dispatches requests to the store.
///
/// Cheap to clone; the daemon constructs one per accepted connection.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The shared secret store
    store: Arc<SecretStore>,
    /// TTL applied when a SET carries no explicit ttl field
    default_ttl_secs: i64,
}

impl CommandHandler {
    /// Creates a handler over the given store.
    ///
    /// `default_ttl_secs` comes from daemon configuration and is applied to
    /// every SET whose ttl field was omitted on the wire.
    pub fn new(store: Arc<SecretStore>, default_ttl_secs: i64) -> Self {
        Self {
            store,
            default_ttl_secs,
        }
    }

    /// Executes a request and returns the response to send back.
    pub fn execute(&self, request: Request) -> Response {
        match request {
            Request::Get { service } => match self.store.get(&service) {
                Ok(secret) => {
                    debug!(service = %service, "cache hit");
                    Response::Secret(secret)
                }
                Err(err) => {
                    debug!(service = %service, "cache miss");
                    Response::Error(ErrorKind::from(err))
                }
            },
            Request::Set {
                service,
                secret,
                ttl_secs,
            } => {
                let ttl_secs = ttl_secs.unwrap_or(self.default_ttl_secs);
                match self.store.set(&service, &secret, ttl_secs) {
                    Ok(()) => {
                        debug!(service = %service, ttl_secs = ttl_secs, "secret cached");
                        Response::Ok
                    }
                    Err(err) => Response::Error(ErrorKind::from(err)),
                }
            }
        }
    }
}
