//! In-Memory Secret Store with Sliding Expiration
//!
//! This module implements the core store for credcache: a mapping from
//! service identifier to cached secret, each entry carrying a time-to-live
//! that is reapplied on every successful read.
//!
//! ## Design Decisions
//!
//! 1. **Single exclusive accessor**: one `Mutex` serializes every operation.
//!    Exactly two tasks ever touch the store (the accept loop and the
//!    background sweeper), so sharding would buy nothing here.
//! 2. **Sliding expiration**: a successful `get` pushes the deadline out to
//!    `now + ttl` again, so a credential stays cached while it is in use.
//! 3. **Lazy eviction**: `get` checks the deadline before answering and
//!    removes an expired entry on the spot. No caller ever observes a stale
//!    secret, regardless of sweeper timing.
//!
//! The lock is never held across an `.await` or any blocking I/O.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors reported by the store.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The service has no cached secret, or it expired before the lookup.
    #[error("no cached secret for that service")]
    MissingEntry,

    /// Malformed arguments: empty service or secret, a negative ttl, or a
    /// field containing space/CR/LF (which the line protocol cannot carry).
    #[error("invalid service, secret or ttl")]
    InvalidEntry,
}

/// A cached secret with its expiration deadline.
#[derive(Debug, Clone)]
pub struct SecretEntry {
    /// The cached secret value
    pub secret: String,
    /// When this entry stops being served
    pub expires_at: Instant,
    /// Time-to-live reapplied on every successful read
    pub ttl: Duration,
}

impl SecretEntry {
    /// Creates an entry expiring `ttl` from now.
    pub fn new(secret: String, ttl: Duration) -> Self {
        Self {
            secret,
            expires_at: Instant::now() + ttl,
            ttl,
        }
    }

    /// Checks whether the deadline has passed at `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at < now
    }
}

/// Checks that a protocol field can round-trip through the line codec.
///
/// Space is the token separator and CR/LF terminate a request line, so none
/// of them may appear inside a service identifier or secret value.
fn valid_field(s: &str) -> bool {
    !s.is_empty() && !s.contains([' ', '\r', '\n'])
}

/// The in-memory secret store shared by the accept loop and the sweeper.
///
/// # Thread Safety
///
/// Designed to be wrapped in an `Arc` and shared across tasks. All
/// operations take `&self` and serialize through one internal lock.
///
/// # Example
///
/// ```
/// use credcache::store::SecretStore;
///
/// let store = SecretStore::new();
/// store.set("alice@example.org", "hunter2", 600).unwrap();
/// assert_eq!(store.get("alice@example.org").unwrap(), "hunter2");
/// ```
#[derive(Debug, Default)]
pub struct SecretStore {
    entries: Mutex<HashMap<String, SecretEntry>>,
}

impl SecretStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Caches a secret for `service`, expiring `ttl_secs` from now.
    ///
    /// An existing entry for the same service is overwritten entirely, ttl
    /// and deadline included. On error the store is left unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEntry`] if `service` or `secret` is
    /// empty or contains space/CR/LF, or if `ttl_secs` is negative.
    pub fn set(&self, service: &str, secret: &str, ttl_secs: i64) -> Result<(), StoreError> {
        if ttl_secs < 0 {
            return Err(StoreError::InvalidEntry);
        }
        self.set_with_ttl(service, secret, Duration::from_secs(ttl_secs as u64))
    }

    /// Caches a secret with a `Duration` ttl.
    ///
    /// Same validation as [`set`](Self::set) except that a negative ttl is
    /// unrepresentable here.
    pub fn set_with_ttl(
        &self,
        service: &str,
        secret: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if !valid_field(service) || !valid_field(secret) {
            return Err(StoreError::InvalidEntry);
        }

        let mut entries = self.entries.lock().unwrap();
        entries.insert(service.to_string(), SecretEntry::new(secret.to_string(), ttl));
        Ok(())
    }

    /// Returns the cached secret for `service` and extends its deadline.
    ///
    /// The expiration check happens first: an entry whose deadline has
    /// passed is removed and reported as missing, so an expired secret is
    /// never returned. On a hit the deadline becomes `now + ttl` again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEntry`] if the service is absent or its
    /// entry expired.
    pub fn get(&self, service: &str) -> Result<String, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();

        if let Some(entry) = entries.get(service) {
            if entry.is_expired(now) {
                entries.remove(service);
                return Err(StoreError::MissingEntry);
            }
        }

        match entries.get_mut(service) {
            Some(entry) => {
                entry.expires_at = now + entry.ttl;
                Ok(entry.secret.clone())
            }
            None => Err(StoreError::MissingEntry),
        }
    }

    /// Evicts expired entries.
    ///
    /// With `Some(service)` only that key is examined; with `None` the whole
    /// mapping is swept. Returns the number of entries removed.
    pub fn sweep(&self, service: Option<&str>) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();

        match service {
            Some(service) => {
                let expired = entries
                    .get(service)
                    .map(|entry| entry.is_expired(now))
                    .unwrap_or(false);
                if expired {
                    entries.remove(service);
                    1
                } else {
                    0
                }
            }
            None => {
                let before = entries.len();
                entries.retain(|_, entry| !entry.is_expired(now));
                before - entries.len()
            }
        }
    }

    /// Discards every cached secret unconditionally.
    pub fn reset(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Returns the number of cached entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
