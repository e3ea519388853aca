//! Secret Store Module
//!
//! The expiring in-memory secret store plus the background sweeper that
//! reclaims entries nobody reads again.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         SecretStore          │
//! │   Mutex<HashMap<service,     │
//! │         SecretEntry>>        │
//! └──────────────────────────────┘
//!        ▲                ▲
//!        │                │
//!  accept loop        Sweeper
//!  (get/set)     (periodic sweep)
//! ```
//!
//! Two callers share the store: the sequential accept loop and the sweeper
//! task. One mutex serializes them; it is never held across blocking I/O.
//!
//! ## Example
//!
//! ```
//! use credcache::store::SecretStore;
//!
//! let store = SecretStore::new();
//! store.set("alice@git", "hunter2", 600).unwrap();
//! assert_eq!(store.get("alice@git").unwrap(), "hunter2");
//! store.reset();
//! assert!(store.get("alice@git").is_err());
//! ```

pub mod engine;
pub mod sweeper;

// Re-export commonly used types
pub use engine::{SecretEntry, SecretStore, StoreError};
pub use sweeper::{Sweeper, SweeperConfig};
