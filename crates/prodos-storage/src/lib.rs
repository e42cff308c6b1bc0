//! Durable per-profile key-value storage for the ProductionOS admin client.
//!
//! This crate provides the client-side equivalent of the browser's
//! localStorage: a small set of singleton records that survive restarts of
//! the same profile. Two properties drive the design:
//!
//! - **Synchronous**: callers never suspend on a storage access, so session
//!   and rate-limit checks stay cheap enough to run on every navigation.
//! - **Degrading**: a broken storage layer (missing directory, bad
//!   permissions, corrupt file) must never crash authentication. `get`
//!   answers absent, `set`/`delete` are best-effort and logged.

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::PersistentStore;

use thiserror::Error;

/// Error type for the fallible internals of storage backends.
///
/// These never cross the [`PersistentStore`] boundary; backends translate
/// them into degraded absent/no-op behavior and a log line.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for storage internals.
pub type StoreResult<T> = Result<T, StoreError>;
