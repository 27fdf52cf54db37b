//! Key-value persistence for map graphs and route sessions.
//!
//! This module defines the [`StorageBackend`] trait and provides implementations:
//! - [`MemoryBackend`]: In-memory storage for tests and ephemeral devices
//! - `RocksDBBackend`: Persistent on-device storage (`rocksdb-backend` feature)
//!
//! Keys are plain strings (`activeRoute`, `routeHistory`, `node:<id>`, ...)
//! and values are the JSON text of the record stored under them.

mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use memory::MemoryBackend;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDBBackend;

use crate::error::Result;

/// Key-value pair returned by prefix scans.
pub type KeyValue = (String, String);

/// A synchronous key-value store with read-after-write consistency.
///
/// Implementations must apply [`StorageBackend::write_batch`] atomically: a
/// reader never observes half of a batch.
pub trait StorageBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Storage`](crate::MapError::Storage) if the write fails.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Retrieve the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Check if a key exists.
    fn contains(&self, key: &str) -> Result<bool>;

    /// All pairs whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>>;

    /// Apply a batch of writes atomically.
    ///
    /// Either all operations are applied or none are.
    fn write_batch(&mut self, operations: Vec<WriteOp>) -> Result<()>;

    /// Flush buffered writes to durable storage.
    fn flush(&mut self) -> Result<()>;
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store a value
    Set {
        /// Key to write
        key: String,
        /// JSON text to store
        value: String,
    },
    /// Remove a key
    Remove {
        /// Key to remove
        key: String,
    },
}

impl WriteOp {
    /// Shorthand for [`WriteOp::Set`].
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        WriteOp::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for [`WriteOp::Remove`].
    pub fn remove(key: impl Into<String>) -> Self {
        WriteOp::Remove { key: key.into() }
    }
}
