//! RocksDB storage backend for on-device persistence.
//!
//! Keeps the active route and route history across app restarts. All writes
//! go through the WAL and are durable immediately.

use super::{KeyValue, StorageBackend, WriteOp};
use crate::error::{MapError, Result};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

/// RocksDB-backed persistent storage.
#[derive(Clone)]
pub struct RocksDBBackend {
    db: Arc<DB>,
}

impl RocksDBBackend {
    /// Open or create a RocksDB database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Storage`] if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        Self::open_with_options(path, opts)
    }

    /// Open a RocksDB database with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, opts: Options) -> Result<Self> {
        let db = DB::open(&opts, path.as_ref()).map_err(|e| {
            MapError::storage(
                format!("Failed to open RocksDB at {:?}", path.as_ref()),
                Some(e),
            )
        })?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn decode_text(bytes: Vec<u8>, key: &str) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        MapError::serialization(format!("Record {key} is not valid UTF-8"), Some(e))
    })
}

impl StorageBackend for RocksDBBackend {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| MapError::storage(format!("Failed to write {key}"), Some(e)))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let raw = self
            .db
            .get(key)
            .map_err(|e| MapError::storage(format!("Failed to read {key}"), Some(e)))?;
        raw.map(|bytes| decode_text(bytes, key)).transpose()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| MapError::storage(format!("Failed to remove {key}"), Some(e)))
    }

    fn contains(&self, key: &str) -> Result<bool> {
        self.db
            .get_pinned(key)
            .map(|opt| opt.is_some())
            .map_err(|e| MapError::storage(format!("Failed to look up {key}"), Some(e)))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let mut results = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| MapError::storage("Failed to iterate over prefix", Some(e)))?;

            // The iterator runs past the prefix without a prefix extractor
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }

            let key = decode_text(key.to_vec(), prefix)?;
            let value = decode_text(value.to_vec(), &key)?;
            results.push((key, value));
        }

        Ok(results)
    }

    fn write_batch(&mut self, operations: Vec<WriteOp>) -> Result<()> {
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                WriteOp::Set { key, value } => batch.put(key, value),
                WriteOp::Remove { key } => batch.delete(key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| MapError::storage("Failed to write batch", Some(e)))
    }

    fn flush(&mut self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| MapError::storage("Failed to flush database", Some(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_backend() -> (RocksDBBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = RocksDBBackend::open(temp_dir.path()).unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn test_set_and_get() {
        let (mut backend, _temp) = create_temp_backend();
        backend.set("routeHistory", "[]").unwrap();
        assert_eq!(backend.get("routeHistory").unwrap().as_deref(), Some("[]"));
        assert!(backend.get("activeRoute").unwrap().is_none());
    }

    #[test]
    fn test_contains_and_remove() {
        let (mut backend, _temp) = create_temp_backend();
        assert!(!backend.contains("activeRoute").unwrap());

        backend.set("activeRoute", "{}").unwrap();
        assert!(backend.contains("activeRoute").unwrap());

        backend.remove("activeRoute").unwrap();
        assert!(!backend.contains("activeRoute").unwrap());
    }

    #[test]
    fn test_scan_prefix_stops_at_prefix_end() {
        let (mut backend, _temp) = create_temp_backend();
        backend.set("node:a", "1").unwrap();
        backend.set("node:b", "2").unwrap();
        backend.set("routeHistory", "[]").unwrap();

        let results = backend.scan_prefix("node:").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "node:a");
    }

    #[test]
    fn test_write_batch_mixed_operations() {
        let (mut backend, _temp) = create_temp_backend();
        backend.set("node:a", "1").unwrap();

        backend
            .write_batch(vec![WriteOp::remove("node:a"), WriteOp::set("node:b", "2")])
            .unwrap();

        assert!(backend.get("node:a").unwrap().is_none());
        assert_eq!(backend.get("node:b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_persistence_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let mut backend = RocksDBBackend::open(&path).unwrap();
            backend.set("activeRoute", r#"{"status":"active"}"#).unwrap();
        }

        let backend = RocksDBBackend::open(&path).unwrap();
        assert_eq!(
            backend.get("activeRoute").unwrap().as_deref(),
            Some(r#"{"status":"active"}"#)
        );
    }
}
