//! In-memory storage backend.
//!
//! Clones share the same underlying map, so a [`FloorGraph`](crate::FloorGraph)
//! and a [`SessionManager`](crate::SessionManager) can be handed clones of one
//! backend and observe each other's writes, like two views of a device's
//! local store. Nothing survives the last clone being dropped.

use super::{KeyValue, StorageBackend, WriteOp};
use crate::error::{MapError, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Records = BTreeMap<String, String>;

/// In-memory storage backend using a `BTreeMap` behind an `Arc<RwLock<>>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<Records>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Check if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>> {
        self.data.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>> {
        self.data.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> MapError {
    MapError::storage("Memory backend lock poisoned", None::<std::io::Error>)
}

impl StorageBackend for MemoryBackend {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.write()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.write()?.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let data = self.read()?;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&mut self, operations: Vec<WriteOp>) -> Result<()> {
        // Single write guard for the whole batch
        let mut data = self.write()?;
        for op in operations {
            match op {
                WriteOp::Set { key, value } => {
                    data.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
