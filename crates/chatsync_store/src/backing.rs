//! Pass-through persistence backing.
//!
//! The store forwards accepted writes to a backing keyed by entity
//! identifier. The backing is durable storage only; it contributes no
//! consistency logic, and a backing failure never corrupts the
//! in-memory state.

use crate::error::StoreResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A durable key-value backing for store entities.
///
/// Writes arrive after the corresponding mutation has committed
/// in memory; each write carries a fully serialized entity, never a
/// partial one.
pub trait StateBacking: Send + Sync {
    /// Stores serialized entity bytes under a key.
    fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()>;

    /// Removes a key. Removing an absent key is a no-op.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Reads serialized entity bytes.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}

/// An in-memory backing.
///
/// Suitable for unit tests, integration tests, and ephemeral sessions
/// that don't need persistence. Thread-safe.
#[derive(Debug, Default)]
pub struct InMemoryBacking {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBacking {
    /// Creates a new empty backing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored keys, ordered.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl StateBacking for InMemoryBacking {
    fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.data.write().insert(key.to_string(), bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }
}
