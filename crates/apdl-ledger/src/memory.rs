//! In-memory ledger store

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{LedgerStore, Result, WriteSet};

/// In-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Copy of the full key space, for inspection in tests and tooling
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.read().clone()
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.read().get(key).cloned())
    }

    fn apply(&self, writes: WriteSet) -> Result<()> {
        // One write lock for the whole set keeps it atomic for readers
        let mut state = self.state.write();
        for (key, value) in writes {
            state.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_get() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        let mut writes = WriteSet::new();
        writes.put("k", "v");
        store.apply(writes).unwrap();

        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        let mut writes = WriteSet::new();
        writes.put("k", "v");
        store.apply(writes).unwrap();

        assert_eq!(other.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
