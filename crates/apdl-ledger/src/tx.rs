//! Per-invocation ledger transaction

use tracing::debug;

use crate::{LedgerStore, Result, WriteSet};

/// One invocation's view of the ledger.
///
/// Reads fall through to the store unless this transaction already wrote
/// the key. Writes stay buffered until [`LedgerTx::commit`]; dropping the
/// transaction discards them.
pub struct LedgerTx<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    writes: WriteSet,
}

impl<'a, S: LedgerStore + ?Sized> LedgerTx<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            writes: WriteSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(value) => Ok(Some(value.to_vec())),
            None => self.store.get(key),
        }
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.writes.put(key, value);
    }

    /// Writes buffered so far
    pub fn pending(&self) -> &WriteSet {
        &self.writes
    }

    /// Hand every buffered write to the store in one call
    pub fn commit(self) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        debug!(writes = self.writes.len(), "committing write set");
        self.store.apply(self.writes)
    }
}
