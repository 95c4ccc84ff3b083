//! APDL Ledger - Access to the replicated key-value state
//!
//! The ledger itself (consensus, replication, block production) lives
//! outside this workspace. What lives here is the narrow surface the
//! agreement logic needs:
//!
//! - [`LedgerStore`]: point reads plus all-or-nothing application of a write set
//! - [`MemoryStore`] and [`SledStore`] backends
//! - [`LedgerTx`]: one invocation's view, buffering writes until commit
//! - [`BalanceLedger`] and [`AgreementStore`]: typed access on top of a `LedgerTx`
//!
//! # Invariants
//!
//! 1. An invocation's writes reach the store in a single `apply` call or not at all
//! 2. Reads inside a transaction observe that transaction's own writes
//! 3. Balances are decimal strings, one key per participant

use std::collections::BTreeMap;

use thiserror::Error;

pub mod memory;
pub mod sled_store;
pub mod tx;
pub mod balance;
pub mod agreement;

pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use tx::LedgerTx;
pub use balance::BalanceLedger;
pub use agreement::AgreementStore;

/// Errors raised by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Read failed for {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("Write failed for {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<LedgerError> for apdl_types::ApdlError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ReadFailed { key, message } => Self::StorageRead { key, message },
            LedgerError::WriteFailed { key, message } => Self::StorageWrite { key, message },
            LedgerError::DatabaseError { message } => Self::StorageWrite {
                key: String::new(),
                message,
            },
        }
    }
}

/// Writes produced by one invocation, keyed and ordered.
///
/// A later write to the same key replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: BTreeMap<String, Vec<u8>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.writes.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.writes.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl IntoIterator for WriteSet {
    type Item = (String, Vec<u8>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// The external key-value collaborator.
///
/// Implementations must make `apply` atomic: either every write in the set
/// becomes visible or none does.
pub trait LedgerStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply a write set atomically
    fn apply(&self, writes: WriteSet) -> Result<()>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn apply(&self, writes: WriteSet) -> Result<()> {
        (**self).apply(writes)
    }
}

impl<T: LedgerStore + ?Sized> LedgerStore for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn apply(&self, writes: WriteSet) -> Result<()> {
        (**self).apply(writes)
    }
}
