//! Agreement record persistence
//!
//! The record lives under a single well-known key. The key is a field
//! rather than a constant so several agreements could share one ledger.

use apdl_types::{AgreementRecord, ApdlError, Result};

use crate::{LedgerStore, LedgerTx};

/// Reads and writes the agreement record as JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementStore {
    key: String,
}

impl AgreementStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored bytes, verbatim
    pub fn load_raw<S: LedgerStore + ?Sized>(&self, tx: &LedgerTx<'_, S>) -> Result<Vec<u8>> {
        tx.get(&self.key)?.ok_or_else(|| ApdlError::NotInitialized {
            key: self.key.clone(),
        })
    }

    pub fn load<S: LedgerStore + ?Sized>(&self, tx: &LedgerTx<'_, S>) -> Result<AgreementRecord> {
        let raw = self.load_raw(tx)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn save<S: LedgerStore + ?Sized>(
        &self,
        tx: &mut LedgerTx<'_, S>,
        record: &AgreementRecord,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        tx.put(self.key.clone(), bytes);
        Ok(())
    }
}
