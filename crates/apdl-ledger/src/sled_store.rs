//! Embedded sled-backed ledger store
//!
//! Used by the CLI so state survives between invocations. Write sets go
//! through `sled::Batch`, which sled applies atomically.

use std::io::ErrorKind;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::{LedgerError, LedgerStore, Result, WriteSet};

/// Attempts at taking the database file lock before giving up
const OPEN_ATTEMPTS: u32 = 100;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Ledger store persisted in an embedded sled database
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a database at `path`.
    ///
    /// sled releases its file lock from a background thread after the last
    /// handle drops, so a reopen right after a close can see the lock still
    /// held. That case is retried for up to two seconds.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut attempt = 1;
        let db = loop {
            match sled::open(path) {
                Ok(db) => break db,
                Err(sled::Error::Io(e))
                    if e.kind() == ErrorKind::WouldBlock && attempt < OPEN_ATTEMPTS =>
                {
                    debug!(path = %path.display(), attempt, "sled ledger still locked, retrying");
                    attempt += 1;
                    thread::sleep(OPEN_RETRY_DELAY);
                }
                Err(e) => {
                    return Err(LedgerError::DatabaseError {
                        message: e.to_string(),
                    })
                }
            }
        };
        debug!(path = %path.display(), "opened sled ledger");
        Ok(Self { db })
    }

    /// Throwaway database, removed when dropped
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| LedgerError::DatabaseError {
                message: e.to_string(),
            })?;
        Ok(Self { db })
    }
}

impl LedgerStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key.as_bytes())
            .map(|value| value.map(|ivec| ivec.to_vec()))
            .map_err(|e| LedgerError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn apply(&self, writes: WriteSet) -> Result<()> {
        let keys = writes.keys().collect::<Vec<_>>().join(",");
        let mut batch = sled::Batch::default();
        for (key, value) in writes.iter() {
            batch.insert(key.as_bytes(), value);
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| LedgerError::WriteFailed {
                key: keys.clone(),
                message: e.to_string(),
            })?;
        self.db.flush().map_err(|e| LedgerError::WriteFailed {
            key: keys,
            message: e.to_string(),
        })?;
        Ok(())
    }
}
