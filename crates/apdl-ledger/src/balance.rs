//! Participant balances
//!
//! One ledger key per participant public key, holding a decimal string.
//! No floor and no ceiling: balances may go negative.

use apdl_types::PartyKey;
use tracing::warn;

use crate::{LedgerStore, LedgerTx, Result};

/// Typed access to participant balances
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceLedger;

impl BalanceLedger {
    pub fn new() -> Self {
        Self
    }

    /// Current balance of `key`.
    ///
    /// An absent key reads as zero. So does a value that is not a decimal
    /// integer, which is logged since it indicates foreign data under a
    /// participant key.
    pub fn get_balance<S: LedgerStore + ?Sized>(
        &self,
        tx: &LedgerTx<'_, S>,
        key: &PartyKey,
    ) -> Result<i64> {
        let Some(raw) = tx.get(key.as_str())? else {
            return Ok(0);
        };
        let text = String::from_utf8_lossy(&raw);
        match text.trim().parse::<i64>() {
            Ok(balance) => Ok(balance),
            Err(e) => {
                warn!(key = %key, value = %text, error = %e, "unparseable balance, reading as zero");
                Ok(0)
            }
        }
    }

    pub fn set_balance<S: LedgerStore + ?Sized>(
        &self,
        tx: &mut LedgerTx<'_, S>,
        key: &PartyKey,
        balance: i64,
    ) {
        tx.put(key.as_str(), balance.to_string());
    }
}
