//! Agreement record for APDL
//!
//! Exactly one record exists per ledger instance. It is created by
//! `initialize` and transformed in place afterwards; it is never deleted.

use crate::Party;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the agreement
///
/// The serialized tags are the ones the deployed chaincode writes, so
/// existing ledgers keep deserializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    /// Record created, no parties yet
    #[default]
    #[serde(rename = "init")]
    Uninitialized,
    /// Deposit placed, agreement running until expiry
    #[serde(rename = "download_requested", alias = "download_request")]
    Requested,
    /// Both parties attested to a dispute outcome
    #[serde(rename = "penalized")]
    Penalized,
    /// Expiry passed and the deposit went back to the user
    #[serde(rename = "expired")]
    Expired,
}

impl AgreementStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Penalized | Self::Expired)
    }

    /// The tag as stored on the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "init",
            Self::Requested => "download_requested",
            Self::Penalized => "penalized",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single shared contract object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRecord {
    #[serde(rename = "Status")]
    pub status: AgreementStatus,
    /// Deposit-holding counterparty
    #[serde(rename = "SoftwareOwner")]
    pub owner: Party,
    #[serde(rename = "SoftwareUser")]
    pub user: Party,
    /// Midnight UTC of the agreed expiry date; a placeholder timestamp
    /// while uninitialized
    #[serde(rename = "ContractExpiry")]
    pub expiry: DateTime<Utc>,
    /// Never negative
    #[serde(rename = "DepositAmount")]
    pub deposit_amount: i64,
}

impl AgreementRecord {
    /// The record written by `initialize`
    pub fn uninitialized(now: DateTime<Utc>) -> Self {
        Self {
            status: AgreementStatus::Uninitialized,
            owner: Party::default(),
            user: Party::default(),
            expiry: now,
            deposit_amount: 0,
        }
    }

    /// A running agreement
    pub fn requested(
        owner: Party,
        user: Party,
        expiry: DateTime<Utc>,
        deposit_amount: i64,
    ) -> Self {
        Self {
            status: AgreementStatus::Requested,
            owner,
            user,
            expiry,
            deposit_amount,
        }
    }

    /// Whether `now` lies strictly after the expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }
}
