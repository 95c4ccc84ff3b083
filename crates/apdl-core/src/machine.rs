//! Agreement state machine
//!
//! ```text
//! initialize → Uninitialized
//! request    : Uninitialized (or no record) → Requested
//! penalize   : any status except Uninitialized/Penalized → Penalized
//! refund     : Requested → Expired   (only once the expiry instant has passed)
//! ```
//!
//! Every operation opens a [`LedgerTx`], validates, buffers its writes and
//! commits once, so the balance writes and the record write land together.

use std::fmt;

use apdl_crypto::SignatureVerifier;
use apdl_ledger::{AgreementStore, BalanceLedger, LedgerStore, LedgerTx};
use apdl_types::{
    AgreementRecord, AgreementStatus, ApdlError, Party, PartyKey, ProtocolConfig, Result,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};

/// Successful result of a mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Initialized,
    Requested,
    PenaltyApplied,
    ContractExpired,
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Initialized => "init completed",
            Self::Requested => "download requested",
            Self::PenaltyApplied => "penalty applied",
            Self::ContractExpired => "contract expired",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub(crate) fn expect_args(operation: &str, expected: usize, args: &[String]) -> Result<()> {
    if args.len() != expected {
        return Err(ApdlError::ArgumentCount {
            operation: operation.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// Arguments of `request`, still unparsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestArgs {
    pub owner_key: PartyKey,
    pub user_key: PartyKey,
    pub deposit_amount: String,
    /// Calendar date, `MM/DD/YYYY` by default
    pub expiry_date: String,
    pub user_ip: String,
    pub user_port: String,
}

impl RequestArgs {
    pub const ARITY: usize = 6;

    /// Positional form: owner_key, user_key, deposit_amount, expiry_date, user_ip, user_port
    pub fn from_args(args: &[String]) -> Result<Self> {
        expect_args("request", Self::ARITY, args)?;
        Ok(Self {
            owner_key: PartyKey::new(args[0].as_str()),
            user_key: PartyKey::new(args[1].as_str()),
            deposit_amount: args[2].clone(),
            expiry_date: args[3].clone(),
            user_ip: args[4].clone(),
            user_port: args[5].clone(),
        })
    }
}

/// Arguments of `penalize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenalizeArgs {
    pub message: String,
    /// `"r,s"`
    pub owner_signature: String,
    /// `"r,s"`
    pub user_signature: String,
}

impl PenalizeArgs {
    pub const ARITY: usize = 3;

    pub fn from_args(args: &[String]) -> Result<Self> {
        expect_args("penalize", Self::ARITY, args)?;
        Ok(Self {
            message: args[0].clone(),
            owner_signature: args[1].clone(),
            user_signature: args[2].clone(),
        })
    }
}

/// The agreement protocol over a ledger store
pub struct AgreementStateMachine<S: LedgerStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: ProtocolConfig,
    agreements: AgreementStore,
    balances: BalanceLedger,
    verifier: SignatureVerifier,
}

impl<S: LedgerStore> AgreementStateMachine<S, SystemClock> {
    /// State machine on the wall clock
    pub fn new(store: S, config: ProtocolConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: LedgerStore, C: Clock> AgreementStateMachine<S, C> {
    pub fn with_clock(store: S, clock: C, config: ProtocolConfig) -> Self {
        Self {
            agreements: AgreementStore::new(config.contract_key.clone()),
            balances: BalanceLedger::new(),
            verifier: SignatureVerifier::new(config.signature_policy),
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Write a fresh `Uninitialized` record, replacing whatever was there
    pub fn initialize(&self) -> Result<Outcome> {
        let record = AgreementRecord::uninitialized(self.clock.now());

        let mut tx = LedgerTx::new(&self.store);
        self.agreements.save(&mut tx, &record)?;
        tx.commit()?;

        info!(key = %self.agreements.key(), "agreement initialized");
        Ok(Outcome::Initialized)
    }

    /// Open the agreement: record both parties, the deposit and the expiry,
    /// and set both parties' balances to `starting_allowance - deposit`.
    pub fn request(&self, args: &RequestArgs) -> Result<Outcome> {
        let deposit = parse_deposit(&args.deposit_amount)?;
        let expiry = self.parse_expiry(&args.expiry_date)?;
        let now = self.clock.now();
        if expiry <= now {
            return Err(ApdlError::PastExpiry {
                expiry: self.format_date(expiry),
                now: self.format_date(now),
            });
        }
        let opening = self
            .config
            .starting_allowance
            .checked_sub(deposit)
            .ok_or_else(|| ApdlError::BalanceOverflow {
                key: args.user_key.to_string(),
            })?;

        let mut tx = LedgerTx::new(&self.store);
        // A missing record counts as uninitialized
        match self.agreements.load(&tx) {
            Ok(current) if current.status != AgreementStatus::Uninitialized => {
                warn!(status = %current.status, "request rejected");
                return Err(ApdlError::invalid_transition("request", current.status));
            }
            Ok(_) | Err(ApdlError::NotInitialized { .. }) => {}
            Err(e) => return Err(e),
        }

        let owner = Party::new(
            args.owner_key.clone(),
            self.config.owner_ip.as_str(),
            self.config.owner_port.as_str(),
        );
        let user = Party::new(
            args.user_key.clone(),
            args.user_ip.as_str(),
            args.user_port.as_str(),
        );

        // Both parties get the same derived balance; nothing moves between them
        self.balances.set_balance(&mut tx, &owner.public_key, opening);
        self.balances.set_balance(&mut tx, &user.public_key, opening);

        let record = AgreementRecord::requested(owner, user, expiry, deposit);
        self.agreements.save(&mut tx, &record)?;
        tx.commit()?;

        info!(
            owner = %record.owner.public_key,
            user = %record.user.public_key,
            deposit,
            expiry = %record.expiry,
            opening_balance = opening,
            "download requested"
        );
        Ok(Outcome::Requested)
    }

    /// Debit the deposit from the user once both parties signed `message`
    pub fn penalize(&self, args: &PenalizeArgs) -> Result<Outcome> {
        let mut tx = LedgerTx::new(&self.store);
        let mut record = self.agreements.load(&tx)?;

        if matches!(
            record.status,
            AgreementStatus::Uninitialized | AgreementStatus::Penalized
        ) {
            warn!(status = %record.status, "penalty rejected");
            return Err(ApdlError::invalid_transition("penalty", record.status));
        }

        let owner_key = &record.owner.public_key;
        let user_key = &record.user.public_key;
        let keys = [owner_key.clone(), user_key.clone()];
        let signatures = [args.owner_signature.as_str(), args.user_signature.as_str()];
        if !self.verifier.verify(&args.message, &keys, &signatures) {
            let comparisons = format!(
                "{} vs. {}---{} vs. {}",
                owner_key, args.owner_signature, user_key, args.user_signature
            );
            warn!(%comparisons, "penalty signatures rejected");
            return Err(ApdlError::SignatureVerification { comparisons });
        }

        let balance = self.balances.get_balance(&tx, user_key)?;
        let remaining = balance
            .checked_sub(record.deposit_amount)
            .ok_or_else(|| ApdlError::BalanceOverflow {
                key: user_key.to_string(),
            })?;
        self.balances.set_balance(&mut tx, user_key, remaining);

        record.status = AgreementStatus::Penalized;
        self.agreements.save(&mut tx, &record)?;
        tx.commit()?;

        info!(
            user = %record.user.public_key,
            deposit = record.deposit_amount,
            balance = remaining,
            "penalty applied"
        );
        Ok(Outcome::PenaltyApplied)
    }

    /// Credit the deposit back to the user after expiry
    pub fn refund(&self) -> Result<Outcome> {
        let mut tx = LedgerTx::new(&self.store);
        let mut record = self.agreements.load(&tx)?;

        if record.status != AgreementStatus::Requested {
            warn!(status = %record.status, "refund rejected");
            return Err(ApdlError::invalid_transition("refund", record.status));
        }

        if !record.is_expired_at(self.clock.now()) {
            return Err(ApdlError::NotYetExpired {
                expiry: self.format_date(record.expiry),
            });
        }

        let user_key = &record.user.public_key;
        let balance = self.balances.get_balance(&tx, user_key)?;
        let refunded = balance
            .checked_add(record.deposit_amount)
            .ok_or_else(|| ApdlError::BalanceOverflow {
                key: user_key.to_string(),
            })?;
        self.balances.set_balance(&mut tx, user_key, refunded);

        record.status = AgreementStatus::Expired;
        self.agreements.save(&mut tx, &record)?;
        tx.commit()?;

        info!(
            user = %record.user.public_key,
            deposit = record.deposit_amount,
            balance = refunded,
            "contract expired, deposit refunded"
        );
        Ok(Outcome::ContractExpired)
    }

    /// The stored record, byte for byte
    pub fn get_status(&self) -> Result<Vec<u8>> {
        let tx = LedgerTx::new(&self.store);
        self.agreements.load_raw(&tx)
    }

    /// The stored record, decoded
    pub fn record(&self) -> Result<AgreementRecord> {
        let tx = LedgerTx::new(&self.store);
        self.agreements.load(&tx)
    }

    pub fn balance_of(&self, key: &PartyKey) -> Result<i64> {
        let tx = LedgerTx::new(&self.store);
        Ok(self.balances.get_balance(&tx, key)?)
    }

    /// Midnight UTC of the given calendar date
    fn parse_expiry(&self, raw: &str) -> Result<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(raw, &self.config.expiry_format)
            .map_err(|e| ApdlError::argument_format("expiry_date", raw, e.to_string()))?;
        // chrono accepts unpadded fields; only the exact layout is valid
        if date.format(&self.config.expiry_format).to_string() != raw {
            return Err(ApdlError::argument_format(
                "expiry_date",
                raw,
                format!("not in the form {}", self.config.expiry_format),
            ));
        }
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ApdlError::argument_format("expiry_date", raw, "no midnight"))?;
        Ok(Utc.from_utc_datetime(&midnight))
    }

    fn format_date(&self, at: DateTime<Utc>) -> String {
        at.format(&self.config.expiry_format).to_string()
    }
}

fn parse_deposit(raw: &str) -> Result<i64> {
    let amount = raw
        .parse::<i64>()
        .map_err(|e| ApdlError::argument_format("deposit_amount", raw, e.to_string()))?;
    if amount < 0 {
        return Err(ApdlError::argument_format(
            "deposit_amount",
            raw,
            "must not be negative",
        ));
    }
    Ok(amount)
}
