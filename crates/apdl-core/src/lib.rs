//! APDL Core - Agreement state machine for paid download/license escrow
//!
//! An owner and a user enter a time-bounded agreement backed by a deposit.
//! Both parties can jointly sign a penalty, or the user reclaims the
//! deposit once the agreement has expired.
//!
//! - [`AgreementStateMachine`]: the five protocol operations
//! - [`Dispatcher`]: maps an operation name plus string arguments onto them
//! - [`Clock`]: injectable time source
//!
//! # Invariants
//!
//! 1. Validation happens before any write
//! 2. Each operation commits its writes in one atomic write set
//! 3. `Penalized` and `Expired` are terminal for `refund`
//! 4. A penalty needs the dual-signature gate to pass

pub mod clock;
pub mod machine;
pub mod dispatch;

pub use clock::*;
pub use machine::*;
pub use dispatch::*;

pub use apdl_types::{
    AgreementRecord, AgreementStatus, ApdlError, Party, PartyKey, ProtocolConfig, Result,
    SignaturePolicy,
};
