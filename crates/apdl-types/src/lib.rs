//! APDL Types - Canonical domain types for the paid download/license agreement
//!
//! This crate contains all foundational types for APDL with zero dependencies
//! on other apdl crates. It defines:
//!
//! - Identity types (PartyKey, Party)
//! - The agreement record and its status graph
//! - Process-wide protocol configuration
//! - The error taxonomy surfaced to callers
//!
//! # Status Graph
//!
//! ```text
//! Uninitialized → Requested → { Penalized | Expired }
//! ```
//!
//! `Penalized` and `Expired` are terminal for `request` and `refund`.
//! `penalize` still accepts an `Expired` agreement.

pub mod identity;
pub mod agreement;
pub mod config;
pub mod error;

pub use identity::*;
pub use agreement::*;
pub use config::*;
pub use error::*;
