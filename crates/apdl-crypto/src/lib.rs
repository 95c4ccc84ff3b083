//! APDL Crypto - Signature verification for the dual-party penalty gate
//!
//! This crate provides:
//! - Public key decoding (URL-safe base64 DER SubjectPublicKeyInfo)
//! - `r,s` signature parsing with arbitrary-precision integers
//! - ECDSA verification over raw (unhashed) message bytes
//! - Aggregation of several key/signature pairs into one verdict
//!
//! Supported curves: P-224, P-256, P-384, P-521 and secp256k1.

pub mod keys;
pub mod signature;

pub use keys::*;
pub use signature::*;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Key is not an elliptic-curve key (algorithm {0})")]
    NotEcKey(String),

    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid signature integer: {0}")]
    InvalidInteger(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
