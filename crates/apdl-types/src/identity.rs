//! Identity types for APDL
//!
//! Party keys stay opaque strings everywhere except the signature verifier,
//! which is the only place that decodes them into key material.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque public-key identity of a participant.
///
/// The inner string is the URL-safe base64 encoding of a DER
/// SubjectPublicKeyInfo, but nothing outside `apdl-crypto` relies on that.
/// It doubles as the participant's balance key on the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyKey(pub String);

impl PartyKey {
    /// Create from any string-like value
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty (parties of an uninitialized record)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartyKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PartyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PartyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A counterparty of the agreement.
///
/// Address and port are reachability metadata only; the state machine
/// stores them but never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "PubKey")]
    pub public_key: PartyKey,
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    #[serde(rename = "Port")]
    pub port: String,
}

impl Party {
    pub fn new(
        public_key: impl Into<PartyKey>,
        ip_address: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            ip_address: ip_address.into(),
            port: port.into(),
        }
    }
}
