//! Protocol configuration
//!
//! Process-wide, immutable after startup. Injected into the state machine
//! at construction rather than read from globals.

use serde::{Deserialize, Serialize};

/// How per-pair signature results combine into one verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Verdict of the last checked pair only. Matches the deployed
    /// contract; a valid last signature masks an invalid earlier one.
    #[default]
    LastPair,
    /// Every pair must verify.
    AllPairs,
}

/// Protocol constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Ledger key holding the serialized agreement record
    #[serde(default = "default_contract_key")]
    pub contract_key: String,

    /// Baseline balance assumed for any participant before the deposit
    #[serde(default = "default_starting_allowance")]
    pub starting_allowance: i64,

    /// Fixed address recorded for the owner party
    #[serde(default = "default_owner_ip")]
    pub owner_ip: String,

    /// Fixed port recorded for the owner party
    #[serde(default = "default_owner_port")]
    pub owner_port: String,

    /// chrono format of the `expiry_date` argument
    #[serde(default = "default_expiry_format")]
    pub expiry_format: String,

    #[serde(default)]
    pub signature_policy: SignaturePolicy,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            contract_key: default_contract_key(),
            starting_allowance: default_starting_allowance(),
            owner_ip: default_owner_ip(),
            owner_port: default_owner_port(),
            expiry_format: default_expiry_format(),
            signature_policy: SignaturePolicy::default(),
        }
    }
}

impl ProtocolConfig {
    pub fn with_signature_policy(mut self, policy: SignaturePolicy) -> Self {
        self.signature_policy = policy;
        self
    }

    pub fn with_starting_allowance(mut self, amount: i64) -> Self {
        self.starting_allowance = amount;
        self
    }
}

fn default_contract_key() -> String {
    "contract".to_string()
}

fn default_starting_allowance() -> i64 {
    75_000
}

fn default_owner_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_owner_port() -> String {
    "0".to_string()
}

fn default_expiry_format() -> String {
    "%m/%d/%Y".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.contract_key, "contract");
        assert_eq!(config.starting_allowance, 75_000);
        assert_eq!(config.signature_policy, SignaturePolicy::LastPair);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: ProtocolConfig =
            serde_json::from_str(r#"{"starting_allowance": 100, "signature_policy": "all_pairs"}"#)
                .unwrap();
        assert_eq!(config.starting_allowance, 100);
        assert_eq!(config.signature_policy, SignaturePolicy::AllPairs);
        assert_eq!(config.owner_port, "0");
    }
}
