#![allow(dead_code)]

use apdl_core::{AgreementStateMachine, ManualClock, PartyKey, ProtocolConfig, SignaturePolicy};
use apdl_crypto::{encode_public_key_der, message_representative};
use apdl_ledger::MemoryStore;
use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigUint;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use rand::rngs::OsRng;

pub type TestMachine = AgreementStateMachine<MemoryStore, ManualClock>;

/// A party holding a P-256 key
pub struct Signer {
    signing: SigningKey,
    pub key: PartyKey,
}

impl Signer {
    pub fn generate() -> Self {
        let signing = SigningKey::random(&mut OsRng);
        let der = signing.verifying_key().to_public_key_der().unwrap();
        Self {
            key: encode_public_key_der(der.as_bytes()),
            signing,
        }
    }

    /// `"r,s"` over the raw message bytes
    pub fn sign(&self, message: &str) -> String {
        let prehash = message_representative(message.as_bytes(), 256);
        let signature: Signature = self.signing.sign_prehash(&prehash).unwrap();
        let bytes = signature.to_bytes();
        format!(
            "{},{}",
            BigUint::from_bytes_be(&bytes[..32]),
            BigUint::from_bytes_be(&bytes[32..])
        )
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
}

pub fn machine_with(policy: SignaturePolicy) -> (TestMachine, MemoryStore, ManualClock) {
    let store = MemoryStore::new();
    let clock = ManualClock::new(start());
    let config = ProtocolConfig::default().with_signature_policy(policy);
    let machine = AgreementStateMachine::with_clock(store.clone(), clock.clone(), config);
    (machine, store, clock)
}

pub fn machine() -> (TestMachine, MemoryStore, ManualClock) {
    machine_with(SignaturePolicy::LastPair)
}

pub fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
