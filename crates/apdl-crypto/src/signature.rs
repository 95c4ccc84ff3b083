//! ECDSA verification for APDL
//!
//! Signatures travel as `"r,s"` with both components written as integer
//! literals. The message is signed as-is: its leading bytes become the
//! representative handed to the curve, with no digest in between.

use crate::keys::{decode_public_key, EcVerifyingKey};
use crate::{CryptoError, CryptoResult};
use apdl_types::{PartyKey, SignaturePolicy};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use num_bigint::{BigInt, BigUint, Sign};
use tracing::debug;

/// A parsed `(r, s)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcSignature {
    pub r: BigInt,
    pub s: BigInt,
}

impl EcSignature {
    /// Parse `"r,s"`. Components past the second are ignored.
    pub fn parse(raw: &str) -> CryptoResult<Self> {
        let mut parts = raw.split(',');
        let (r, s) = match (parts.next(), parts.next()) {
            (Some(r), Some(s)) => (r, s),
            _ => {
                return Err(CryptoError::MalformedSignature(format!(
                    "expected \"r,s\", got '{}'",
                    raw
                )))
            }
        };

        Ok(Self {
            r: parse_big_int(r)?,
            s: parse_big_int(s)?,
        })
    }

    /// Fixed-width big-endian encodings of r and s, or `None` when either is
    /// negative or wider than the field.
    fn field_bytes(&self, field_len: usize) -> Option<(Vec<u8>, Vec<u8>)> {
        Some((
            to_field_bytes(&self.r, field_len)?,
            to_field_bytes(&self.s, field_len)?,
        ))
    }
}

impl std::fmt::Display for EcSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.r, self.s)
    }
}

/// Parse an integer literal: optional sign, then `0x`, `0o`, `0b` or a bare
/// leading `0` (octal) as base prefix, decimal otherwise. Underscores may
/// separate digits.
fn parse_big_int(raw: &str) -> CryptoResult<BigInt> {
    let malformed = || CryptoError::InvalidInteger(raw.to_string());

    let (sign, body) = match raw.as_bytes().first() {
        Some(b'-') => (Sign::Minus, &raw[1..]),
        Some(b'+') => (Sign::Plus, &raw[1..]),
        _ => (Sign::Plus, raw),
    };

    let prefixed = |lower: &'static str, upper: &'static str| {
        body.strip_prefix(lower).or_else(|| body.strip_prefix(upper))
    };
    let (radix, digits) = if let Some(d) = prefixed("0x", "0X") {
        (16, d)
    } else if let Some(d) = prefixed("0b", "0B") {
        (2, d)
    } else if let Some(d) = prefixed("0o", "0O") {
        (8, d)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };
    let digits = if radix == 10 {
        digits
    } else {
        digits.strip_prefix('_').unwrap_or(digits)
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(malformed());
    }

    let magnitude = BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(malformed)?;
    Ok(BigInt::from_biguint(sign, magnitude))
}

fn to_field_bytes(value: &BigInt, field_len: usize) -> Option<Vec<u8>> {
    let (sign, magnitude) = value.to_bytes_be();
    if sign == Sign::Minus || magnitude.len() > field_len {
        return None;
    }
    let mut out = vec![0u8; field_len - magnitude.len()];
    out.extend_from_slice(&magnitude);
    Some(out)
}

/// The integer representative of a raw message for a group order of
/// `order_bits` bits, as big-endian bytes of the order's byte length.
///
/// The message is cut to the order's byte length. When those bytes still
/// hold more bits than the order (P-521: 528 against 521), the excess low
/// bits are shifted out. Short messages are left-padded with zeros.
pub fn message_representative(message: &[u8], order_bits: usize) -> Vec<u8> {
    let order_len = (order_bits + 7) / 8;
    let leading = &message[..message.len().min(order_len)];

    let mut value = BigUint::from_bytes_be(leading);
    let excess = (leading.len() * 8).saturating_sub(order_bits);
    if excess > 0 {
        value >>= excess;
    }

    let magnitude = value.to_bytes_be();
    let mut out = vec![0u8; order_len.saturating_sub(magnitude.len())];
    out.extend_from_slice(&magnitude);
    out
}

macro_rules! verify_on_curve {
    ($curve:ident, $key:expr, $prehash:expr, $r:expr, $s:expr) => {{
        match $curve::ecdsa::Signature::from_slice(&[&$r[..], &$s[..]].concat()) {
            Ok(signature) => $key.verify_prehash($prehash, &signature).is_ok(),
            Err(_) => false,
        }
    }};
}

impl EcVerifyingKey {
    /// Verify `signature` over the raw `message` bytes
    pub fn verify_raw(&self, message: &[u8], signature: &EcSignature) -> bool {
        let curve = self.curve();
        let Some((r, s)) = signature.field_bytes(curve.field_len()) else {
            return false;
        };
        let prehash = message_representative(message, curve.order_bits());

        match self {
            Self::P224(key) => verify_on_curve!(p224, key, &prehash, &r, &s),
            Self::P256(key) => verify_on_curve!(p256, key, &prehash, &r, &s),
            Self::P384(key) => verify_on_curve!(p384, key, &prehash, &r, &s),
            Self::P521(key) => verify_on_curve!(p521, key, &prehash, &r, &s),
            Self::Secp256k1(key) => verify_on_curve!(k256, key, &prehash, &r, &s),
        }
    }
}

/// Check one key/signature pair.
///
/// `Ok(false)` means well-formed inputs that do not verify; `Err` means the
/// key or signature could not be decoded at all.
pub fn verify_pair(message: &[u8], key: &PartyKey, signature: &str) -> CryptoResult<bool> {
    let key = decode_public_key(key)?;
    let signature = EcSignature::parse(signature)?;
    Ok(key.verify_raw(message, &signature))
}

/// Verifies an ordered list of signatures against an ordered list of keys
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier {
    policy: SignaturePolicy,
}

impl SignatureVerifier {
    pub fn new(policy: SignaturePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Verify `signatures[i]` against `public_keys[i]` for every i.
    ///
    /// Fails closed on a length mismatch, an empty list, a key that does not
    /// decode, or a signature with fewer than two components. A component
    /// that is not an integer literal only fails its own pair: under
    /// [`SignaturePolicy::LastPair`] the verdict is that of the final pair
    /// alone, so `"abc,def"` in the owner slot is masked by a valid user
    /// signature.
    pub fn verify<S: AsRef<str>>(
        &self,
        message: &str,
        public_keys: &[PartyKey],
        signatures: &[S],
    ) -> bool {
        if public_keys.len() != signatures.len() {
            debug!(
                keys = public_keys.len(),
                signatures = signatures.len(),
                "key/signature count mismatch"
            );
            return false;
        }

        let mut verdict = false;
        for (index, (key, signature)) in public_keys.iter().zip(signatures).enumerate() {
            let valid = match verify_pair(message.as_bytes(), key, signature.as_ref()) {
                Ok(valid) => valid,
                Err(CryptoError::InvalidInteger(raw)) => {
                    debug!(index, component = %raw, "signature component is not an integer");
                    false
                }
                Err(e) => {
                    debug!(index, error = %e, "rejecting undecodable key or signature");
                    return false;
                }
            };
            debug!(index, valid, "signature pair checked");

            match self.policy {
                SignaturePolicy::LastPair => verdict = valid,
                SignaturePolicy::AllPairs if !valid => return false,
                SignaturePolicy::AllPairs => verdict = true,
            }
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::encode_public_key_der;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use p256::pkcs8::EncodePublicKey;
    use rand::rngs::OsRng;

    /// `openssl ecparam -name secp521r1 -genkey` public half, URL-safe base64 DER
    const OPENSSL_P521_KEY: &str = "MIGbMBAGByqGSM49AgEGBSuBBAAjA4GGAAQA5pv43UqK2fNEv4I8rtO3K_L1AJ5-fYxiOuQh4UhQ6cbmxDUxByyQftTLW2NYEaeDgLQ6cuxJ5X-ioKXEbJxB4qwB7cGvhYh2HFQnDQf3BQmkN3YiDCLfFIz0N4LiY4NP70CROI9b3JTuxUmC-WIuQJ1hhmtydgjLi2_2WZ75Peoj81o=";
    /// `openssl ecparam -name secp224r1 -genkey` public half
    const OPENSSL_P224_KEY: &str = "ME4wEAYHKoZIzj0CAQYFK4EEACEDOgAEhDbTTiP5QgWFWfZMuvcY0Qt8AeYhH0ANv8OlGxu6IhwKF6YtNrc65j2qxzUxBlYi-EFLW1S_rpE=";

    struct P256Party {
        signing: p256::ecdsa::SigningKey,
        key: PartyKey,
    }

    impl P256Party {
        fn generate() -> Self {
            let signing = p256::ecdsa::SigningKey::random(&mut OsRng);
            let der = signing.verifying_key().to_public_key_der().unwrap();
            Self {
                key: encode_public_key_der(der.as_bytes()),
                signing,
            }
        }

        fn sign(&self, message: &str) -> String {
            let prehash = message_representative(message.as_bytes(), 256);
            let signature: p256::ecdsa::Signature = self.signing.sign_prehash(&prehash).unwrap();
            let bytes = signature.to_bytes();
            format!(
                "{},{}",
                BigUint::from_bytes_be(&bytes[..32]),
                BigUint::from_bytes_be(&bytes[32..])
            )
        }
    }

    #[test]
    fn test_parse_signature() {
        let sig = EcSignature::parse("123,0x1f").unwrap();
        assert_eq!(sig.r, BigInt::from(123));
        assert_eq!(sig.s, BigInt::from(31));

        let sig = EcSignature::parse("017,0b101,ignored").unwrap();
        assert_eq!(sig.r, BigInt::from(15));
        assert_eq!(sig.s, BigInt::from(5));

        assert_eq!(EcSignature::parse("-5,1_000").unwrap().r, BigInt::from(-5));
        assert_eq!(EcSignature::parse("-5,1_000").unwrap().s, BigInt::from(1000));
    }

    #[test]
    fn test_parse_malformed_signature() {
        assert!(EcSignature::parse("12345").is_err());
        assert!(EcSignature::parse("").is_err());
        assert!(EcSignature::parse("12,abc").is_err());
        assert!(EcSignature::parse("0x,1").is_err());
        assert!(EcSignature::parse("+-1,1").is_err());
    }

    #[test]
    fn test_message_representative() {
        assert_eq!(message_representative(b"ab", 32), vec![0, 0, b'a', b'b']);
        assert_eq!(message_representative(b"abcdef", 32), b"abcd".to_vec());
        assert_eq!(message_representative(b"", 16), vec![0, 0]);
    }

    #[test]
    fn test_message_representative_shifts_excess_bits() {
        // 66 bytes carry 528 bits; P-521 keeps the top 521
        let shifted = message_representative(&[0xff; 70], 521);
        assert_eq!(shifted.len(), 66);
        assert_eq!(shifted[0], 0x01);
        assert!(shifted[1..].iter().all(|&b| b == 0xff));

        // 65 bytes fit without a shift and are padded to the order length
        let padded = message_representative(&[0xff; 65], 521);
        assert_eq!(padded.len(), 66);
        assert_eq!(padded[0], 0x00);
        assert!(padded[1..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_openssl_p521_vector() {
        // openssl pkeyutl -sign over the one-byte input "m"
        let key = PartyKey::new(OPENSSL_P521_KEY);
        let signature = "0xC781FECA031C45648087209269FC19216E3BBAA44BFBD66756F94D0A4B6482ECFF4D115277DCC989C24189633A47635AAB18EDAFB90139104CD9F89292E6BA5891,\
                         0x0122510DB3022A0DFC573104EFD4B794E698558A85D056AD6C3177EA39C66F71E778DB9790F5D781B2DC12D5D25C2692695D86C5F0573113181254B510FFC1200A62";

        assert!(verify_pair(b"m", &key, signature).unwrap());
        assert!(!verify_pair(b"n", &key, signature).unwrap());
    }

    #[test]
    fn test_p521_long_message_drops_low_bits() {
        // Same key, signed over the top 521 bits of the message's first 66 bytes
        let key = PartyKey::new(OPENSSL_P521_KEY);
        let message = "penalty: licence key redistributed outside the agreed download window, 2999-01-01";
        let signature = "0xd5c6ada3cc75aa85d2f8b2a251f104e06a7c54f9b7c26cc58ea89deafa622253c01f37b118a7f32d9e3bc2101a3b829e4c9e1d3400cb287c101dfe8897e008741c,\
                         0xba769f27686432bd307656bf69915a84ce72b2fb16b323cd39b84608faac849c1392302444347b287b8a15663c8d0be817a8c065de39d5e8d2865e86df24d6bd19";

        assert!(verify_pair(message.as_bytes(), &key, signature).unwrap());

        let other_tail = format!("{} and more", &message[..66]);
        assert!(verify_pair(other_tail.as_bytes(), &key, signature).unwrap());
    }

    #[test]
    fn test_openssl_p224_vector() {
        let key = PartyKey::new(OPENSSL_P224_KEY);
        let signature = "0x203B98D01EF8BE7446983EA7A8B4C5A92204C219FCA0F4909AB704E6,\
                         0xC659D477609EB2637F1566F73BD208028558834AE70ACB4088A395AF";

        assert!(verify_pair(b"m", &key, signature).unwrap());
        let wrong_s = "0x203B98D01EF8BE7446983EA7A8B4C5A92204C219FCA0F4909AB704E6,1";
        assert!(!verify_pair(b"m", &key, wrong_s).unwrap());
    }

    #[test]
    fn test_sign_and_verify() {
        let party = P256Party::generate();
        let message = "license violation 2024-03-01";
        let signature = party.sign(message);

        assert!(verify_pair(message.as_bytes(), &party.key, &signature).unwrap());
        assert!(!verify_pair(b"something else", &party.key, &signature).unwrap());
    }

    #[test]
    fn test_long_message_uses_leftmost_bytes() {
        let party = P256Party::generate();
        let message = "x".repeat(32) + " tail that is not covered";
        let signature = party.sign(&message);

        let other_tail = "x".repeat(32) + " different tail";
        assert!(verify_pair(other_tail.as_bytes(), &party.key, &signature).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = P256Party::generate();
        let other = P256Party::generate();
        let signature = signer.sign("msg");

        assert!(!verify_pair(b"msg", &other.key, &signature).unwrap());
    }

    #[test]
    fn test_out_of_range_components_fail() {
        let party = P256Party::generate();
        assert!(!verify_pair(b"msg", &party.key, "0,0").unwrap());
        assert!(!verify_pair(b"msg", &party.key, "-1,1").unwrap());
        let wide = format!("{},1", BigUint::from(1u8) << 300);
        assert!(!verify_pair(b"msg", &party.key, &wide).unwrap());
    }

    #[test]
    fn test_secp256k1_signature() {
        let signing = k256::ecdsa::SigningKey::random(&mut OsRng);
        let der = signing.verifying_key().to_public_key_der().unwrap();
        let key = encode_public_key_der(der.as_bytes());

        let prehash = message_representative(b"penalty", 256);
        let signature: k256::ecdsa::Signature = signing.sign_prehash(&prehash).unwrap();
        let bytes = signature.to_bytes();
        let raw = format!(
            "{},{}",
            BigUint::from_bytes_be(&bytes[..32]),
            BigUint::from_bytes_be(&bytes[32..])
        );

        assert!(verify_pair(b"penalty", &key, &raw).unwrap());
    }

    #[test]
    fn test_verifier_count_mismatch() {
        let party = P256Party::generate();
        let verifier = SignatureVerifier::default();
        let signature = party.sign("m");

        assert!(!verifier.verify("m", &[party.key.clone()], &[signature.clone(), signature]));
        assert!(!verifier.verify::<&str>("m", &[], &[]));
    }

    #[test]
    fn test_both_valid_pass_under_either_policy() {
        let owner = P256Party::generate();
        let user = P256Party::generate();
        let keys = [owner.key.clone(), user.key.clone()];
        let signatures = [owner.sign("m"), user.sign("m")];

        assert!(SignatureVerifier::new(SignaturePolicy::LastPair).verify("m", &keys, &signatures));
        assert!(SignatureVerifier::new(SignaturePolicy::AllPairs).verify("m", &keys, &signatures));
    }

    #[test]
    fn test_last_pair_masks_invalid_first_signature() {
        let owner = P256Party::generate();
        let user = P256Party::generate();
        let keys = [owner.key.clone(), user.key.clone()];
        // Owner's slot carries a well-formed signature by the wrong signer
        let signatures = [user.sign("m"), user.sign("m")];

        assert!(SignatureVerifier::new(SignaturePolicy::LastPair).verify("m", &keys, &signatures));
        assert!(!SignatureVerifier::new(SignaturePolicy::AllPairs).verify("m", &keys, &signatures));
    }

    #[test]
    fn test_invalid_last_signature_fails() {
        let owner = P256Party::generate();
        let user = P256Party::generate();
        let keys = [owner.key.clone(), user.key.clone()];
        let signatures = [owner.sign("m"), owner.sign("m")];

        assert!(!SignatureVerifier::new(SignaturePolicy::LastPair).verify("m", &keys, &signatures));
    }

    #[test]
    fn test_malformed_pair_rejects_regardless_of_position() {
        let owner = P256Party::generate();
        let user = P256Party::generate();
        let keys = [owner.key.clone(), user.key.clone()];
        let signatures = ["garbage".to_string(), user.sign("m")];

        assert!(!SignatureVerifier::default().verify("m", &keys, &signatures));
    }

    #[test]
    fn test_non_integer_component_fails_only_its_pair() {
        let owner = P256Party::generate();
        let user = P256Party::generate();
        let keys = [owner.key.clone(), user.key.clone()];
        let signatures = ["abc,def".to_string(), user.sign("m")];

        assert!(SignatureVerifier::new(SignaturePolicy::LastPair).verify("m", &keys, &signatures));
        assert!(!SignatureVerifier::new(SignaturePolicy::AllPairs).verify("m", &keys, &signatures));

        let reversed = [user.sign("m"), "abc,def".to_string()];
        let keys = [user.key.clone(), owner.key.clone()];
        assert!(!SignatureVerifier::new(SignaturePolicy::LastPair).verify("m", &keys, &reversed));
    }
}
