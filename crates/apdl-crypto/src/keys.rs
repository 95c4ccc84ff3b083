//! Public key decoding for APDL
//!
//! Party keys arrive as URL-safe base64 of a DER SubjectPublicKeyInfo.
//! This is the only place where a `PartyKey` turns into key material.

use crate::{CryptoError, CryptoResult};
use apdl_types::PartyKey;
use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine;
use k256::pkcs8::DecodePublicKey;
use spki::der::Decode;
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};

/// URL-safe alphabet; pads on encode, accepts either form on decode
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// id-ecPublicKey
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// prime256v1 / P-256
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP224R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.33");
/// P-384
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
const SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

/// Supported named curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    P224,
    P256,
    P384,
    P521,
    Secp256k1,
}

impl Curve {
    /// Byte length of a field element (and of the message representative)
    pub fn field_len(&self) -> usize {
        (self.order_bits() + 7) / 8
    }

    /// Bit length of the group order
    pub fn order_bits(&self) -> usize {
        match self {
            Self::P224 => 224,
            Self::P256 | Self::Secp256k1 => 256,
            Self::P384 => 384,
            Self::P521 => 521,
        }
    }
}

/// A decoded elliptic-curve verifying key
#[derive(Clone)]
pub enum EcVerifyingKey {
    P224(p224::ecdsa::VerifyingKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

// p521's VerifyingKey does not implement Debug/PartialEq/Eq, so these impls
// mirror the derived ones, using the SEC1 encoded point for P-521 keys.
impl std::fmt::Debug for EcVerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P224(key) => f.debug_tuple("P224").field(key).finish(),
            Self::P256(key) => f.debug_tuple("P256").field(key).finish(),
            Self::P384(key) => f.debug_tuple("P384").field(key).finish(),
            Self::P521(key) => f
                .debug_tuple("P521")
                .field(&key.to_encoded_point(false))
                .finish(),
            Self::Secp256k1(key) => f.debug_tuple("Secp256k1").field(key).finish(),
        }
    }
}

impl PartialEq for EcVerifyingKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::P224(a), Self::P224(b)) => a == b,
            (Self::P256(a), Self::P256(b)) => a == b,
            (Self::P384(a), Self::P384(b)) => a == b,
            (Self::P521(a), Self::P521(b)) => {
                a.to_encoded_point(false) == b.to_encoded_point(false)
            }
            (Self::Secp256k1(a), Self::Secp256k1(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for EcVerifyingKey {}

impl EcVerifyingKey {
    /// Parse a DER SubjectPublicKeyInfo.
    ///
    /// Fails with `NotEcKey` for any algorithm other than id-ecPublicKey and
    /// with `UnsupportedCurve` for named curves outside [`Curve`].
    pub fn from_spki_der(der: &[u8]) -> CryptoResult<Self> {
        let spki = SubjectPublicKeyInfoRef::from_der(der)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;

        if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
            return Err(CryptoError::NotEcKey(spki.algorithm.oid.to_string()));
        }

        let curve = spki
            .algorithm
            .parameters_oid()
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;

        let invalid = |e: spki::Error| CryptoError::InvalidKeyFormat(e.to_string());
        if curve == SECP224R1 {
            p224::ecdsa::VerifyingKey::from_public_key_der(der)
                .map(Self::P224)
                .map_err(invalid)
        } else if curve == SECP256R1 {
            p256::ecdsa::VerifyingKey::from_public_key_der(der)
                .map(Self::P256)
                .map_err(invalid)
        } else if curve == SECP384R1 {
            p384::ecdsa::VerifyingKey::from_public_key_der(der)
                .map(Self::P384)
                .map_err(invalid)
        } else if curve == SECP521R1 {
            // p521 keys are built from the SEC1 point rather than through pkcs8
            let point = spki.subject_public_key.as_bytes().ok_or_else(|| {
                CryptoError::InvalidKeyFormat("public key bit string is not byte aligned".into())
            })?;
            p521::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(Self::P521)
                .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
        } else if curve == SECP256K1 {
            k256::ecdsa::VerifyingKey::from_public_key_der(der)
                .map(Self::Secp256k1)
                .map_err(invalid)
        } else {
            Err(CryptoError::UnsupportedCurve(curve.to_string()))
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            Self::P224(_) => Curve::P224,
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
            Self::P521(_) => Curve::P521,
            Self::Secp256k1(_) => Curve::Secp256k1,
        }
    }
}

/// Decode a party key into a verifying key
pub fn decode_public_key(key: &PartyKey) -> CryptoResult<EcVerifyingKey> {
    let der = URL_SAFE_LENIENT
        .decode(key.as_str())
        .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
    EcVerifyingKey::from_spki_der(&der)
}

/// Encode DER SubjectPublicKeyInfo bytes as a party key
pub fn encode_public_key_der(der: &[u8]) -> PartyKey {
    PartyKey(URL_SAFE_LENIENT.encode(der))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePublicKey;
    use rand::rngs::OsRng;

    /// `openssl ecparam -name secp521r1 -genkey` public half, URL-safe base64 DER
    const OPENSSL_P521_KEY: &str = "MIGbMBAGByqGSM49AgEGBSuBBAAjA4GGAAQA5pv43UqK2fNEv4I8rtO3K_L1AJ5-fYxiOuQh4UhQ6cbmxDUxByyQftTLW2NYEaeDgLQ6cuxJ5X-ioKXEbJxB4qwB7cGvhYh2HFQnDQf3BQmkN3YiDCLfFIz0N4LiY4NP70CROI9b3JTuxUmC-WIuQJ1hhmtydgjLi2_2WZ75Peoj81o=";
    /// `openssl ecparam -name secp224r1 -genkey` public half
    const OPENSSL_P224_KEY: &str = "ME4wEAYHKoZIzj0CAQYFK4EEACEDOgAEhDbTTiP5QgWFWfZMuvcY0Qt8AeYhH0ANv8OlGxu6IhwKF6YtNrc65j2qxzUxBlYi-EFLW1S_rpE=";

    #[test]
    fn test_p256_key_roundtrip() {
        let signing = p256::ecdsa::SigningKey::random(&mut OsRng);
        let der = signing.verifying_key().to_public_key_der().unwrap();
        let key = encode_public_key_der(der.as_bytes());

        let decoded = decode_public_key(&key).unwrap();
        assert_eq!(decoded, EcVerifyingKey::P256(signing.verifying_key().clone()));
        assert_eq!(decoded.curve().field_len(), 32);
    }

    #[test]
    fn test_unpadded_key_is_accepted() {
        let signing = p384::ecdsa::SigningKey::random(&mut OsRng);
        let der = signing.verifying_key().to_public_key_der().unwrap();
        let padded = encode_public_key_der(der.as_bytes());
        let unpadded = PartyKey(padded.as_str().trim_end_matches('=').to_string());

        assert_eq!(decode_public_key(&unpadded).unwrap().curve(), Curve::P384);
    }

    #[test]
    fn test_secp256k1_key() {
        let signing = k256::ecdsa::SigningKey::random(&mut OsRng);
        let der = signing.verifying_key().to_public_key_der().unwrap();
        let key = encode_public_key_der(der.as_bytes());

        assert_eq!(decode_public_key(&key).unwrap().curve(), Curve::Secp256k1);
    }

    #[test]
    fn test_ed25519_key_is_not_ec() {
        // SubjectPublicKeyInfo { id-Ed25519, 32 zero bytes }
        let mut der = vec![
            0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
        ];
        der.extend_from_slice(&[0u8; 32]);

        let err = decode_public_key(&encode_public_key_der(&der)).unwrap_err();
        assert!(matches!(err, CryptoError::NotEcKey(oid) if oid == "1.3.101.112"));
    }

    #[test]
    fn test_openssl_p521_and_p224_keys() {
        let p521 = PartyKey::new(OPENSSL_P521_KEY);
        let decoded = decode_public_key(&p521).unwrap();
        assert_eq!(decoded.curve(), Curve::P521);
        assert_eq!(decoded.curve().field_len(), 66);

        let p224 = PartyKey::new(OPENSSL_P224_KEY);
        let decoded = decode_public_key(&p224).unwrap();
        assert_eq!(decoded.curve(), Curve::P224);
        assert_eq!(decoded.curve().field_len(), 28);
    }

    #[test]
    fn test_unsupported_curve() {
        // SubjectPublicKeyInfo { id-ecPublicKey, secp192k1, <placeholder point> }
        let der = [
            0x30, 0x17, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06,
            0x05, 0x2b, 0x81, 0x04, 0x00, 0x1f, 0x03, 0x03, 0x00, 0x04, 0x00,
        ];

        let err = decode_public_key(&encode_public_key_der(&der)).unwrap_err();
        assert_eq!(err, CryptoError::UnsupportedCurve("1.3.132.0.31".to_string()));
    }

    #[test]
    fn test_garbage_key() {
        assert!(matches!(
            decode_public_key(&PartyKey::new("not base64!")),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            decode_public_key(&PartyKey::new("AAAA")),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }
}
