//! # Custodial Key
//!
//! The service mints on behalf of its users with a single Ed25519 key held
//! by the process. The owner identity written into every badge is the
//! BLAKE2b-224 hash of that key's verifying half, so whoever holds this key
//! *is* the badge owner as far as the validators are concerned.
//!
//! Accepted encodings for the secret:
//!
//! - 64 hex characters (32-byte seed), optionally prefixed with `0x`.
//! - Bech32 with the `ed25519_sk` human-readable part, as produced by the
//!   usual ledger CLI tooling.
//!
//! Key bytes are never logged. Neither is anything derived from them except
//! the key hash, which is public by construction.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;

use crate::codec::{validate_hex, KeyHash};
use crate::config::SIGNING_KEY_LENGTH;
use crate::crypto::hash::blake2b_224;
use crate::error::BadgeError;

/// Bech32 human-readable part for raw Ed25519 signing keys.
pub const SIGNING_KEY_HRP: &str = "ed25519_sk";

/// The process-held Ed25519 signing key.
///
/// Intentionally not `Serialize`: exporting key material should be a
/// deliberate act via [`CustodialKey::to_hex`], never a side effect of
/// putting a struct into a JSON response.
#[derive(Clone)]
pub struct CustodialKey {
    signing_key: SigningKey,
}

impl CustodialKey {
    /// Generates a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Builds a key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses a hex seed (with optional `0x`) or a bech32 `ed25519_sk` key.
    pub fn parse(raw: &str) -> Result<Self, BadgeError> {
        let raw = raw.trim();
        if raw.starts_with(SIGNING_KEY_HRP) {
            return Self::from_bech32(raw);
        }
        let hex_seed = validate_hex(raw, SIGNING_KEY_LENGTH, "signing key").map_err(|_| {
            BadgeError::InvalidSigningKey(format!(
                "expected {} hex characters or a bech32 {} key",
                SIGNING_KEY_LENGTH * 2,
                SIGNING_KEY_HRP
            ))
        })?;
        let bytes = hex::decode(hex_seed)
            .map_err(|e| BadgeError::InvalidSigningKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Parses a bech32-encoded `ed25519_sk1...` key.
    pub fn from_bech32(encoded: &str) -> Result<Self, BadgeError> {
        let (hrp, data) = bech32::decode(encoded)
            .map_err(|e| BadgeError::InvalidSigningKey(e.to_string()))?;
        if hrp.as_str() != SIGNING_KEY_HRP {
            return Err(BadgeError::InvalidSigningKey(format!(
                "unexpected bech32 prefix {:?}",
                hrp.as_str()
            )));
        }
        Self::from_slice(&data)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, BadgeError> {
        let seed: [u8; SIGNING_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            BadgeError::InvalidSigningKey(format!(
                "expected {} bytes, got {}",
                SIGNING_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// Raw verifying key bytes, as they appear in transaction witnesses.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// BLAKE2b-224 of the verifying key.
    pub fn key_hash(&self) -> KeyHash {
        KeyHash::new(blake2b_224(&self.public_key_bytes()))
    }

    /// Signs `message` (in practice, a 32-byte transaction id).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Hex export of the seed. Handle with care.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Bech32 export of the seed (`ed25519_sk1...`).
    pub fn to_bech32(&self) -> Result<String, BadgeError> {
        let hrp = bech32::Hrp::parse(SIGNING_KEY_HRP)
            .map_err(|e| BadgeError::InvalidSigningKey(e.to_string()))?;
        bech32::encode::<bech32::Bech32>(hrp, &self.signing_key.to_bytes())
            .map_err(|e| BadgeError::InvalidSigningKey(e.to_string()))
    }
}

/// Verifies an Ed25519 signature given raw verifying key bytes. Malformed
/// keys or signatures simply fail verification.
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    match VerifyingKey::from_bytes(public_key) {
        Ok(vk) => vk.verify(message, &Signature::from_bytes(signature)).is_ok(),
        Err(_) => false,
    }
}

impl fmt::Debug for CustodialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodialKey")
            .field("key_hash", &self.key_hash().to_hex())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_prefixed_hex_agree() {
        let seed = [7u8; 32];
        let plain = CustodialKey::parse(&hex::encode(seed)).unwrap();
        let prefixed = CustodialKey::parse(&format!("0x{}", hex::encode(seed).to_uppercase())).unwrap();
        assert_eq!(plain.key_hash(), prefixed.key_hash());
    }

    #[test]
    fn bech32_roundtrip() {
        let key = CustodialKey::from_seed(&[9u8; 32]);
        let encoded = key.to_bech32().unwrap();
        assert!(encoded.starts_with("ed25519_sk1"));
        let decoded = CustodialKey::parse(&encoded).unwrap();
        assert_eq!(decoded.key_hash(), key.key_hash());
    }

    #[test]
    fn short_key_rejected() {
        let err = CustodialKey::parse("abcd").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn key_hash_is_deterministic() {
        let a = CustodialKey::from_seed(&[1u8; 32]);
        let b = CustodialKey::from_seed(&[1u8; 32]);
        let c = CustodialKey::from_seed(&[2u8; 32]);
        assert_eq!(a.key_hash(), b.key_hash());
        assert_ne!(a.key_hash(), c.key_hash());
    }

    #[test]
    fn signature_verifies() {
        let key = CustodialKey::generate();
        let msg = [0xAB; 32];
        let sig = key.sign(&msg);
        assert!(verify_signature(&key.public_key_bytes(), &msg, &sig));
        assert!(!verify_signature(&key.public_key_bytes(), &[0u8; 32], &sig));
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let key = CustodialKey::from_seed(&[5u8; 32]);
        let dbg = format!("{key:?}");
        assert!(!dbg.contains(&key.to_hex()));
    }
}
