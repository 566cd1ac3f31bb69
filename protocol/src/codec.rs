//! # Identifier Codec
//!
//! Derives the byte-level identifiers the validators reason about:
//!
//! ```text
//! KeyHash    = blake2b_224(verifying_key)                      28 bytes
//! ScriptHash = blake2b_224(language_tag || script_bytes)       28 bytes
//! AssetName  = 0x59 || level || owner_key_hash                 30 bytes
//! Unit       = policy_id || asset_name                         58 bytes
//! ```
//!
//! The asset name layout makes `(owner, level)` recoverable from the name
//! alone, which is what lets the minting policy check a redeemer against
//! the quantities being minted without any extra lookup.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::{ASSET_NAME_LENGTH, ASSET_NAME_TAG, HASH28_LENGTH, MAX_LEVEL_BYTE};
use crate::crypto::keys::CustodialKey;
use crate::error::BadgeError;

// ---------------------------------------------------------------------------
// Hex validation
// ---------------------------------------------------------------------------

/// Normalizes a hex string that must encode exactly `expected_bytes` bytes.
///
/// Strips an optional `0x`/`0X` prefix and returns lowercase hex. The error
/// names the field, the expected byte length and the value as received.
pub fn validate_hex(input: &str, expected_bytes: usize, field: &str) -> Result<String, BadgeError> {
    let cleaned = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);

    if cleaned.len() != expected_bytes * 2 || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BadgeError::InvalidHex {
            field: field.to_string(),
            expected_bytes,
            actual: input.to_string(),
        });
    }
    Ok(cleaned.to_ascii_lowercase())
}

fn decode_fixed<const N: usize>(input: &str, field: &str) -> Result<[u8; N], BadgeError> {
    let normalized = validate_hex(input, N, field)?;
    let mut out = [0u8; N];
    hex::decode_to_slice(&normalized, &mut out).map_err(|_| BadgeError::InvalidHex {
        field: field.to_string(),
        expected_bytes: N,
        actual: input.to_string(),
    })?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// KeyHash / ScriptHash
// ---------------------------------------------------------------------------

/// BLAKE2b-224 hash of an Ed25519 verifying key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyHash([u8; HASH28_LENGTH]);

impl KeyHash {
    pub const fn new(bytes: [u8; HASH28_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a 28-byte hex key hash; `field` names it in the error.
    pub fn from_hex(input: &str, field: &str) -> Result<Self, BadgeError> {
        decode_fixed(input, field).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; HASH28_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// BLAKE2b-224 hash of a tagged script. A minting policy's hash is its
/// policy id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptHash([u8; HASH28_LENGTH]);

/// Policy ids are script hashes of minting policies.
pub type PolicyId = ScriptHash;

impl ScriptHash {
    pub const fn new(bytes: [u8; HASH28_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(input: &str, field: &str) -> Result<Self, BadgeError> {
        decode_fixed(input, field).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; HASH28_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

macro_rules! hex_display {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.to_hex())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s, stringify!($ty)).map_err(serde::de::Error::custom)
            }
        }
    )*};
}

hex_display!(KeyHash, ScriptHash, AssetName);

/// Derives the owner identity from the custodial key.
///
/// In custodial mode this is the only owner the service will ever mint
/// for, whatever the client claims.
pub fn derive_owner_key_hash(key: &CustodialKey) -> KeyHash {
    key.key_hash()
}

// ---------------------------------------------------------------------------
// AssetName
// ---------------------------------------------------------------------------

/// The 30-byte badge token name: `0x59 || level || owner`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetName([u8; ASSET_NAME_LENGTH]);

impl AssetName {
    pub fn as_bytes(&self) -> &[u8; ASSET_NAME_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 30-byte hex asset name and checks the tag byte.
    pub fn from_hex(input: &str, field: &str) -> Result<Self, BadgeError> {
        let bytes: [u8; ASSET_NAME_LENGTH] = decode_fixed(input, field)?;
        if bytes[0] != ASSET_NAME_TAG {
            return Err(BadgeError::InvalidHex {
                field: field.to_string(),
                expected_bytes: ASSET_NAME_LENGTH,
                actual: input.to_string(),
            });
        }
        Ok(Self(bytes))
    }

    /// Splits the name back into `(tag, level, owner)`.
    pub fn parts(&self) -> (u8, u8, KeyHash) {
        let mut owner = [0u8; HASH28_LENGTH];
        owner.copy_from_slice(&self.0[2..]);
        (self.0[0], self.0[1], KeyHash::new(owner))
    }

    pub fn level(&self) -> u8 {
        self.0[1]
    }

    pub fn owner(&self) -> KeyHash {
        self.parts().2
    }
}

/// Checks that `level` fits the one-byte level slot of an asset name.
pub fn level_byte(level: i64) -> Result<u8, BadgeError> {
    u8::try_from(level).map_err(|_| BadgeError::LevelOutOfRange {
        level,
        max: MAX_LEVEL_BYTE,
    })
}

/// Builds the asset name for `(owner, level)`.
///
/// Only the byte range 0..=255 is enforced here. The narrower range the
/// minting policy accepts is the orchestrator's concern.
pub fn make_asset_name(owner: &KeyHash, level: i64) -> Result<AssetName, BadgeError> {
    let level = level_byte(level)?;
    let mut bytes = [0u8; ASSET_NAME_LENGTH];
    bytes[0] = ASSET_NAME_TAG;
    bytes[1] = level;
    bytes[2..].copy_from_slice(owner.as_bytes());
    Ok(AssetName(bytes))
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// A fully-qualified native asset: policy id followed by asset name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Unit {
    pub policy_id: PolicyId,
    pub asset_name: AssetName,
}

impl Unit {
    pub fn new(policy_id: PolicyId, asset_name: AssetName) -> Self {
        Self {
            policy_id,
            asset_name,
        }
    }

    /// Convenience for `Unit::new(policy_id, make_asset_name(owner, level)?)`.
    pub fn badge(policy_id: PolicyId, owner: &KeyHash, level: i64) -> Result<Self, BadgeError> {
        Ok(Self::new(policy_id, make_asset_name(owner, level)?))
    }

    /// Lowercase hex of `policy_id || asset_name`.
    pub fn to_hex(&self) -> String {
        format!("{}{}", self.policy_id.to_hex(), self.asset_name.to_hex())
    }

    /// Parses the 58-byte hex form produced by [`Unit::to_hex`].
    pub fn from_hex(input: &str) -> Result<Self, BadgeError> {
        let normalized = validate_hex(input, HASH28_LENGTH + ASSET_NAME_LENGTH, "unit")?;
        let (policy, name) = normalized.split_at(HASH28_LENGTH * 2);
        Ok(Self {
            policy_id: ScriptHash::from_hex(policy, "unit policy id")?,
            asset_name: AssetName::from_hex(name, "unit asset name")?,
        })
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
