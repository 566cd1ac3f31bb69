//! # Hashing Utilities
//!
//! The ledger identifies everything by BLAKE2b digests of two widths:
//!
//! - **BLAKE2b-224** (28 bytes) — verification key hashes and script hashes
//!   (and therefore policy ids).
//! - **BLAKE2b-256** (32 bytes) — transaction ids, computed over the
//!   canonical transaction body bytes.
//!
//! Both are returned as fixed-size arrays so the width propagates through
//! the type system instead of being re-checked at every call site.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

use crate::config::{HASH28_LENGTH, TX_HASH_LENGTH};

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Compute the BLAKE2b-224 digest of the input.
///
/// # Example
///
/// ```
/// use badge_protocol::crypto::blake2b_224;
///
/// let hash = blake2b_224(b"badge");
/// assert_eq!(hash.len(), 28);
/// ```
pub fn blake2b_224(data: &[u8]) -> [u8; HASH28_LENGTH] {
    let mut hasher = Blake2b224::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH28_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE2b-224 digest of several byte slices fed in order.
///
/// Used for script hashes, where the language tag precedes the script bytes
/// and copying them into one buffer first would be wasted work.
pub fn blake2b_224_parts(parts: &[&[u8]]) -> [u8; HASH28_LENGTH] {
    let mut hasher = Blake2b224::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; HASH28_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE2b-256 digest of the input.
pub fn blake2b_256(data: &[u8]) -> [u8; TX_HASH_LENGTH] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; TX_HASH_LENGTH];
    output.copy_from_slice(&result);
    output
}
