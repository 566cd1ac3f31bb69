//! # Cryptographic Primitives
//!
//! Thin wrappers over audited implementations:
//!
//! - **BLAKE2b** (224 and 256 bit) for the ledger's key, script and
//!   transaction hashes.
//! - **Ed25519** for the custodial signing key.

pub mod hash;
pub mod keys;

pub use hash::{blake2b_224, blake2b_224_parts, blake2b_256};
pub use keys::{verify_signature, CustodialKey};
