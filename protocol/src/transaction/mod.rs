//! # Transaction Module
//!
//! Construction, signing and verification of badge lifecycle transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — BadgeAction, TxHash, OutputRef, OutputValue
//! builder.rs      — TransactionIntent and the fluent IntentBuilder
//! signing.rs      — Witnessing an intent with the custodial key
//! verification.rs — Ledger-side checks on a signed transaction
//! assembler.rs    — Init / Upgrade / Retire construction and submission
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** — [`BadgeAssembler`] produces a checked [`TransactionIntent`].
//! 2. **Sign** — the ledger client witnesses it ([`sign_intent`] for
//!    clients holding a [`crate::crypto::CustodialKey`]).
//! 3. **Submit** — the ledger runs [`verify_signed`] and applies it.
//!
//! ## Design Decisions
//!
//! - Transaction ids are `blake2b_256` of the canonical body bytes, which
//!   cover inputs, outputs, mint, redeemers and required signers.
//! - Quantities are integers throughout: `u64` lovelace and asset amounts,
//!   `i64` for signed mint entries.

pub mod assembler;
pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;

pub use assembler::{BadgeAssembler, MintOutcome};
pub use builder::{IntentBuilder, ScriptInput, TransactionIntent, TxOutput};
pub use signing::sign_intent;
pub use types::{BadgeAction, OutputRef, OutputValue, TxHash};
pub use verification::{verify_signed, VerificationError};
