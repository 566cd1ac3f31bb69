// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Badge Protocol — Core Library
//!
//! Builds, signs and submits the three lifecycle transactions of a
//! per-owner, per-level badge token on a UTXO ledger with Plutus
//! validators:
//!
//! - **Init** mints level `L` and locks it at the holder script.
//! - **Upgrade** spends the locked `L-1`, burns it, mints and locks `L`.
//! - **Retire** spends the locked `L` and burns it.
//!
//! Two validators approve every transaction: the minting policy checks the
//! mint redeemer against the mint map, the holder validator checks the
//! spend of a locked badge.
//!
//! ## Architecture
//!
//! - **config** — Protocol constants and the runtime [`BadgeConfig`].
//! - **error** — [`BadgeError`] and its [`ErrorKind`] classes.
//! - **crypto** — BLAKE2b hashes and the custodial Ed25519 key.
//! - **codec** — Hex validation, key hashes, asset names, units.
//! - **address** — Networks and bech32 script addresses.
//! - **plutus** — Plutus data CBOR plus the badge datum and redeemers.
//! - **blueprint** — Loading the compiled validators from `plutus.json`.
//! - **ledger** — The async ledger seam and the in-memory emulator.
//! - **locator** — Finding the locked badge an action spends.
//! - **transaction** — Intent building, signing, verification, assembly.
//! - **orchestrator** — The public [`mint_badge`] entry point.
//!
//! ## Design Philosophy
//!
//! 1. The owner is always the custodial key's hash. Client hints are
//!    advisory and never trusted.
//! 2. Everything that can be checked without I/O is checked first.
//! 3. A request either submits one complete transaction or nothing.

pub mod address;
pub mod blueprint;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod locator;
pub mod orchestrator;
pub mod plutus;
pub mod transaction;

pub use address::Network;
pub use codec::{AssetName, KeyHash, PolicyId, ScriptHash, Unit};
pub use config::BadgeConfig;
pub use error::{BadgeError, ErrorKind};
pub use orchestrator::{mint_badge, BadgeContext, BadgeRequest, MintResponse};
pub use transaction::BadgeAction;
