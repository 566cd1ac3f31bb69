//! Core type definitions for badge transactions.
//!
//! These types form the vocabulary shared by the assembler, the ledger seam
//! and the emulator. They are small value types; nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::codec::Unit;
use crate::config::TX_HASH_LENGTH;
use crate::error::BadgeError;

// ---------------------------------------------------------------------------
// BadgeAction
// ---------------------------------------------------------------------------

/// The three state transitions a badge can go through.
///
/// ```text
///   Init(L)          Upgrade(L)               Retire(L)
///   ─────► [locked L] ─────────► [locked L] ──────────► (burned)
///                     burn L-1,
///                     mint L
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BadgeAction {
    /// Mint level `L` and lock it at the holder script.
    #[default]
    Init,
    /// Spend the locked `L-1` badge, burn it, mint and lock `L`.
    Upgrade,
    /// Spend the locked `L` badge and burn it.
    Retire,
}

impl BadgeAction {
    /// Every action, in lifecycle order.
    pub const ALL: [BadgeAction; 3] = [Self::Init, Self::Upgrade, Self::Retire];
}

impl fmt::Display for BadgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::Upgrade => write!(f, "Upgrade"),
            Self::Retire => write!(f, "Retire"),
        }
    }
}

impl FromStr for BadgeAction {
    type Err = BadgeError;

    /// Case-insensitive; anything outside the three actions is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "init" => Ok(Self::Init),
            "upgrade" => Ok(Self::Upgrade),
            "retire" => Ok(Self::Retire),
            _ => Err(BadgeError::UnknownAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TxHash / OutputRef
// ---------------------------------------------------------------------------

/// BLAKE2b-256 transaction id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxHash([u8; TX_HASH_LENGTH]);

impl TxHash {
    pub const fn new(bytes: [u8; TX_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TX_HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputRef {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl OutputRef {
    pub const fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

// ---------------------------------------------------------------------------
// OutputValue
// ---------------------------------------------------------------------------

/// Lovelace plus native assets carried by an output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputValue {
    pub lovelace: u64,
    pub assets: BTreeMap<Unit, u64>,
}

impl OutputValue {
    pub fn lovelace(lovelace: u64) -> Self {
        Self {
            lovelace,
            assets: BTreeMap::new(),
        }
    }

    /// Adds `quantity` of `unit`.
    pub fn with_asset(mut self, unit: Unit, quantity: u64) -> Self {
        *self.assets.entry(unit).or_insert(0) += quantity;
        self
    }

    /// Quantity of `unit` held, zero if absent.
    pub fn quantity_of(&self, unit: &Unit) -> u64 {
        self.assets.get(unit).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{KeyHash, ScriptHash};

    #[test]
    fn action_display_and_parse() {
        for action in BadgeAction::ALL {
            assert_eq!(action.to_string().parse::<BadgeAction>().unwrap(), action);
        }
        assert_eq!("retire".parse::<BadgeAction>().unwrap(), BadgeAction::Retire);
        assert_eq!(" UPGRADE ".parse::<BadgeAction>().unwrap(), BadgeAction::Upgrade);
    }

    #[test]
    fn unknown_action_rejected() {
        let err = "Transfer".parse::<BadgeAction>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(err.to_string().contains("Transfer"));
    }

    #[test]
    fn default_action_is_init() {
        assert_eq!(BadgeAction::default(), BadgeAction::Init);
    }

    #[test]
    fn output_value_accumulates() {
        let unit = Unit::badge(ScriptHash::new([1; 28]), &KeyHash::new([2; 28]), 0).unwrap();
        let value = OutputValue::lovelace(10)
            .with_asset(unit, 1)
            .with_asset(unit, 2);
        assert_eq!(value.quantity_of(&unit), 3);
        assert_eq!(value.lovelace, 10);
    }

    #[test]
    fn output_ref_display() {
        let r = OutputRef::new(TxHash::new([0xAB; 32]), 1);
        assert!(r.to_string().ends_with("#1"));
        assert!(r.to_string().starts_with("abab"));
    }
}
