//! Error types for the badge protocol.
//!
//! Every fallible operation returns a [`BadgeError`]. Variants are grouped by
//! [`ErrorKind`] so callers (the HTTP layer in particular) can branch on the
//! failure class without matching message strings.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::transaction::types::BadgeAction;

/// Failure class of a [`BadgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed process configuration (signing key, settings).
    Configuration,
    /// Malformed request data: bad hex, out-of-range level, unknown action.
    Validation,
    /// The contract bundle could not supply the required scripts.
    Resolution,
    /// The ledger does not hold the badge the request refers to.
    State,
    /// The ledger client failed or rejected the transaction.
    Submission,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Resolution => write!(f, "resolution"),
            Self::State => write!(f, "state"),
            Self::Submission => write!(f, "submission"),
        }
    }
}

/// Errors produced while building, signing, or submitting badge transactions.
#[derive(Debug, Error)]
pub enum BadgeError {
    // ============ Configuration ============
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    // ============ Validation ============
    #[error("invalid {field}: expected {expected_bytes} bytes of hex, got {actual:?}")]
    InvalidHex {
        field: String,
        expected_bytes: usize,
        actual: String,
    },

    #[error("level {level} is out of range (allowed 0..={max})")]
    LevelOutOfRange { level: i64, max: i64 },

    #[error("Upgrade requires level ≥ 1, got {0}")]
    UpgradeRequiresPriorLevel(i64),

    #[error("{action} redeemer is missing required field `{field}`")]
    MissingRedeemerField {
        action: BadgeAction,
        field: &'static str,
    },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unknown action {0:?}: expected Init, Upgrade or Retire")]
    UnknownAction(String),

    #[error("invalid plutus data: {0}")]
    InvalidPlutusData(String),

    #[error("mint map does not match the {action} redeemer: {detail}")]
    MintMismatch { action: BadgeAction, detail: String },

    // ============ Resolution ============
    #[error("contract bundle unreadable: {0}")]
    BlueprintUnreadable(String),

    #[error("unsupported plutus version: expected {expected}, found {found}")]
    UnsupportedPlutusVersion { expected: String, found: String },

    #[error("script not found: {0}")]
    ScriptNotFound(String),

    #[error("script hash mismatch for {title}: bundle declares {declared}, computed {computed}")]
    ScriptHashMismatch {
        title: String,
        declared: String,
        computed: String,
    },

    // ============ State ============
    #[error("no badge-holder output found for level {level} at address {address}")]
    LockedBadgeNotFound { level: u8, address: String },

    // ============ Submission ============
    #[error("ledger {operation} failed: {reason}")]
    Ledger {
        operation: &'static str,
        reason: String,
    },

    /// Wraps any failure raised while assembling, signing, or submitting.
    #[error("{action} mint failed: {source}")]
    MintFailed {
        action: BadgeAction,
        #[source]
        source: Box<BadgeError>,
    },
}

impl BadgeError {
    /// Returns the failure class. `MintFailed` reports the class of the
    /// underlying cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidSigningKey(_) => ErrorKind::Configuration,
            Self::InvalidHex { .. }
            | Self::LevelOutOfRange { .. }
            | Self::UpgradeRequiresPriorLevel(_)
            | Self::MissingRedeemerField { .. }
            | Self::UnknownAction(_)
            | Self::MalformedRequest(_)
            | Self::InvalidPlutusData(_)
            | Self::MintMismatch { .. } => ErrorKind::Validation,
            Self::BlueprintUnreadable(_)
            | Self::UnsupportedPlutusVersion { .. }
            | Self::ScriptNotFound(_)
            | Self::ScriptHashMismatch { .. } => ErrorKind::Resolution,
            Self::LockedBadgeNotFound { .. } => ErrorKind::State,
            Self::Ledger { .. } => ErrorKind::Submission,
            Self::MintFailed { source, .. } => source.kind(),
        }
    }

    /// Wraps `self` as a mint failure for `action`. Already-wrapped errors
    /// are returned unchanged.
    pub fn during(self, action: BadgeAction) -> Self {
        match self {
            wrapped @ Self::MintFailed { .. } => wrapped,
            other => Self::MintFailed {
                action,
                source: Box::new(other),
            },
        }
    }

    /// Shorthand for a ledger-side failure.
    pub fn ledger(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Ledger {
            operation,
            reason: reason.into(),
        }
    }
}
