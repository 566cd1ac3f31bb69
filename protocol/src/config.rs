//! # Protocol Configuration & Constants
//!
//! Every magic number in the badge protocol lives here, next to the runtime
//! [`BadgeConfig`] that the node assembles from its environment.
//!
//! The byte-level constants are shared with the on-chain validators. Changing
//! one of them without recompiling the scripts yields transactions the ledger
//! will reject, so treat them as part of the wire format.

use std::path::PathBuf;

use crate::address::Network;
use crate::crypto::keys::CustodialKey;
use crate::error::BadgeError;

// ---------------------------------------------------------------------------
// Identifier Layout
// ---------------------------------------------------------------------------

/// Leading byte of every badge asset name. `0x59` is ASCII "Y".
pub const ASSET_NAME_TAG: u8 = 0x59;

/// Key hashes and script hashes are BLAKE2b-224 digests.
pub const HASH28_LENGTH: usize = 28;

/// Transaction ids are BLAKE2b-256 digests.
pub const TX_HASH_LENGTH: usize = 32;

/// Tag byte + level byte + owner key hash.
pub const ASSET_NAME_LENGTH: usize = 2 + HASH28_LENGTH;

/// Largest level the asset-name codec can represent (one byte).
pub const MAX_LEVEL_BYTE: i64 = 255;

/// Highest level the minting policy accepts. Levels above this are rejected
/// at the request boundary unless the config raises it.
pub const DEFAULT_MAX_BADGE_LEVEL: u8 = 4;

/// Length of a raw Ed25519 seed.
pub const SIGNING_KEY_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Contract Bundle
// ---------------------------------------------------------------------------

/// Script language version the validators were compiled for. A bundle with
/// any other `plutusVersion` is refused.
pub const PLUTUS_VERSION: &str = "v3";

/// Language tag prepended to the script bytes before hashing (Plutus V3).
pub const PLUTUS_V3_HASH_TAG: u8 = 0x03;

/// Relative path of the compiled contract bundle.
pub const DEFAULT_BLUEPRINT_PATH: &str = "plutus.json";

/// Blueprint title of the badge minting policy.
pub const DEFAULT_POLICY_TITLE: &str = "badge.badge_policy.mint";

/// Blueprint title of the spending validator that holds locked badges.
pub const DEFAULT_HOLDER_TITLE: &str = "badge.badge_holder.spend";

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Lovelace locked alongside each badge token so the output clears the
/// ledger's minimum-UTxO rule.
pub const DEFAULT_LOCKED_LOVELACE: u64 = 2_000_000;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

pub const ENV_SIGNING_KEY: &str = "BADGE_SIGNING_KEY";
pub const ENV_NETWORK: &str = "BADGE_NETWORK";
pub const ENV_BLUEPRINT_PATH: &str = "BADGE_BLUEPRINT_PATH";
pub const ENV_LOCKED_LOVELACE: &str = "BADGE_LOCKED_LOVELACE";
pub const ENV_MAX_LEVEL: &str = "BADGE_MAX_LEVEL";
pub const ENV_POLICY_TITLE: &str = "BADGE_POLICY_TITLE";
pub const ENV_HOLDER_TITLE: &str = "BADGE_HOLDER_TITLE";

// ---------------------------------------------------------------------------
// BadgeConfig
// ---------------------------------------------------------------------------

/// Runtime settings for the badge minting service.
///
/// The signing key is mandatory: [`BadgeConfig::from_env`] and
/// [`BadgeConfig::custodial_key`] fail fast when it is absent so that no
/// request ever starts work it cannot finish.
#[derive(Debug, Clone)]
pub struct BadgeConfig {
    /// Custodial signing key as supplied (hex seed or bech32 `ed25519_sk`).
    pub signing_key: Option<String>,
    /// Ledger network the script address is derived for.
    pub network: Network,
    /// Location of the compiled contract bundle.
    pub blueprint_path: PathBuf,
    /// Blueprint title of the minting policy.
    pub policy_title: String,
    /// Blueprint title of the holder spending validator.
    pub holder_title: String,
    /// Lovelace reserved in every badge output.
    pub locked_lovelace: u64,
    /// Highest level a request may name.
    pub max_level: u8,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            network: Network::Testnet,
            blueprint_path: PathBuf::from(DEFAULT_BLUEPRINT_PATH),
            policy_title: DEFAULT_POLICY_TITLE.to_string(),
            holder_title: DEFAULT_HOLDER_TITLE.to_string(),
            locked_lovelace: DEFAULT_LOCKED_LOVELACE,
            max_level: DEFAULT_MAX_BADGE_LEVEL,
        }
    }
}

impl BadgeConfig {
    /// Builds a config from the process environment.
    pub fn from_env() -> Result<Self, BadgeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Unset optional
    /// variables fall back to the defaults; a missing signing key is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BadgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.signing_key = Some(
            lookup(ENV_SIGNING_KEY)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    BadgeError::Config(format!("{} is not set", ENV_SIGNING_KEY))
                })?,
        );

        if let Some(network) = lookup(ENV_NETWORK) {
            config.network = network.parse()?;
        }
        if let Some(path) = lookup(ENV_BLUEPRINT_PATH) {
            config.blueprint_path = PathBuf::from(path);
        }
        if let Some(title) = lookup(ENV_POLICY_TITLE) {
            config.policy_title = title;
        }
        if let Some(title) = lookup(ENV_HOLDER_TITLE) {
            config.holder_title = title;
        }
        if let Some(raw) = lookup(ENV_LOCKED_LOVELACE) {
            config.locked_lovelace = raw.trim().parse().map_err(|_| {
                BadgeError::Config(format!("{} must be an integer, got {:?}", ENV_LOCKED_LOVELACE, raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_LEVEL) {
            config.max_level = raw.trim().parse().map_err(|_| {
                BadgeError::Config(format!("{} must be in 0..=255, got {:?}", ENV_MAX_LEVEL, raw))
            })?;
        }

        Ok(config)
    }

    /// Parses the configured signing key.
    pub fn custodial_key(&self) -> Result<CustodialKey, BadgeError> {
        let raw = self
            .signing_key
            .as_deref()
            .ok_or_else(|| BadgeError::Config(format!("{} is not set", ENV_SIGNING_KEY)))?;
        CustodialKey::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_asset_name_layout() {
        assert_eq!(ASSET_NAME_LENGTH, 30);
        assert_eq!(ASSET_NAME_TAG, b'Y');
    }

    #[test]
    fn test_missing_signing_key_is_config_error() {
        let err = BadgeConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        assert!(err.to_string().contains(ENV_SIGNING_KEY));
    }

    #[test]
    fn test_blank_signing_key_is_config_error() {
        let err = BadgeConfig::from_lookup(lookup_from(&[(ENV_SIGNING_KEY, "  ")])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_defaults_apply() {
        let cfg = BadgeConfig::from_lookup(lookup_from(&[(ENV_SIGNING_KEY, "00")])).unwrap();
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.locked_lovelace, DEFAULT_LOCKED_LOVELACE);
        assert_eq!(cfg.max_level, DEFAULT_MAX_BADGE_LEVEL);
        assert_eq!(cfg.blueprint_path, PathBuf::from(DEFAULT_BLUEPRINT_PATH));
    }

    #[test]
    fn test_overrides_apply() {
        let cfg = BadgeConfig::from_lookup(lookup_from(&[
            (ENV_SIGNING_KEY, "00"),
            (ENV_NETWORK, "mainnet"),
            (ENV_LOCKED_LOVELACE, "1500000"),
            (ENV_MAX_LEVEL, "7"),
            (ENV_HOLDER_TITLE, "custom.holder.spend"),
        ]))
        .unwrap();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.locked_lovelace, 1_500_000);
        assert_eq!(cfg.max_level, 7);
        assert_eq!(cfg.holder_title, "custom.holder.spend");
    }

    #[test]
    fn test_bad_numeric_override_rejected() {
        let err = BadgeConfig::from_lookup(lookup_from(&[
            (ENV_SIGNING_KEY, "00"),
            (ENV_MAX_LEVEL, "900"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_custodial_key_requires_key() {
        let cfg = BadgeConfig::default();
        assert!(cfg.custodial_key().is_err());
    }
}
