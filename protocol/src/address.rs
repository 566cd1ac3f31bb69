//! Script addresses.
//!
//! Badges are locked at an enterprise address whose payment credential is
//! the holder validator's script hash. The header byte carries the address
//! type (`0b0111`, script payment credential, no stake part) in the high
//! nibble and the network id in the low nibble.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codec::ScriptHash;
use crate::error::BadgeError;

/// Address type nibble for an enterprise address with a script credential.
const ENTERPRISE_SCRIPT_HEADER: u8 = 0b0111_0000;

/// Ledger network the addresses are derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Network id nibble written into address headers.
    pub fn id(&self) -> u8 {
        match self {
            Self::Mainnet => 1,
            Self::Testnet => 0,
        }
    }

    /// Bech32 human-readable part for payment addresses.
    pub fn address_hrp(&self) -> &'static str {
        match self {
            Self::Mainnet => "addr",
            Self::Testnet => "addr_test",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = BadgeError;

    /// Accepts `mainnet`, plus `testnet`, `preprod`, `preview` for the
    /// test networks, which share one address encoding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" | "preprod" | "preview" => Ok(Self::Testnet),
            other => Err(BadgeError::Config(format!("unknown network {:?}", other))),
        }
    }
}

/// Bech32 enterprise address locked by `script`.
pub fn script_address(script: &ScriptHash, network: Network) -> Result<String, BadgeError> {
    let mut payload = Vec::with_capacity(1 + script.as_bytes().len());
    payload.push(ENTERPRISE_SCRIPT_HEADER | network.id());
    payload.extend_from_slice(script.as_bytes());

    let hrp = bech32::Hrp::parse(network.address_hrp())
        .map_err(|e| BadgeError::Config(format!("bad address prefix: {e}")))?;
    bech32::encode::<bech32::Bech32>(hrp, &payload)
        .map_err(|e| BadgeError::Config(format!("address encoding failed: {e}")))
}

/// Recovers the script hash from an enterprise script address, if it is one.
pub fn script_hash_of(address: &str) -> Option<ScriptHash> {
    let (_, payload) = bech32::decode(address).ok()?;
    if payload.len() != 29 || payload[0] & 0xF0 != ENTERPRISE_SCRIPT_HEADER {
        return None;
    }
    let mut hash = [0u8; 28];
    hash.copy_from_slice(&payload[1..]);
    Some(ScriptHash::new(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_prefix_and_roundtrip() {
        let hash = ScriptHash::new([0x42; 28]);
        let addr = script_address(&hash, Network::Testnet).unwrap();
        assert!(addr.starts_with("addr_test1"));
        assert_eq!(script_hash_of(&addr), Some(hash));
    }

    #[test]
    fn mainnet_differs_from_testnet() {
        let hash = ScriptHash::new([0x42; 28]);
        let main = script_address(&hash, Network::Mainnet).unwrap();
        let test = script_address(&hash, Network::Testnet).unwrap();
        assert!(main.starts_with("addr1"));
        assert_ne!(main, test);
    }

    #[test]
    fn network_parsing() {
        assert_eq!("Preprod".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("moonnet".parse::<Network>().is_err());
    }

    #[test]
    fn non_script_address_is_ignored() {
        assert_eq!(script_hash_of("not-an-address"), None);
    }
}
