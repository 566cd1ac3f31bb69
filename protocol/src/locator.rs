//! # Locked-Badge Locator
//!
//! Finds the output at the holder address that carries a given badge unit.
//! Upgrade and Retire both start here; Init never calls it.

use crate::codec::Unit;
use crate::error::BadgeError;
use crate::ledger::{LedgerClient, UnspentOutput};

/// Returns the first output at `holder_address` holding `unit`.
///
/// Makes exactly one ledger lookup. An empty result is a state error naming
/// the badge level and the address searched.
pub async fn find_locked_badge(
    ledger: &dyn LedgerClient,
    holder_address: &str,
    unit: &Unit,
) -> Result<UnspentOutput, BadgeError> {
    let candidates = ledger.utxos_at_with_unit(holder_address, unit).await?;
    if candidates.len() > 1 {
        tracing::debug!(
            %unit,
            count = candidates.len(),
            "several outputs hold the badge; using the first"
        );
    }
    candidates
        .into_iter()
        .find(|u| u.value.quantity_of(unit) > 0)
        .ok_or_else(|| BadgeError::LockedBadgeNotFound {
            level: unit.asset_name.level(),
            address: holder_address.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Network;
    use crate::codec::{KeyHash, ScriptHash};
    use crate::crypto::keys::CustodialKey;
    use crate::error::ErrorKind;
    use crate::ledger::Emulator;
    use crate::transaction::types::{OutputRef, OutputValue, TxHash};

    const ADDRESS: &str = "addr_test1wholder";

    fn unit(level: i64) -> Unit {
        Unit::badge(ScriptHash::new([0x01; 28]), &KeyHash::new([0x02; 28]), level).unwrap()
    }

    #[tokio::test]
    async fn miss_names_level_and_address() {
        let ledger = Emulator::new(Network::Testnet, CustodialKey::generate());
        let err = find_locked_badge(&ledger, ADDRESS, &unit(3)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(
            err.to_string(),
            format!("no badge-holder output found for level 3 at address {ADDRESS}")
        );
        assert_eq!(ledger.call_counts().lookups, 1);
    }

    #[tokio::test]
    async fn returns_output_holding_unit() {
        let ledger = Emulator::new(Network::Testnet, CustodialKey::generate());
        let held = UnspentOutput {
            out_ref: OutputRef::new(TxHash::new([9; 32]), 1),
            address: ADDRESS.into(),
            value: OutputValue::lovelace(2_000_000).with_asset(unit(1), 1),
            datum: None,
        };
        ledger.seed(held.clone());
        ledger.seed(UnspentOutput {
            out_ref: OutputRef::new(TxHash::new([8; 32]), 0),
            address: ADDRESS.into(),
            value: OutputValue::lovelace(2_000_000).with_asset(unit(2), 1),
            datum: None,
        });

        let found = find_locked_badge(&ledger, ADDRESS, &unit(1)).await.unwrap();
        assert_eq!(found, held);
    }
}
