//! In-memory devnet ledger.
//!
//! Holds a UTXO set and the custodial key, and applies badge transactions
//! the way a node would after phase-1 validation:
//!
//! - [`verify_signed`] passes (id, witnesses, required signers, scripts,
//!   mint redeemer);
//! - every spent input exists and is unspent;
//! - native tokens are conserved: `inputs + mint == outputs` per unit.
//!
//! Lovelace is balanced from the custodial wallet, which the emulator treats
//! as unlimited, so only locked outputs appear in the UTXO set.
//!
//! ## Design
//!
//! - `parking_lot::RwLock` guards all state. Locks are held only inside
//!   synchronous sections, never across an `.await`.
//! - Call counters are plain atomics so tests can assert how many ledger
//!   round trips an operation made.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{LedgerClient, SignedTransaction, UnspentOutput};
use crate::address::Network;
use crate::codec::Unit;
use crate::crypto::keys::CustodialKey;
use crate::error::BadgeError;
use crate::transaction::builder::TransactionIntent;
use crate::transaction::signing::sign_intent;
use crate::transaction::types::{OutputRef, TxHash};
use crate::transaction::verification::verify_signed;

/// A transaction the emulator has applied.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub tx_hash: TxHash,
    pub mint: BTreeMap<Unit, i64>,
    pub spent: Vec<OutputRef>,
    pub created: Vec<OutputRef>,
}

#[derive(Debug, Default)]
struct LedgerState {
    utxos: BTreeMap<OutputRef, UnspentOutput>,
    history: Vec<LedgerEntry>,
    reject_reason: Option<String>,
}

/// Snapshot of how often each ledger operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub lookups: u64,
    pub signatures: u64,
    pub submissions: u64,
}

/// In-memory ledger implementing [`LedgerClient`].
#[derive(Debug)]
pub struct Emulator {
    network: Network,
    key: CustodialKey,
    state: RwLock<LedgerState>,
    lookups: AtomicU64,
    signatures: AtomicU64,
    submissions: AtomicU64,
}

impl Emulator {
    pub fn new(network: Network, key: CustodialKey) -> Self {
        Self {
            network,
            key,
            state: RwLock::new(LedgerState::default()),
            lookups: AtomicU64::new(0),
            signatures: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Adds an output directly to the UTXO set, bypassing validation.
    pub fn seed(&self, utxo: UnspentOutput) {
        self.state.write().utxos.insert(utxo.out_ref, utxo);
    }

    /// All unspent outputs at `address`.
    pub fn utxos_at(&self, address: &str) -> Vec<UnspentOutput> {
        self.state
            .read()
            .utxos
            .values()
            .filter(|u| u.address == address)
            .cloned()
            .collect()
    }

    /// Total quantity of `unit` held at `address`.
    pub fn holdings(&self, address: &str, unit: &Unit) -> u64 {
        self.state
            .read()
            .utxos
            .values()
            .filter(|u| u.address == address)
            .map(|u| u.value.quantity_of(unit))
            .sum()
    }

    /// Applied transactions, oldest first.
    pub fn history(&self) -> Vec<LedgerEntry> {
        self.state.read().history.clone()
    }

    /// Makes every following submission fail with `reason`, or restores
    /// normal behavior with `None`.
    pub fn reject_submissions(&self, reason: Option<String>) {
        self.state.write().reject_reason = reason;
    }

    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            lookups: self.lookups.load(Ordering::Relaxed),
            signatures: self.signatures.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
        }
    }

    fn apply(&self, tx: &SignedTransaction) -> Result<LedgerEntry, BadgeError> {
        let fail = |reason: String| BadgeError::ledger("submit", reason);
        let intent = &tx.intent;

        let mut state = self.state.write();
        if let Some(reason) = &state.reject_reason {
            return Err(fail(reason.clone()));
        }

        let mut balance: BTreeMap<Unit, i128> = BTreeMap::new();
        for input in &intent.inputs {
            let utxo = state
                .utxos
                .get(&input.utxo.out_ref)
                .ok_or_else(|| fail(format!("input {} is unknown or spent", input.utxo.out_ref)))?;
            for (unit, qty) in &utxo.value.assets {
                *balance.entry(*unit).or_insert(0) += i128::from(*qty);
            }
        }
        for (unit, qty) in &intent.mint {
            *balance.entry(*unit).or_insert(0) += i128::from(*qty);
        }
        for output in &intent.outputs {
            for (unit, qty) in &output.value.assets {
                *balance.entry(*unit).or_insert(0) -= i128::from(*qty);
            }
        }
        if let Some((unit, delta)) = balance.iter().find(|(_, d)| **d != 0) {
            return Err(fail(format!(
                "value not conserved for {}: {} unaccounted",
                unit.asset_name, delta
            )));
        }

        let created: Vec<OutputRef> = (0..intent.outputs.len())
            .map(|i| OutputRef::new(tx.tx_hash, i as u32))
            .collect();
        if let Some(existing) = created.iter().find(|r| state.utxos.contains_key(*r)) {
            return Err(fail(format!("output {existing} already exists")));
        }

        let spent: Vec<OutputRef> = intent.inputs.iter().map(|i| i.utxo.out_ref).collect();
        for out_ref in &spent {
            state.utxos.remove(out_ref);
        }
        for (out_ref, output) in created.iter().zip(&intent.outputs) {
            state.utxos.insert(
                *out_ref,
                UnspentOutput {
                    out_ref: *out_ref,
                    address: output.address.clone(),
                    value: output.value.clone(),
                    datum: output.datum.map(|d| d.encode()),
                },
            );
        }

        let entry = LedgerEntry {
            tx_hash: tx.tx_hash,
            mint: intent.mint.clone(),
            spent,
            created,
        };
        state.history.push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl LedgerClient for Emulator {
    async fn utxos_at_with_unit(
        &self,
        address: &str,
        unit: &Unit,
    ) -> Result<Vec<UnspentOutput>, BadgeError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let found: Vec<UnspentOutput> = self
            .utxos_at(address)
            .into_iter()
            .filter(|u| u.value.quantity_of(unit) > 0)
            .collect();
        tracing::debug!(address, %unit, found = found.len(), "emulator lookup");
        Ok(found)
    }

    async fn sign_with_held_key(
        &self,
        intent: &TransactionIntent,
    ) -> Result<SignedTransaction, BadgeError> {
        self.signatures.fetch_add(1, Ordering::Relaxed);
        Ok(sign_intent(intent, &self.key))
    }

    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, BadgeError> {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        verify_signed(&tx).map_err(|e| BadgeError::ledger("submit", e.to_string()))?;
        let entry = self.apply(&tx)?;
        tracing::info!(
            tx_hash = %entry.tx_hash,
            spent = entry.spent.len(),
            created = entry.created.len(),
            "emulator applied transaction"
        );
        Ok(entry.tx_hash)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::script_address;
    use crate::blueprint::{PlutusScript, ScriptKind};
    use crate::codec::KeyHash;
    use crate::error::ErrorKind;
    use crate::plutus::{BadgeDatum, HolderRedeemer, MintRedeemer};
    use crate::transaction::builder::IntentBuilder;
    use crate::transaction::types::OutputValue;

    fn script(byte: u8) -> PlutusScript {
        PlutusScript {
            kind: ScriptKind::PlutusV3,
            bytes: vec![byte; 12],
        }
    }

    struct Fixture {
        ledger: Emulator,
        owner: KeyHash,
        holder_address: String,
    }

    fn fixture() -> Fixture {
        let key = CustodialKey::generate();
        let owner = key.key_hash();
        let holder_address = script_address(&script(2).hash(), Network::Testnet).unwrap();
        Fixture {
            ledger: Emulator::new(Network::Testnet, key),
            owner,
            holder_address,
        }
    }

    fn init_intent(f: &Fixture, level: u8) -> TransactionIntent {
        let policy_id = script(1).hash();
        let unit = Unit::badge(policy_id, &f.owner, level.into()).unwrap();
        IntentBuilder::new()
            .attach_script(script(1))
            .add_signer(f.owner)
            .mint(unit, 1)
            .mint_redeemer(MintRedeemer::Init { owner: f.owner, level })
            .pay_to_script(
                &f.holder_address,
                OutputValue::lovelace(2_000_000).with_asset(unit, 1),
                BadgeDatum::new(f.owner, level, policy_id),
            )
            .build()
            .unwrap()
    }

    fn retire_intent(f: &Fixture, locked: UnspentOutput, level: u8) -> TransactionIntent {
        let unit = Unit::badge(script(1).hash(), &f.owner, level.into()).unwrap();
        IntentBuilder::new()
            .attach_script(script(1))
            .attach_script(script(2))
            .add_signer(f.owner)
            .collect_from(locked, HolderRedeemer::Retire)
            .mint(unit, -1)
            .mint_redeemer(MintRedeemer::Retire { owner: f.owner, level })
            .build()
            .unwrap()
    }

    async fn submit(f: &Fixture, intent: &TransactionIntent) -> Result<TxHash, BadgeError> {
        let signed = f.ledger.sign_with_held_key(intent).await?;
        f.ledger.submit(signed).await
    }

    #[tokio::test]
    async fn init_then_retire_moves_badge() {
        let f = fixture();
        let unit = Unit::badge(script(1).hash(), &f.owner, 0).unwrap();

        let hash = submit(&f, &init_intent(&f, 0)).await.unwrap();
        assert_eq!(f.ledger.holdings(&f.holder_address, &unit), 1);
        let locked = f.ledger.utxos_at_with_unit(&f.holder_address, &unit).await.unwrap();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].out_ref, OutputRef::new(hash, 0));
        let datum = BadgeDatum::decode(locked[0].datum.as_deref().unwrap()).unwrap();
        assert_eq!(datum.level, 0);

        submit(&f, &retire_intent(&f, locked[0].clone(), 0)).await.unwrap();
        assert_eq!(f.ledger.holdings(&f.holder_address, &unit), 0);
        assert_eq!(f.ledger.history().len(), 2);
        assert_eq!(
            f.ledger.call_counts(),
            CallCounts { lookups: 1, signatures: 2, submissions: 2 }
        );
    }

    #[tokio::test]
    async fn double_spend_rejected() {
        let f = fixture();
        let unit = Unit::badge(script(1).hash(), &f.owner, 0).unwrap();
        submit(&f, &init_intent(&f, 0)).await.unwrap();
        let locked = f.ledger.utxos_at_with_unit(&f.holder_address, &unit).await.unwrap();

        let retire = retire_intent(&f, locked[0].clone(), 0);
        submit(&f, &retire).await.unwrap();
        let err = submit(&f, &retire).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Submission);
        assert!(err.to_string().contains("unknown or spent"));
    }

    #[tokio::test]
    async fn unbalanced_tokens_rejected() {
        let f = fixture();
        let unit = Unit::badge(script(1).hash(), &f.owner, 0).unwrap();
        let mut intent = init_intent(&f, 0);
        intent.outputs[0].value = OutputValue::lovelace(2_000_000).with_asset(unit, 2);
        let err = submit(&f, &intent).await.unwrap_err();
        assert!(err.to_string().contains("not conserved"));
        assert!(f.ledger.history().is_empty());
    }

    #[tokio::test]
    async fn foreign_key_cannot_satisfy_required_signer() {
        let f = fixture();
        let intent = init_intent(&f, 0);
        let other = CustodialKey::generate();
        let err = f.ledger.submit(sign_intent(&intent, &other)).await.unwrap_err();
        assert!(err.to_string().contains("did not sign"));
    }

    #[tokio::test]
    async fn injected_rejection_surfaces_reason() {
        let f = fixture();
        f.ledger.reject_submissions(Some("node unavailable".into()));
        let err = submit(&f, &init_intent(&f, 0)).await.unwrap_err();
        assert_eq!(err.to_string(), "ledger submit failed: node unavailable");

        f.ledger.reject_submissions(None);
        assert!(submit(&f, &init_intent(&f, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn replayed_outputs_rejected() {
        let f = fixture();
        submit(&f, &init_intent(&f, 0)).await.unwrap();
        let err = submit(&f, &init_intent(&f, 0)).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
