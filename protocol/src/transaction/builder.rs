//! Transaction intent construction via the builder pattern.
//!
//! The [`IntentBuilder`] collects scripts, signers, spent inputs, mint
//! quantities and outputs, then `.build()` checks that the pieces agree
//! with each other before handing back a [`TransactionIntent`]:
//!
//! - every minted policy and every spent script address has its script
//!   attached;
//! - the mint map equals exactly what the mint redeemer authorizes.
//!
//! The builder does not sign. That happens in [`super::signing`], keeping
//! construction testable without key material.

use std::collections::BTreeMap;

use crate::address::script_hash_of;
use crate::blueprint::PlutusScript;
use crate::codec::{KeyHash, Unit};
use crate::crypto::hash::blake2b_256;
use crate::error::BadgeError;
use crate::ledger::UnspentOutput;
use crate::plutus::{BadgeDatum, HolderRedeemer, MintRedeemer, PlutusData};
use crate::transaction::types::{OutputValue, TxHash};

// ---------------------------------------------------------------------------
// Intent parts
// ---------------------------------------------------------------------------

/// A locked output being spent, with the redeemer for its validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInput {
    pub utxo: UnspentOutput,
    pub redeemer: HolderRedeemer,
}

/// An output the transaction creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub address: String,
    pub value: OutputValue,
    pub datum: Option<BadgeDatum>,
}

// ---------------------------------------------------------------------------
// TransactionIntent
// ---------------------------------------------------------------------------

/// Everything a ledger client needs to balance, witness and submit one
/// badge transaction. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub scripts: Vec<PlutusScript>,
    pub required_signers: Vec<KeyHash>,
    pub inputs: Vec<ScriptInput>,
    pub mint: BTreeMap<Unit, i64>,
    pub mint_redeemer: Option<MintRedeemer>,
    pub outputs: Vec<TxOutput>,
}

impl TransactionIntent {
    /// Canonical byte representation used for the transaction id.
    ///
    /// A CBOR map keyed like a ledger transaction body (0 inputs, 1 outputs,
    /// 9 mint, 14 required signers) plus key 11 committing to the redeemers.
    /// Built through the Plutus data encoder, which is deterministic for a
    /// given value. Real clients re-serialize the intent in their own wire
    /// format; this encoding only has to be stable.
    pub fn body_bytes(&self) -> Vec<u8> {
        let inputs = self
            .inputs
            .iter()
            .map(|i| {
                PlutusData::List(vec![
                    PlutusData::bytes(i.utxo.out_ref.tx_hash.as_bytes()),
                    PlutusData::integer(i.utxo.out_ref.index),
                ])
            })
            .collect();

        let outputs = self
            .outputs
            .iter()
            .map(|o| {
                let assets = o
                    .value
                    .assets
                    .iter()
                    .map(|(unit, qty)| {
                        (PlutusData::bytes(unit.to_hex()), PlutusData::integer(*qty))
                    })
                    .collect();
                PlutusData::List(vec![
                    PlutusData::bytes(o.address.as_bytes()),
                    PlutusData::integer(o.value.lovelace),
                    PlutusData::Map(assets),
                    match &o.datum {
                        Some(d) => d.to_data(),
                        None => PlutusData::List(vec![]),
                    },
                ])
            })
            .collect();

        let mut by_policy: BTreeMap<_, Vec<(PlutusData, PlutusData)>> = BTreeMap::new();
        for (unit, qty) in &self.mint {
            by_policy.entry(unit.policy_id).or_default().push((
                PlutusData::bytes(unit.asset_name.as_bytes()),
                PlutusData::integer(*qty),
            ));
        }
        let mint = by_policy
            .into_iter()
            .map(|(policy, names)| (PlutusData::bytes(policy.as_bytes()), PlutusData::Map(names)))
            .collect();

        let mut redeemers: Vec<PlutusData> = self
            .inputs
            .iter()
            .map(|i| i.redeemer.to_data())
            .collect();
        if let Some(r) = &self.mint_redeemer {
            redeemers.push(r.to_data());
        }

        let signers = self
            .required_signers
            .iter()
            .map(|k| PlutusData::bytes(k.as_bytes()))
            .collect();

        PlutusData::Map(vec![
            (PlutusData::integer(0), PlutusData::List(inputs)),
            (PlutusData::integer(1), PlutusData::List(outputs)),
            (PlutusData::integer(9), PlutusData::Map(mint)),
            (PlutusData::integer(11), PlutusData::List(redeemers)),
            (PlutusData::integer(14), PlutusData::List(signers)),
        ])
        .encode()
    }

    /// `blake2b_256(body_bytes)`.
    pub fn tx_hash(&self) -> TxHash {
        TxHash::new(blake2b_256(&self.body_bytes()))
    }
}

// ---------------------------------------------------------------------------
// IntentBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`TransactionIntent`].
///
/// ```rust,no_run
/// # use badge_protocol::transaction::IntentBuilder;
/// # fn demo(policy: badge_protocol::blueprint::PlutusScript,
/// #         signer: badge_protocol::codec::KeyHash,
/// #         redeemer: badge_protocol::plutus::MintRedeemer,
/// #         unit: badge_protocol::codec::Unit) {
/// let intent = IntentBuilder::new()
///     .attach_script(policy)
///     .add_signer(signer)
///     .mint(unit, 1)
///     .mint_redeemer(redeemer)
///     .build();
/// # }
/// ```
#[derive(Debug, Default)]
pub struct IntentBuilder {
    scripts: Vec<PlutusScript>,
    required_signers: Vec<KeyHash>,
    inputs: Vec<ScriptInput>,
    mint: BTreeMap<Unit, i64>,
    mint_redeemer: Option<MintRedeemer>,
    outputs: Vec<TxOutput>,
}

impl IntentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a validator. Attaching the same script twice is a no-op.
    pub fn attach_script(mut self, script: PlutusScript) -> Self {
        if !self.scripts.contains(&script) {
            self.scripts.push(script);
        }
        self
    }

    /// Requires a signature from `key_hash`.
    pub fn add_signer(mut self, key_hash: KeyHash) -> Self {
        if !self.required_signers.contains(&key_hash) {
            self.required_signers.push(key_hash);
        }
        self
    }

    /// Spends a script-locked output with `redeemer`.
    pub fn collect_from(mut self, utxo: UnspentOutput, redeemer: HolderRedeemer) -> Self {
        self.inputs.push(ScriptInput { utxo, redeemer });
        self
    }

    /// Adds `quantity` (negative to burn) of `unit` to the mint map.
    pub fn mint(mut self, unit: Unit, quantity: i64) -> Self {
        *self.mint.entry(unit).or_insert(0) += quantity;
        self
    }

    pub fn mint_redeemer(mut self, redeemer: MintRedeemer) -> Self {
        self.mint_redeemer = Some(redeemer);
        self
    }

    /// Locks `value` at a script address with an inline badge datum.
    pub fn pay_to_script(mut self, address: &str, value: OutputValue, datum: BadgeDatum) -> Self {
        self.outputs.push(TxOutput {
            address: address.to_string(),
            value,
            datum: Some(datum),
        });
        self
    }

    /// Consumes the builder, checking scripts and mint quantities agree.
    pub fn build(self) -> Result<TransactionIntent, BadgeError> {
        let mint: BTreeMap<Unit, i64> = self.mint.into_iter().filter(|(_, q)| *q != 0).collect();
        let attached: Vec<_> = self.scripts.iter().map(PlutusScript::hash).collect();

        if !mint.is_empty() {
            let redeemer = self.mint_redeemer.ok_or_else(|| {
                BadgeError::InvalidPlutusData("mint map present without a mint redeemer".into())
            })?;
            for unit in mint.keys() {
                if !attached.contains(&unit.policy_id) {
                    return Err(BadgeError::ScriptNotFound(format!(
                        "minting policy {}",
                        unit.policy_id
                    )));
                }
            }
            let policy_id = mint.keys().next().map(|u| u.policy_id);
            if let Some(policy_id) = policy_id {
                let expected = redeemer.expected_mint(policy_id)?;
                if expected != mint {
                    return Err(BadgeError::MintMismatch {
                        action: redeemer.action(),
                        detail: format!("expected {}, found {}", describe(&expected), describe(&mint)),
                    });
                }
            }
        }

        for input in &self.inputs {
            let covered = script_hash_of(&input.utxo.address)
                .map(|h| attached.contains(&h))
                .unwrap_or(false);
            if !covered {
                return Err(BadgeError::ScriptNotFound(format!(
                    "validator for {}",
                    input.utxo.address
                )));
            }
        }

        Ok(TransactionIntent {
            scripts: self.scripts,
            required_signers: self.required_signers,
            inputs: self.inputs,
            mint,
            mint_redeemer: self.mint_redeemer,
            outputs: self.outputs,
        })
    }
}

fn describe(mint: &BTreeMap<Unit, i64>) -> String {
    let parts: Vec<String> = mint
        .iter()
        .map(|(u, q)| format!("{}:{}", u.asset_name, q))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
