//! Ledger-side verification of signed badge transactions.
//!
//! [`verify_signed`] runs the phase-1 style checks a node applies before
//! looking at any UTXO state: the body matches the intent, the id matches
//! the body, every required
//! signer has a valid witness, and the scripts, redeemers and mint map are
//! mutually consistent. Checks are ordered cheapest first.

use thiserror::Error;

use super::builder::TransactionIntent;
use crate::address::script_hash_of;
use crate::blueprint::PlutusScript;
use crate::crypto::hash::blake2b_224;
use crate::crypto::keys::verify_signature;
use crate::ledger::SignedTransaction;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reasons a signed transaction is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// The carried body bytes are not the canonical encoding of the intent.
    #[error("transaction body does not encode the intent")]
    BodyMismatch,

    /// The id does not match `blake2b_256` of the body.
    #[error("transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },

    /// The transaction carries no witnesses at all.
    #[error("transaction is unsigned")]
    MissingSignature,

    /// A witness signature does not verify over the id.
    #[error("invalid witness signature from key {key_hash}")]
    InvalidSignature { key_hash: String },

    /// A required signer has no witness.
    #[error("required signer {key_hash} did not sign")]
    MissingRequiredSigner { key_hash: String },

    /// A policy with a non-zero mint entry has no attached script.
    #[error("minting policy {policy_id} has no attached script")]
    MissingPolicyScript { policy_id: String },

    /// Assets are minted or burned without a mint redeemer.
    #[error("mint without a mint redeemer")]
    MissingMintRedeemer,

    /// The mint map differs from what the redeemer authorizes.
    #[error("mint map does not match the {action} redeemer")]
    MintRedeemerMismatch { action: String },

    /// A script-locked input has no validator attached.
    #[error("input {out_ref} is locked by a script that is not attached")]
    UncoveredScriptInput { out_ref: String },
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies a signed transaction before it touches ledger state.
///
/// # Errors
///
/// Returns the first failing check as a [`VerificationError`].
pub fn verify_signed(tx: &SignedTransaction) -> Result<(), VerificationError> {
    let intent = &tx.intent;

    if tx.body != intent.body_bytes() {
        return Err(VerificationError::BodyMismatch);
    }

    let expected = intent.tx_hash();
    if expected != tx.tx_hash {
        return Err(VerificationError::IdMismatch {
            expected: expected.to_hex(),
            actual: tx.tx_hash.to_hex(),
        });
    }

    if tx.witnesses.is_empty() {
        return Err(VerificationError::MissingSignature);
    }

    let mut witnessed = Vec::with_capacity(tx.witnesses.len());
    for w in &tx.witnesses {
        let key_hash = blake2b_224(&w.vkey);
        if !verify_signature(&w.vkey, tx.tx_hash.as_bytes(), &w.signature) {
            return Err(VerificationError::InvalidSignature {
                key_hash: hex::encode(key_hash),
            });
        }
        witnessed.push(key_hash);
    }
    for signer in &intent.required_signers {
        if !witnessed.contains(signer.as_bytes()) {
            return Err(VerificationError::MissingRequiredSigner {
                key_hash: signer.to_hex(),
            });
        }
    }

    check_scripts(intent)
}

fn check_scripts(intent: &TransactionIntent) -> Result<(), VerificationError> {
    let attached: Vec<_> = intent.scripts.iter().map(PlutusScript::hash).collect();

    if !intent.mint.is_empty() {
        for unit in intent.mint.keys() {
            if !attached.contains(&unit.policy_id) {
                return Err(VerificationError::MissingPolicyScript {
                    policy_id: unit.policy_id.to_hex(),
                });
            }
        }
        let redeemer = intent
            .mint_redeemer
            .ok_or(VerificationError::MissingMintRedeemer)?;
        let mismatch = || VerificationError::MintRedeemerMismatch {
            action: redeemer.action().to_string(),
        };
        for policy_id in intent.mint.keys().map(|u| u.policy_id) {
            let expected = redeemer.expected_mint(policy_id).map_err(|_| mismatch())?;
            if expected != intent.mint {
                return Err(mismatch());
            }
        }
    }

    for input in &intent.inputs {
        let covered = script_hash_of(&input.utxo.address)
            .map(|h| attached.contains(&h))
            .unwrap_or(false);
        if !covered {
            return Err(VerificationError::UncoveredScriptInput {
                out_ref: input.utxo.out_ref.to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::ScriptKind;
    use crate::codec::Unit;
    use crate::crypto::keys::CustodialKey;
    use crate::plutus::MintRedeemer;
    use crate::transaction::builder::IntentBuilder;
    use crate::transaction::signing::sign_intent;
    use crate::transaction::types::TxHash;

    fn policy() -> PlutusScript {
        PlutusScript {
            kind: ScriptKind::PlutusV3,
            bytes: vec![0x42; 16],
        }
    }

    fn valid_signed() -> (SignedTransaction, CustodialKey) {
        let key = CustodialKey::generate();
        let owner = key.key_hash();
        let unit = Unit::badge(policy().hash(), &owner, 0).unwrap();
        let intent = IntentBuilder::new()
            .attach_script(policy())
            .add_signer(owner)
            .mint(unit, 1)
            .mint_redeemer(MintRedeemer::Init { owner, level: 0 })
            .build()
            .unwrap();
        (sign_intent(&intent, &key), key)
    }

    #[test]
    fn valid_transaction_passes() {
        let (tx, _) = valid_signed();
        assert_eq!(verify_signed(&tx), Ok(()));
    }

    #[test]
    fn rejects_tampered_id() {
        let (mut tx, _) = valid_signed();
        tx.tx_hash = TxHash::new([0; 32]);
        assert!(matches!(verify_signed(&tx), Err(VerificationError::IdMismatch { .. })));
    }

    #[test]
    fn rejects_body_that_disagrees_with_intent() {
        let (mut tx, _) = valid_signed();
        tx.body.push(0x00);
        assert_eq!(verify_signed(&tx), Err(VerificationError::BodyMismatch));

        let (mut tx, _) = valid_signed();
        tx.body = IntentBuilder::new().build().unwrap().body_bytes();
        assert_eq!(verify_signed(&tx), Err(VerificationError::BodyMismatch));
    }

    #[test]
    fn rejects_unsigned() {
        let (mut tx, _) = valid_signed();
        tx.witnesses.clear();
        assert_eq!(verify_signed(&tx), Err(VerificationError::MissingSignature));
    }

    #[test]
    fn rejects_wrong_key() {
        let (tx, _) = valid_signed();
        let other = CustodialKey::generate();
        let resigned = sign_intent(&tx.intent, &other);
        assert!(matches!(
            verify_signed(&resigned),
            Err(VerificationError::MissingRequiredSigner { .. })
        ));
    }

    #[test]
    fn rejects_forged_signature() {
        let (mut tx, _) = valid_signed();
        tx.witnesses[0].signature[0] ^= 0xFF;
        assert!(matches!(
            verify_signed(&tx),
            Err(VerificationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn rejects_tampered_mint() {
        let (mut tx, key) = valid_signed();
        let extra = Unit::badge(policy().hash(), &key.key_hash(), 1).unwrap();
        tx.intent.mint.insert(extra, 1);
        let resigned = sign_intent(&tx.intent, &key);
        assert!(matches!(
            verify_signed(&resigned),
            Err(VerificationError::MintRedeemerMismatch { .. })
        ));
    }

    #[test]
    fn rejects_detached_policy() {
        let (mut tx, key) = valid_signed();
        tx.intent.scripts.clear();
        let resigned = sign_intent(&tx.intent, &key);
        assert!(matches!(
            verify_signed(&resigned),
            Err(VerificationError::MissingPolicyScript { .. })
        ));
    }
}
