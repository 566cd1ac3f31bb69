//! Intent signing with the custodial Ed25519 key.
//!
//! Signing is a separate step from building because the key lives with the
//! ledger client, not with the code that assembles intents. The signed
//! message is the transaction id, `blake2b_256` of
//! [`TransactionIntent::body_bytes`].

use super::builder::TransactionIntent;
use crate::crypto::keys::CustodialKey;
use crate::ledger::{SignedTransaction, VKeyWitness};

/// Witnesses `intent` with `key`.
///
/// The procedure:
/// 1. Compute the canonical body bytes.
/// 2. Hash them into the transaction id.
/// 3. Sign the id and attach a single verification-key witness.
///
/// Whether `key` covers the intent's required signers is checked by the
/// ledger at submission, not here.
pub fn sign_intent(intent: &TransactionIntent, key: &CustodialKey) -> SignedTransaction {
    let body = intent.body_bytes();
    let tx_hash = intent.tx_hash();
    let signature = key.sign(tx_hash.as_bytes());
    SignedTransaction {
        intent: intent.clone(),
        body,
        tx_hash,
        witnesses: vec![VKeyWitness {
            vkey: key.public_key_bytes(),
            signature,
        }],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::verify_signature;
    use crate::transaction::builder::IntentBuilder;

    fn intent(key: &CustodialKey) -> TransactionIntent {
        IntentBuilder::new().add_signer(key.key_hash()).build().unwrap()
    }

    #[test]
    fn witness_verifies_against_tx_hash() {
        let key = CustodialKey::generate();
        let signed = sign_intent(&intent(&key), &key);
        assert_eq!(signed.witnesses.len(), 1);
        let w = &signed.witnesses[0];
        assert_eq!(w.vkey, key.public_key_bytes());
        assert!(verify_signature(&w.vkey, signed.tx_hash.as_bytes(), &w.signature));
    }

    #[test]
    fn signing_does_not_change_id() {
        let key = CustodialKey::generate();
        let intent = intent(&key);
        let signed = sign_intent(&intent, &key);
        assert_eq!(signed.tx_hash, intent.tx_hash());
        assert_eq!(signed.body, intent.body_bytes());
    }

    #[test]
    fn signing_is_deterministic() {
        let key = CustodialKey::from_seed(&[7u8; 32]);
        let intent = intent(&key);
        let a = sign_intent(&intent, &key);
        let b = sign_intent(&intent, &key);
        assert_eq!(a.witnesses, b.witnesses);
    }
}
