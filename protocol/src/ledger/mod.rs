//! # Ledger Seam
//!
//! The badge core never talks to a node directly. Everything it needs from
//! the outside world goes through [`LedgerClient`]:
//!
//! ```text
//! utxos_at_with_unit  — which outputs at an address hold a given asset
//! sign_with_held_key  — witness an intent with the process-held key
//! submit              — hand a signed transaction to the ledger
//! ```
//!
//! Implementations own transport concerns (timeouts, retries, rate limits).
//! The core propagates their failures unchanged as submission errors.
//!
//! [`LedgerConnector`] produces the client. The orchestrator calls it at
//! most once per process and shares the result.
//!
//! [`emulator::Emulator`] is an in-memory ledger used by the devnet node and
//! the test suite.

pub mod emulator;

use async_trait::async_trait;
use std::sync::Arc;

use crate::codec::Unit;
use crate::error::BadgeError;
use crate::transaction::builder::TransactionIntent;
use crate::transaction::types::{OutputRef, OutputValue, TxHash};

pub use emulator::Emulator;

/// An unspent output as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub out_ref: OutputRef,
    pub address: String,
    pub value: OutputValue,
    /// Inline datum CBOR, if the output carries one.
    pub datum: Option<Vec<u8>>,
}

/// Verification key and signature over the transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VKeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

/// A witnessed intent, ready for submission.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub intent: TransactionIntent,
    /// Canonical body bytes the id was computed from.
    pub body: Vec<u8>,
    pub tx_hash: TxHash,
    pub witnesses: Vec<VKeyWitness>,
}

/// Ledger operations the badge core depends on.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Outputs at `address` holding at least one `unit`.
    async fn utxos_at_with_unit(
        &self,
        address: &str,
        unit: &Unit,
    ) -> Result<Vec<UnspentOutput>, BadgeError>;

    /// Witnesses `intent` with the key the client holds.
    async fn sign_with_held_key(
        &self,
        intent: &TransactionIntent,
    ) -> Result<SignedTransaction, BadgeError>;

    /// Submits a signed transaction and returns its id.
    async fn submit(&self, tx: SignedTransaction) -> Result<TxHash, BadgeError>;
}

/// Produces a connected [`LedgerClient`].
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn LedgerClient>, BadgeError>;
}

/// An already-connected client is its own connector.
#[async_trait]
impl<L> LedgerConnector for Arc<L>
where
    L: LedgerClient + 'static,
{
    async fn connect(&self) -> Result<Arc<dyn LedgerClient>, BadgeError> {
        Ok(Arc::clone(self) as Arc<dyn LedgerClient>)
    }
}
