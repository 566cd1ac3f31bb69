//! Badge transaction assembly: Init, Upgrade and Retire.
//!
//! ```text
//! Init     mint +1 unit(L)                       lock unit(L) at holder
//! Upgrade  spend unit(L-1)  burn -1, mint +1     lock unit(L) at holder
//! Retire   spend unit(L)    burn -1              nothing locked
//! ```
//!
//! The `build_*` functions are pure and return a checked
//! [`TransactionIntent`]. [`BadgeAssembler::execute`] adds the ledger side:
//! locate the locked badge when the action spends one, sign with the held
//! key, submit. Every failure on that path comes back wrapped as
//! [`BadgeError::MintFailed`] for the action.

use std::collections::BTreeMap;

use crate::address::{script_address, Network};
use crate::blueprint::BadgeScripts;
use crate::codec::{KeyHash, PolicyId, Unit};
use crate::error::BadgeError;
use crate::ledger::{LedgerClient, UnspentOutput};
use crate::locator::find_locked_badge;
use crate::plutus::{BadgeDatum, HolderRedeemer, MintRedeemer, RedeemerArgs};
use crate::transaction::builder::{IntentBuilder, TransactionIntent};
use crate::transaction::types::{BadgeAction, OutputValue, TxHash};

/// Result of a submitted badge transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    pub action: BadgeAction,
    pub level: u8,
    pub owner: KeyHash,
    pub policy_id: PolicyId,
    /// The unit minted (Init, Upgrade) or burned (Retire).
    pub unit: Unit,
    /// The unit burned by an Upgrade.
    pub from_unit: Option<Unit>,
    pub mint: BTreeMap<Unit, i64>,
    pub holder_address: String,
    pub tx_hash: TxHash,
}

/// Builds and submits badge transactions for one owner.
pub struct BadgeAssembler<'a> {
    ledger: &'a dyn LedgerClient,
    scripts: &'a BadgeScripts,
    owner: KeyHash,
    holder_address: String,
    locked_lovelace: u64,
}

impl<'a> BadgeAssembler<'a> {
    pub fn new(
        ledger: &'a dyn LedgerClient,
        scripts: &'a BadgeScripts,
        owner: KeyHash,
        network: Network,
        locked_lovelace: u64,
    ) -> Result<Self, BadgeError> {
        let holder_address = script_address(&scripts.holder_hash(), network)?;
        Ok(Self {
            ledger,
            scripts,
            owner,
            holder_address,
            locked_lovelace,
        })
    }

    /// Script address where live badges are locked.
    pub fn holder_address(&self) -> &str {
        &self.holder_address
    }

    /// This owner's badge unit at `level`.
    pub fn unit(&self, level: u8) -> Result<Unit, BadgeError> {
        Unit::badge(self.scripts.policy_id(), &self.owner, level.into())
    }

    fn locked_value(&self, unit: Unit) -> OutputValue {
        OutputValue::lovelace(self.locked_lovelace).with_asset(unit, 1)
    }

    fn datum(&self, level: u8) -> BadgeDatum {
        BadgeDatum::new(self.owner, level, self.scripts.policy_id())
    }

    // -----------------------------------------------------------------------
    // Pure construction
    // -----------------------------------------------------------------------

    pub fn build_init(&self, level: u8) -> Result<TransactionIntent, BadgeError> {
        let unit = self.unit(level)?;
        let redeemer = MintRedeemer::for_action(
            BadgeAction::Init,
            self.owner,
            RedeemerArgs {
                level: Some(level),
                ..Default::default()
            },
        )?;
        tracing::debug!(level, %unit, "building init");

        IntentBuilder::new()
            .attach_script(self.scripts.policy.clone())
            .add_signer(self.owner)
            .mint(unit, 1)
            .mint_redeemer(redeemer)
            .pay_to_script(&self.holder_address, self.locked_value(unit), self.datum(level))
            .build()
    }

    /// Spends `locked` (holding `unit(level - 1)`) and locks `unit(level)`.
    pub fn build_upgrade(
        &self,
        locked: UnspentOutput,
        level: u8,
    ) -> Result<TransactionIntent, BadgeError> {
        let from_level = prior_level(level)?;
        let from_unit = self.unit(from_level)?;
        let to_unit = self.unit(level)?;
        let redeemer = MintRedeemer::for_action(
            BadgeAction::Upgrade,
            self.owner,
            RedeemerArgs {
                from_level: Some(from_level),
                to_level: Some(level),
                ..Default::default()
            },
        )?;
        let spend = HolderRedeemer::for_action(BadgeAction::Upgrade, Some(level))?;
        tracing::debug!(from_level, to_level = level, input = %locked.out_ref, "building upgrade");

        IntentBuilder::new()
            .attach_script(self.scripts.policy.clone())
            .attach_script(self.scripts.holder.clone())
            .add_signer(self.owner)
            .collect_from(locked, spend)
            .mint(from_unit, -1)
            .mint(to_unit, 1)
            .mint_redeemer(redeemer)
            .pay_to_script(&self.holder_address, self.locked_value(to_unit), self.datum(level))
            .build()
    }

    /// Spends `locked` (holding `unit(level)`) and burns the badge.
    pub fn build_retire(
        &self,
        locked: UnspentOutput,
        level: u8,
    ) -> Result<TransactionIntent, BadgeError> {
        let unit = self.unit(level)?;
        let redeemer = MintRedeemer::for_action(
            BadgeAction::Retire,
            self.owner,
            RedeemerArgs {
                level: Some(level),
                ..Default::default()
            },
        )?;
        let spend = HolderRedeemer::for_action(BadgeAction::Retire, None)?;
        tracing::debug!(level, input = %locked.out_ref, "building retire");

        IntentBuilder::new()
            .attach_script(self.scripts.policy.clone())
            .attach_script(self.scripts.holder.clone())
            .add_signer(self.owner)
            .collect_from(locked, spend)
            .mint(unit, -1)
            .mint_redeemer(redeemer)
            .build()
    }

    // -----------------------------------------------------------------------
    // Ledger round trip
    // -----------------------------------------------------------------------

    /// Runs `action` at `level` end to end.
    pub async fn execute(&self, action: BadgeAction, level: u8) -> Result<MintOutcome, BadgeError> {
        self.run(action, level).await.map_err(|e| e.during(action))
    }

    async fn run(&self, action: BadgeAction, level: u8) -> Result<MintOutcome, BadgeError> {
        let (intent, unit, from_unit) = match action {
            BadgeAction::Init => (self.build_init(level)?, self.unit(level)?, None),
            BadgeAction::Upgrade => {
                let from_unit = self.unit(prior_level(level)?)?;
                let locked = find_locked_badge(self.ledger, &self.holder_address, &from_unit).await?;
                (self.build_upgrade(locked, level)?, self.unit(level)?, Some(from_unit))
            }
            BadgeAction::Retire => {
                let unit = self.unit(level)?;
                let locked = find_locked_badge(self.ledger, &self.holder_address, &unit).await?;
                (self.build_retire(locked, level)?, unit, None)
            }
        };

        let signed = self.ledger.sign_with_held_key(&intent).await?;
        let tx_hash = self.ledger.submit(signed).await?;
        tracing::info!(%action, level, %tx_hash, "badge transaction submitted");

        Ok(MintOutcome {
            action,
            level,
            owner: self.owner,
            policy_id: self.scripts.policy_id(),
            unit,
            from_unit,
            mint: intent.mint,
            holder_address: self.holder_address.clone(),
            tx_hash,
        })
    }
}

fn prior_level(level: u8) -> Result<u8, BadgeError> {
    level
        .checked_sub(1)
        .ok_or(BadgeError::UpgradeRequiresPriorLevel(i64::from(level)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
