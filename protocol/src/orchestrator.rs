//! # Action Orchestrator
//!
//! The single public entry point, [`mint_badge`]. It validates the request,
//! pins the owner to the custodial key, resolves the shared resources held
//! by a [`BadgeContext`] and dispatches to the assembler.
//!
//! Validation that needs no I/O (action name, level range, Upgrade's prior
//! level) runs before the contract bundle or the ledger are touched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::blueprint::{BadgeScripts, BlueprintHandle};
use crate::codec::{derive_owner_key_hash, level_byte, KeyHash, PolicyId, Unit};
use crate::config::BadgeConfig;
use crate::error::BadgeError;
use crate::ledger::{LedgerClient, LedgerConnector};
use crate::transaction::assembler::{BadgeAssembler, MintOutcome};
use crate::transaction::types::{BadgeAction, TxHash};

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A mint request as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRequest {
    /// Owner key hash the caller believes it is acting for. Advisory only.
    #[serde(default)]
    pub owner_hint: Option<String>,
    pub level: i64,
    /// `Init` when absent.
    #[serde(default)]
    pub action: Option<String>,
}

impl BadgeRequest {
    pub fn new(action: BadgeAction, level: i64) -> Self {
        Self {
            owner_hint: None,
            level,
            action: Some(action.to_string()),
        }
    }
}

/// Result of a successful [`mint_badge`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub success: bool,
    pub action: BadgeAction,
    pub level: u8,
    pub owner_key_hash: KeyHash,
    pub policy_id: PolicyId,
    /// Asset name of the minted (Init, Upgrade) or burned (Retire) badge.
    pub asset_name_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_unit: Option<Unit>,
    /// Unit hex to signed quantity.
    pub mint: BTreeMap<String, i64>,
    pub holder_address: String,
    pub transaction_hash: TxHash,
    pub message: String,
}

impl From<MintOutcome> for MintResponse {
    fn from(outcome: MintOutcome) -> Self {
        let (unit, from_unit, to_unit, message) = match (outcome.action, outcome.from_unit) {
            (BadgeAction::Upgrade, Some(from)) => (
                None,
                Some(from),
                Some(outcome.unit),
                format!(
                    "Badge upgraded from level {} to level {}",
                    from.asset_name.level(),
                    outcome.level
                ),
            ),
            (BadgeAction::Retire, _) => (
                Some(outcome.unit),
                None,
                None,
                format!("Badge level {} retired", outcome.level),
            ),
            _ => (
                Some(outcome.unit),
                None,
                None,
                format!("Badge level {} minted", outcome.level),
            ),
        };

        Self {
            success: true,
            action: outcome.action,
            level: outcome.level,
            owner_key_hash: outcome.owner,
            policy_id: outcome.policy_id,
            asset_name_hex: outcome.unit.asset_name.to_hex(),
            unit,
            from_unit,
            to_unit,
            mint: outcome
                .mint
                .iter()
                .map(|(u, q)| (u.to_hex(), *q))
                .collect(),
            holder_address: outcome.holder_address,
            transaction_hash: outcome.tx_hash,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// BadgeContext
// ---------------------------------------------------------------------------

/// Process-wide state shared by every request.
///
/// The contract bundle and the ledger client are each initialized at most
/// once, on first use; concurrent first callers share the same in-flight
/// initialization.
pub struct BadgeContext {
    config: BadgeConfig,
    owner: KeyHash,
    blueprint: BlueprintHandle,
    connector: Box<dyn LedgerConnector>,
    ledger: OnceCell<Arc<dyn LedgerClient>>,
}

impl BadgeContext {
    /// Checks the signing key eagerly; nothing else is loaded yet.
    pub fn new(
        config: BadgeConfig,
        connector: impl LedgerConnector + 'static,
    ) -> Result<Self, BadgeError> {
        let key = config.custodial_key()?;
        let owner = derive_owner_key_hash(&key);
        let blueprint = BlueprintHandle::new(
            config.blueprint_path.clone(),
            config.policy_title.clone(),
            config.holder_title.clone(),
        );
        tracing::debug!(owner = %owner, network = %config.network, "badge context created");
        Ok(Self {
            config,
            owner,
            blueprint,
            connector: Box::new(connector),
            ledger: OnceCell::new(),
        })
    }

    /// Uses already-resolved scripts instead of reading the bundle.
    pub fn with_scripts(mut self, scripts: BadgeScripts) -> Self {
        self.blueprint = BlueprintHandle::preloaded(scripts);
        self
    }

    pub fn config(&self) -> &BadgeConfig {
        &self.config
    }

    /// Owner identity derived from the custodial key.
    pub fn owner_key_hash(&self) -> KeyHash {
        self.owner
    }

    pub async fn scripts(&self) -> Result<Arc<BadgeScripts>, BadgeError> {
        self.blueprint.scripts().await
    }

    pub async fn ledger(&self) -> Result<Arc<dyn LedgerClient>, BadgeError> {
        self.ledger
            .get_or_try_init(|| self.connector.connect())
            .await
            .map(Arc::clone)
    }

    pub fn blueprint_loaded(&self) -> bool {
        self.blueprint.is_loaded()
    }

    pub fn ledger_connected(&self) -> bool {
        self.ledger.initialized()
    }
}

// ---------------------------------------------------------------------------
// mint_badge
// ---------------------------------------------------------------------------

/// Runs one Init, Upgrade or Retire for the custodial owner.
pub async fn mint_badge(
    ctx: &BadgeContext,
    request: BadgeRequest,
) -> Result<MintResponse, BadgeError> {
    let action = match request.action.as_deref() {
        Some(raw) => raw.parse::<BadgeAction>()?,
        None => BadgeAction::default(),
    };

    let level = level_byte(request.level)?;
    if level > ctx.config.max_level {
        return Err(BadgeError::LevelOutOfRange {
            level: request.level,
            max: i64::from(ctx.config.max_level),
        });
    }

    let owner = ctx.owner;
    if let Some(hint) = request.owner_hint.as_deref() {
        check_owner_hint(hint, &owner);
    }

    if action == BadgeAction::Upgrade && level == 0 {
        return Err(BadgeError::UpgradeRequiresPriorLevel(request.level));
    }

    let scripts = ctx.scripts().await?;
    let ledger = ctx.ledger().await?;
    let assembler = BadgeAssembler::new(
        ledger.as_ref(),
        scripts.as_ref(),
        owner,
        ctx.config.network,
        ctx.config.locked_lovelace,
    )?;

    let outcome = assembler.execute(action, level).await?;
    Ok(MintResponse::from(outcome))
}

/// How a client-supplied owner hint compares with the custodial owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnerHint {
    Matches,
    Differs,
    Malformed,
}

/// Classifies `hint` and warns unless it names the custodial owner.
fn check_owner_hint(hint: &str, owner: &KeyHash) -> OwnerHint {
    match KeyHash::from_hex(hint, "owner hint") {
        Ok(parsed) if parsed == *owner => OwnerHint::Matches,
        Ok(parsed) => {
            tracing::warn!(
                hint = %parsed,
                owner = %owner,
                "owner hint differs from custodial key; using custodial owner"
            );
            OwnerHint::Differs
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                owner = %owner,
                "owner hint is malformed; using custodial owner"
            );
            OwnerHint::Malformed
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
