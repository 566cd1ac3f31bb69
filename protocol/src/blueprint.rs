//! # Script Resolver
//!
//! Loads the compiled contract bundle (a CIP-57 style `plutus.json`) and
//! pulls out the two validators the badge flow needs:
//!
//! - the **minting policy**, whose hash is the badge policy id;
//! - the **holder validator**, whose hash is the payment credential of the
//!   address where badges sit while they are live.
//!
//! The bundle is read once per process. [`BlueprintHandle`] guards that
//! load with a `tokio::sync::OnceCell`, so concurrent first callers await a
//! single in-flight read instead of racing to parse the file twice.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::codec::{validate_hex, PolicyId, ScriptHash};
use crate::config::{HASH28_LENGTH, PLUTUS_V3_HASH_TAG, PLUTUS_VERSION};
use crate::crypto::hash::blake2b_224_parts;
use crate::error::BadgeError;

// ---------------------------------------------------------------------------
// Bundle model
// ---------------------------------------------------------------------------

/// Top-level contract bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct Blueprint {
    pub preamble: Preamble,
    pub validators: Vec<ValidatorEntry>,
}

/// Bundle metadata. Only `plutus_version` is checked.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preamble {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: Option<String>,
    pub plutus_version: String,
}

/// One compiled validator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorEntry {
    pub title: String,
    pub compiled_code: String,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Script language of a resolved validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    PlutusV3,
}

/// A validator ready to be attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlutusScript {
    pub kind: ScriptKind,
    pub bytes: Vec<u8>,
}

impl PlutusScript {
    /// `blake2b_224(language_tag || script_bytes)`.
    pub fn hash(&self) -> ScriptHash {
        let tag = match self.kind {
            ScriptKind::PlutusV3 => PLUTUS_V3_HASH_TAG,
        };
        ScriptHash::new(blake2b_224_parts(&[&[tag], &self.bytes]))
    }
}

impl Blueprint {
    /// Parses a bundle and checks its language version.
    pub fn from_json(json: &str) -> Result<Self, BadgeError> {
        let blueprint: Blueprint = serde_json::from_str(json)
            .map_err(|e| BadgeError::BlueprintUnreadable(e.to_string()))?;
        if blueprint.preamble.plutus_version != PLUTUS_VERSION {
            return Err(BadgeError::UnsupportedPlutusVersion {
                expected: PLUTUS_VERSION.to_string(),
                found: blueprint.preamble.plutus_version,
            });
        }
        Ok(blueprint)
    }

    /// Reads and parses the bundle at `path`.
    pub async fn load(path: &Path) -> Result<Self, BadgeError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            BadgeError::BlueprintUnreadable(format!("{}: {}", path.display(), e))
        })?;
        let blueprint = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            title = %blueprint.preamble.title,
            validators = blueprint.validators.len(),
            "contract bundle loaded"
        );
        Ok(blueprint)
    }

    /// Looks up a validator by its exact title.
    ///
    /// When the entry declares a `hash`, it must match the hash computed
    /// from the compiled code.
    pub fn find_script(&self, title: &str) -> Result<PlutusScript, BadgeError> {
        let entry = self
            .validators
            .iter()
            .find(|v| v.title == title)
            .ok_or_else(|| BadgeError::ScriptNotFound(title.to_string()))?;

        let bytes = hex::decode(entry.compiled_code.trim()).map_err(|e| {
            BadgeError::BlueprintUnreadable(format!("compiledCode of {title}: {e}"))
        })?;
        let script = PlutusScript {
            kind: ScriptKind::PlutusV3,
            bytes,
        };

        if let Some(declared) = entry.hash.as_deref() {
            let declared = validate_hex(declared, HASH28_LENGTH, "validator hash")
                .map_err(|e| BadgeError::BlueprintUnreadable(e.to_string()))?;
            let computed = script.hash().to_hex();
            if declared != computed {
                return Err(BadgeError::ScriptHashMismatch {
                    title: title.to_string(),
                    declared,
                    computed,
                });
            }
        }
        Ok(script)
    }
}

// ---------------------------------------------------------------------------
// BadgeScripts
// ---------------------------------------------------------------------------

/// The two validators every badge transaction is built against.
#[derive(Debug, Clone)]
pub struct BadgeScripts {
    pub policy: PlutusScript,
    pub holder: PlutusScript,
    policy_id: PolicyId,
    holder_hash: ScriptHash,
}

impl BadgeScripts {
    /// Resolves the minting policy and holder validator by title.
    pub fn resolve(
        blueprint: &Blueprint,
        policy_title: &str,
        holder_title: &str,
    ) -> Result<Self, BadgeError> {
        let policy = blueprint.find_script(policy_title)?;
        let holder = blueprint.find_script(holder_title)?;
        let policy_id = policy.hash();
        let holder_hash = holder.hash();
        tracing::debug!(%policy_id, %holder_hash, "badge scripts resolved");
        Ok(Self {
            policy,
            holder,
            policy_id,
            holder_hash,
        })
    }

    pub fn policy_id(&self) -> PolicyId {
        self.policy_id
    }

    pub fn holder_hash(&self) -> ScriptHash {
        self.holder_hash
    }
}

// ---------------------------------------------------------------------------
// BlueprintHandle
// ---------------------------------------------------------------------------

/// Lazily-loaded, process-wide view of the badge scripts.
#[derive(Debug)]
pub struct BlueprintHandle {
    path: PathBuf,
    policy_title: String,
    holder_title: String,
    scripts: OnceCell<Arc<BadgeScripts>>,
}

impl BlueprintHandle {
    pub fn new(
        path: impl Into<PathBuf>,
        policy_title: impl Into<String>,
        holder_title: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            policy_title: policy_title.into(),
            holder_title: holder_title.into(),
            scripts: OnceCell::new(),
        }
    }

    /// A handle that is already initialized with `scripts`.
    pub fn preloaded(scripts: BadgeScripts) -> Self {
        Self {
            path: PathBuf::new(),
            policy_title: String::new(),
            holder_title: String::new(),
            scripts: OnceCell::new_with(Some(Arc::new(scripts))),
        }
    }

    /// Returns the scripts, loading the bundle on first use. A failed load
    /// leaves the handle empty so the next call retries.
    pub async fn scripts(&self) -> Result<Arc<BadgeScripts>, BadgeError> {
        self.scripts
            .get_or_try_init(|| async {
                let blueprint = Blueprint::load(&self.path).await?;
                let scripts =
                    BadgeScripts::resolve(&blueprint, &self.policy_title, &self.holder_title)?;
                Ok::<_, BadgeError>(Arc::new(scripts))
            })
            .await
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.scripts.initialized()
    }
}
