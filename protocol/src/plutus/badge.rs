//! Badge datum and redeemers.
//!
//! ```text
//! BadgeDatum      = Constr 0 [owner: bytes, level: int, policy_id: bytes]
//!
//! MintRedeemer    = Constr 0 [owner, level]                  -- Init
//!                 | Constr 1 [owner, from_level, to_level]   -- Upgrade
//!                 | Constr 2 [owner, level]                  -- Retire
//!
//! HolderRedeemer  = Constr 0 [new_level]                     -- Upgrade
//!                 | Constr 1 []                              -- Retire
//! ```
//!
//! Encoders are pure: the same value always yields the same bytes.

use std::collections::BTreeMap;

use super::data::PlutusData;
use crate::codec::{KeyHash, PolicyId, ScriptHash, Unit};
use crate::config::HASH28_LENGTH;
use crate::error::BadgeError;
use crate::transaction::types::BadgeAction;

fn hash28(data: &PlutusData, what: &str) -> Result<[u8; HASH28_LENGTH], BadgeError> {
    data.as_bytes()?.try_into().map_err(|_| {
        BadgeError::InvalidPlutusData(format!("{what} must be {HASH28_LENGTH} bytes"))
    })
}

fn level(data: &PlutusData, what: &str) -> Result<u8, BadgeError> {
    let n = data.as_integer()?;
    u8::try_from(n).map_err(|_| BadgeError::InvalidPlutusData(format!("{what} {n} is not a level")))
}

fn arity<'a>(fields: &'a [PlutusData], n: usize, what: &str) -> Result<&'a [PlutusData], BadgeError> {
    if fields.len() != n {
        return Err(BadgeError::InvalidPlutusData(format!(
            "{what} expects {n} fields, found {}",
            fields.len()
        )));
    }
    Ok(fields)
}

// ---------------------------------------------------------------------------
// BadgeDatum
// ---------------------------------------------------------------------------

/// Inline datum stored with every locked badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDatum {
    pub owner: KeyHash,
    pub level: u8,
    pub policy_id: PolicyId,
}

impl BadgeDatum {
    pub fn new(owner: KeyHash, level: u8, policy_id: PolicyId) -> Self {
        Self {
            owner,
            level,
            policy_id,
        }
    }

    pub fn to_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::bytes(self.owner.as_bytes()),
                PlutusData::integer(self.level),
                PlutusData::bytes(self.policy_id.as_bytes()),
            ],
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_data().encode()
    }

    pub fn from_data(data: &PlutusData) -> Result<Self, BadgeError> {
        let fields = arity(data.as_constr(0)?, 3, "BadgeDatum")?;
        Ok(Self {
            owner: KeyHash::new(hash28(&fields[0], "owner")?),
            level: level(&fields[1], "level")?,
            policy_id: ScriptHash::new(hash28(&fields[2], "policy_id")?),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BadgeError> {
        Self::from_data(&PlutusData::decode(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// MintRedeemer
// ---------------------------------------------------------------------------

/// Optional arguments from which a [`MintRedeemer`] is assembled.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedeemerArgs {
    pub level: Option<u8>,
    pub from_level: Option<u8>,
    pub to_level: Option<u8>,
}

/// Authorization handed to the minting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintRedeemer {
    Init {
        owner: KeyHash,
        level: u8,
    },
    Upgrade {
        owner: KeyHash,
        from_level: u8,
        to_level: u8,
    },
    Retire {
        owner: KeyHash,
        level: u8,
    },
}

impl MintRedeemer {
    /// Builds the redeemer for `action`, failing if a field it needs is absent.
    pub fn for_action(
        action: BadgeAction,
        owner: KeyHash,
        args: RedeemerArgs,
    ) -> Result<Self, BadgeError> {
        let missing = |field| BadgeError::MissingRedeemerField { action, field };
        match action {
            BadgeAction::Init => Ok(Self::Init {
                owner,
                level: args.level.ok_or_else(|| missing("level"))?,
            }),
            BadgeAction::Upgrade => Ok(Self::Upgrade {
                owner,
                from_level: args.from_level.ok_or_else(|| missing("from_level"))?,
                to_level: args.to_level.ok_or_else(|| missing("to_level"))?,
            }),
            BadgeAction::Retire => Ok(Self::Retire {
                owner,
                level: args.level.ok_or_else(|| missing("level"))?,
            }),
        }
    }

    pub fn action(&self) -> BadgeAction {
        match self {
            Self::Init { .. } => BadgeAction::Init,
            Self::Upgrade { .. } => BadgeAction::Upgrade,
            Self::Retire { .. } => BadgeAction::Retire,
        }
    }

    pub fn owner(&self) -> KeyHash {
        match self {
            Self::Init { owner, .. } | Self::Upgrade { owner, .. } | Self::Retire { owner, .. } => {
                *owner
            }
        }
    }

    /// The exact mint/burn quantities this redeemer authorizes.
    pub fn expected_mint(&self, policy_id: PolicyId) -> Result<BTreeMap<Unit, i64>, BadgeError> {
        let mut mint = BTreeMap::new();
        match *self {
            Self::Init { owner, level } => {
                mint.insert(Unit::badge(policy_id, &owner, level.into())?, 1);
            }
            Self::Upgrade {
                owner,
                from_level,
                to_level,
            } => {
                mint.insert(Unit::badge(policy_id, &owner, from_level.into())?, -1);
                mint.insert(Unit::badge(policy_id, &owner, to_level.into())?, 1);
            }
            Self::Retire { owner, level } => {
                mint.insert(Unit::badge(policy_id, &owner, level.into())?, -1);
            }
        }
        Ok(mint)
    }

    pub fn to_data(&self) -> PlutusData {
        match *self {
            Self::Init { owner, level } => PlutusData::constr(
                0,
                vec![PlutusData::bytes(owner.as_bytes()), PlutusData::integer(level)],
            ),
            Self::Upgrade {
                owner,
                from_level,
                to_level,
            } => PlutusData::constr(
                1,
                vec![
                    PlutusData::bytes(owner.as_bytes()),
                    PlutusData::integer(from_level),
                    PlutusData::integer(to_level),
                ],
            ),
            Self::Retire { owner, level } => PlutusData::constr(
                2,
                vec![PlutusData::bytes(owner.as_bytes()), PlutusData::integer(level)],
            ),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_data().encode()
    }

    pub fn from_data(data: &PlutusData) -> Result<Self, BadgeError> {
        let PlutusData::Constr { tag, fields } = data else {
            return Err(BadgeError::InvalidPlutusData("MintRedeemer must be a constructor".into()));
        };
        match tag {
            0 => {
                let f = arity(fields, 2, "MintRedeemer::Init")?;
                Ok(Self::Init {
                    owner: KeyHash::new(hash28(&f[0], "owner")?),
                    level: level(&f[1], "level")?,
                })
            }
            1 => {
                let f = arity(fields, 3, "MintRedeemer::Upgrade")?;
                Ok(Self::Upgrade {
                    owner: KeyHash::new(hash28(&f[0], "owner")?),
                    from_level: level(&f[1], "from_level")?,
                    to_level: level(&f[2], "to_level")?,
                })
            }
            2 => {
                let f = arity(fields, 2, "MintRedeemer::Retire")?;
                Ok(Self::Retire {
                    owner: KeyHash::new(hash28(&f[0], "owner")?),
                    level: level(&f[1], "level")?,
                })
            }
            other => Err(BadgeError::InvalidPlutusData(format!(
                "unknown MintRedeemer constructor {other}"
            ))),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BadgeError> {
        Self::from_data(&PlutusData::decode(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// HolderRedeemer
// ---------------------------------------------------------------------------

/// Authorization handed to the holder validator when a locked badge is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderRedeemer {
    Upgrade { new_level: u8 },
    Retire,
}

impl HolderRedeemer {
    /// Builds the redeemer for `action`. Init spends nothing and has none.
    pub fn for_action(action: BadgeAction, new_level: Option<u8>) -> Result<Self, BadgeError> {
        match action {
            BadgeAction::Upgrade => Ok(Self::Upgrade {
                new_level: new_level.ok_or(BadgeError::MissingRedeemerField {
                    action,
                    field: "new_level",
                })?,
            }),
            BadgeAction::Retire => Ok(Self::Retire),
            BadgeAction::Init => Err(BadgeError::InvalidPlutusData(
                "Init spends no locked badge and takes no holder redeemer".into(),
            )),
        }
    }

    pub fn to_data(&self) -> PlutusData {
        match *self {
            Self::Upgrade { new_level } => {
                PlutusData::constr(0, vec![PlutusData::integer(new_level)])
            }
            Self::Retire => PlutusData::constr(1, vec![]),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_data().encode()
    }

    pub fn from_data(data: &PlutusData) -> Result<Self, BadgeError> {
        match data {
            PlutusData::Constr { tag: 0, fields } => {
                let f = arity(fields, 1, "HolderRedeemer::Upgrade")?;
                Ok(Self::Upgrade {
                    new_level: level(&f[0], "new_level")?,
                })
            }
            PlutusData::Constr { tag: 1, fields } => {
                arity(fields, 0, "HolderRedeemer::Retire")?;
                Ok(Self::Retire)
            }
            other => Err(BadgeError::InvalidPlutusData(format!(
                "not a HolderRedeemer: {other:?}"
            ))),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BadgeError> {
        Self::from_data(&PlutusData::decode(bytes)?)
    }
}
