use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::layout::Rect;
use crate::money::ValueToken;

/// Financial institution whose statement layout selects the extraction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issuer {
    Itau,
    Caixa,
    BancoDoBrasil,
    Bradesco,
    Safra,
    Xp,
    Unknown,
}

impl Issuer {
    pub const ALL: [Issuer; 7] = [
        Issuer::Itau,
        Issuer::Caixa,
        Issuer::BancoDoBrasil,
        Issuer::Bradesco,
        Issuer::Safra,
        Issuer::Xp,
        Issuer::Unknown,
    ];
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issuer::Itau => write!(f, "itau"),
            Issuer::Caixa => write!(f, "caixa"),
            Issuer::BancoDoBrasil => write!(f, "banco_do_brasil"),
            Issuer::Bradesco => write!(f, "bradesco"),
            Issuer::Safra => write!(f, "safra"),
            Issuer::Xp => write!(f, "xp"),
            Issuer::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Issuer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Issuer::ALL
            .into_iter()
            .find(|i| i.to_string() == s)
            .ok_or_else(|| format!("Unknown issuer: '{s}'"))
    }
}

/// What identifies a statement's row block in the master document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorDescriptor {
    /// Literal account number, searched verbatim. Never empty.
    AccountNumber(String),
    /// Resolved fund/entity display name, or the raw tax identifier when
    /// resolution failed.
    EntityName(String),
    Unresolved,
}

impl AnchorDescriptor {
    /// Builds an account anchor; a blank account yields `Unresolved`.
    pub fn account(number: &str) -> Self {
        let number = number.trim();
        if number.is_empty() {
            AnchorDescriptor::Unresolved
        } else {
            AnchorDescriptor::AccountNumber(number.to_string())
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, AnchorDescriptor::Unresolved)
    }
}

impl fmt::Display for AnchorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorDescriptor::AccountNumber(n) => write!(f, "account {n}"),
            AnchorDescriptor::EntityName(n) => write!(f, "entity '{n}'"),
            AnchorDescriptor::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// One source statement after extraction. Discarded once the matching pass
/// is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Source file name, used in logs and match records.
    pub name: String,
    pub issuer: Issuer,
    pub raw_text: String,
    pub anchor: AnchorDescriptor,
    /// Entity name kept alongside an account anchor for the matcher's
    /// name fallback. Equal to the anchor's name for `EntityName` anchors.
    pub entity_name: Option<String>,
    pub values: BTreeSet<ValueToken>,
}

impl Statement {
    /// The name the matcher falls back to when the account strategy finds nothing.
    pub fn fallback_name(&self) -> Option<&str> {
        match &self.anchor {
            AnchorDescriptor::EntityName(n) => Some(n.as_str()),
            _ => self.entity_name.as_deref(),
        }
    }

    pub fn is_matchable(&self) -> bool {
        self.anchor.is_resolved() && !self.values.is_empty()
    }
}

/// A value confirmed inside an anchor's search band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub statement: String,
    pub page: usize,
    pub anchor_rect: Rect,
    pub value_rect: Rect,
    pub value: ValueToken,
}
