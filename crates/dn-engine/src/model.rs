//! Routing data model
//!
//! A [`RoutingTable`] is built once from configuration and is immutable for
//! the lifetime of the entry; configuration edits replace it wholesale.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use dn_core::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Comparison operator, serialized in the symbol form the config uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    /// Whether this operator requires a numeric ordering
    pub fn is_relational(&self) -> bool {
        matches!(self, Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            other => Err(format!("unknown operator '{other}'")),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference value a live state is compared against: a number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceValue {
    Number(f64),
    Text(String),
}

impl ReferenceValue {
    /// Numeric view, parsing text references that look numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReferenceValue::Number(n) => Some(*n),
            ReferenceValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Text view of the reference, for string comparison
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReferenceValue::Number(_) => None,
            ReferenceValue::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for ReferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceValue::Number(n) => write!(f, "{n}"),
            ReferenceValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ReferenceValue {
    fn from(n: f64) -> Self {
        ReferenceValue::Number(n)
    }
}

impl From<&str> for ReferenceValue {
    fn from(s: &str) -> Self {
        ReferenceValue::Text(s.to_string())
    }
}

/// A single comparison between a live entity state and a reference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Entity whose state is observed
    pub entity_id: EntityId,

    /// Comparison operator
    pub operator: Operator,

    /// Right-hand side of the comparison
    pub value: ReferenceValue,
}

/// ALL requires every condition to hold, ANY requires at least one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// An ordered list of conditions combined under a match mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

/// One prioritized target with its guarding condition group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEntry {
    /// Notify service this entry routes to, e.g. `notify.mobile_app_phone`
    pub target_id: String,

    /// Position in the evaluation order; lower evaluates first
    pub priority: u32,

    /// Conditions guarding this target
    pub group: ConditionGroup,
}

/// Errors detected when assembling a routing table
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingTableError {
    #[error("duplicate priority {priority} shared by '{first}' and '{second}'")]
    DuplicatePriority {
        priority: u32,
        first: String,
        second: String,
    },

    #[error("target '{target_id}' has an empty condition group")]
    EmptyGroup { target_id: String },

    #[error("fallback target must not be empty")]
    EmptyFallback,
}

/// The immutable routing table: prioritized entries plus a fallback target
///
/// Entries are kept sorted ascending by priority, so the first entry is
/// always the first evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRoutingTable")]
pub struct RoutingTable {
    entries: Vec<RoutingEntry>,
    fallback_target_id: String,
}

/// Unvalidated mirror that funnels deserialization through [`RoutingTable::new`]
#[derive(Deserialize)]
struct RawRoutingTable {
    entries: Vec<RoutingEntry>,
    fallback_target_id: String,
}

impl TryFrom<RawRoutingTable> for RoutingTable {
    type Error = RoutingTableError;

    fn try_from(raw: RawRoutingTable) -> Result<Self, Self::Error> {
        Self::new(raw.entries, raw.fallback_target_id)
    }
}

impl RoutingTable {
    /// Build a table, sorting entries by priority and validating invariants
    pub fn new(
        mut entries: Vec<RoutingEntry>,
        fallback_target_id: impl Into<String>,
    ) -> Result<Self, RoutingTableError> {
        let fallback_target_id = fallback_target_id.into();
        if fallback_target_id.is_empty() {
            return Err(RoutingTableError::EmptyFallback);
        }

        for entry in &entries {
            if entry.group.conditions.is_empty() {
                return Err(RoutingTableError::EmptyGroup {
                    target_id: entry.target_id.clone(),
                });
            }
        }

        entries.sort_by_key(|e| e.priority);
        for pair in entries.windows(2) {
            if pair[0].priority == pair[1].priority {
                return Err(RoutingTableError::DuplicatePriority {
                    priority: pair[0].priority,
                    first: pair[0].target_id.clone(),
                    second: pair[1].target_id.clone(),
                });
            }
        }

        Ok(Self {
            entries,
            fallback_target_id,
        })
    }

    /// Entries in ascending priority order
    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    /// Target used when no entry matches
    pub fn fallback_target_id(&self) -> &str {
        &self.fallback_target_id
    }

    /// Deduplicated, ordered set of entity ids referenced by any condition
    ///
    /// This is the subscription set of the live status sensor.
    pub fn referenced_entities(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|e| e.group.conditions.iter())
            .map(|c| c.entity_id.to_string())
            .collect()
    }
}
