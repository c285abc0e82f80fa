//! Group evaluation and priority routing
//!
//! `route` walks the table top-down and produces a full [`EvaluationTrace`]:
//! every condition and every group is evaluated and recorded even once the
//! decision is known, because the trace is the primary debugging surface.
//! `decide` is the short-circuiting twin for the production send path, where
//! no trace is observed; it always agrees with `route(...).decision`.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, trace};

use crate::compare::compare;
use crate::model::{ConditionGroup, MatchMode, Operator, ReferenceValue, RoutingTable};

/// Read-only lookup into the live entity state registry
///
/// Implementations return the `unknown` sentinel for entities that do not
/// exist; lookups never fail.
pub trait StateLookup {
    fn get_state(&self, entity_id: &str) -> String;
}

/// Snapshot lookup for tests and diagnostics
impl StateLookup for HashMap<String, String> {
    fn get_state(&self, entity_id: &str) -> String {
        self.get(entity_id)
            .cloned()
            .unwrap_or_else(|| dn_core::STATE_UNKNOWN.to_string())
    }
}

impl<T: StateLookup + ?Sized> StateLookup for &T {
    fn get_state(&self, entity_id: &str) -> String {
        (**self).get_state(entity_id)
    }
}

/// Result of one condition evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionTrace {
    pub entity_id: String,
    pub operator: Operator,
    pub reference: ReferenceValue,
    pub observed: String,
    pub result: bool,
}

/// Result of one entry's group evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTrace {
    pub target_id: String,
    pub match_mode: MatchMode,
    pub matched: bool,
}

/// Full record of one routing evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationTrace {
    /// Every condition result, in table order
    pub conditions: Vec<ConditionTrace>,
    /// Every entry's group result, in priority order
    pub groups: Vec<GroupTrace>,
    /// Target that won, or the fallback
    pub decision: String,
    /// Whether the decision fell through to the fallback
    pub fallback_used: bool,
}

impl EvaluationTrace {
    /// One-line human-readable summary, used as a sensor attribute
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            if !out.is_empty() {
                out.push_str("; ");
            }
            let _ = write!(out, "{}={}", group.target_id, group.matched);
        }
        if out.is_empty() {
            out.push_str("no targets");
        }
        let _ = write!(out, " -> {}", self.decision);
        if self.fallback_used {
            out.push_str(" (fallback)");
        }
        out
    }
}

/// Evaluate one condition group against the current state
///
/// Every condition is checked and traced regardless of the running group
/// result; an empty group never matches.
pub fn evaluate_group(
    group: &ConditionGroup,
    lookup: &impl StateLookup,
) -> (bool, Vec<ConditionTrace>) {
    let mut traces = Vec::with_capacity(group.conditions.len());
    for cond in &group.conditions {
        let entity_id = cond.entity_id.to_string();
        let observed = lookup.get_state(&entity_id);
        let result = compare(&observed, cond.operator, &cond.value);
        trace!(
            %entity_id,
            %observed,
            operator = %cond.operator,
            reference = %cond.value,
            result,
            "Condition checked"
        );
        traces.push(ConditionTrace {
            entity_id,
            operator: cond.operator,
            reference: cond.value.clone(),
            observed,
            result,
        });
    }

    let matched = match group.match_mode {
        _ if traces.is_empty() => false,
        MatchMode::All => traces.iter().all(|t| t.result),
        MatchMode::Any => traces.iter().any(|t| t.result),
    };
    (matched, traces)
}

/// Route an evaluation through the table, producing the full trace
///
/// Pure function of the table and the state snapshot: identical inputs
/// always yield an identical decision and trace.
pub fn route(table: &RoutingTable, lookup: &impl StateLookup) -> EvaluationTrace {
    let mut conditions = Vec::new();
    let mut groups = Vec::with_capacity(table.entries().len());
    let mut decision: Option<String> = None;

    for entry in table.entries() {
        let (matched, entry_traces) = evaluate_group(&entry.group, lookup);
        debug!(
            target_id = %entry.target_id,
            priority = entry.priority,
            match_mode = ?entry.group.match_mode,
            matched,
            "Evaluated routing entry"
        );
        conditions.extend(entry_traces);
        groups.push(GroupTrace {
            target_id: entry.target_id.clone(),
            match_mode: entry.group.match_mode,
            matched,
        });
        if matched && decision.is_none() {
            decision = Some(entry.target_id.clone());
        }
    }

    let fallback_used = decision.is_none();
    let decision = decision.unwrap_or_else(|| table.fallback_target_id().to_string());
    debug!(%decision, fallback_used, "Routing decision");

    EvaluationTrace {
        conditions,
        groups,
        decision,
        fallback_used,
    }
}

/// Decide the current target without building a trace
///
/// Short-circuits at the first matching entry (and within groups where the
/// combinator allows it).
pub fn decide(table: &RoutingTable, lookup: &impl StateLookup) -> String {
    for entry in table.entries() {
        if group_matches(&entry.group, lookup) {
            return entry.target_id.clone();
        }
    }
    table.fallback_target_id().to_string()
}

fn group_matches(group: &ConditionGroup, lookup: &impl StateLookup) -> bool {
    if group.conditions.is_empty() {
        return false;
    }
    let mut check = group.conditions.iter().map(|cond| {
        let observed = lookup.get_state(&cond.entity_id.to_string());
        compare(&observed, cond.operator, &cond.value)
    });
    match group.match_mode {
        MatchMode::All => check.all(|r| r),
        MatchMode::Any => check.any(|r| r),
    }
}
