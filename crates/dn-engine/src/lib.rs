//! Condition evaluation and priority routing engine
//!
//! This crate holds the routing data model and the pure evaluation logic:
//! a [`RoutingTable`] of prioritized targets each guarded by a group of
//! conditions, evaluated against a live state snapshot through the
//! [`StateLookup`] seam. Evaluation never fails: missing or unusable entity
//! states degrade individual comparisons instead of aborting the route.

mod compare;
mod model;
mod route;

pub use compare::compare;
pub use model::{
    Condition, ConditionGroup, MatchMode, Operator, ReferenceValue, RoutingEntry, RoutingTable,
    RoutingTableError,
};
pub use route::{decide, evaluate_group, route, ConditionTrace, EvaluationTrace, GroupTrace, StateLookup};
