//! Dispatch entry point
//!
//! `send` routes a notification to the first matching target and forwards the
//! payload unmodified; `evaluate_diagnostic` runs the full evaluation and
//! writes every condition and group result to the log, without delivering
//! anything.

use std::sync::Arc;

use dn_core::NotifyPayload;
use dn_engine::{decide, route, EvaluationTrace, RoutingTable};
use dn_services::{Delivery, DeliveryError};
use dn_state::StateStore;
use tracing::debug;

/// The callable surface of one configured notifier
pub struct Notifier {
    table: Arc<RoutingTable>,
    store: Arc<StateStore>,
    delivery: Arc<dyn Delivery>,
}

impl Notifier {
    pub fn new(
        table: Arc<RoutingTable>,
        store: Arc<StateStore>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            table,
            store,
            delivery,
        }
    }

    /// The routing table this notifier evaluates
    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Route and deliver a notification
    ///
    /// The payload is forwarded unmodified to the chosen target. Delivery
    /// failures surface to the caller and are not retried; the fallback
    /// mechanism is about condition matching, not delivery robustness.
    /// Returns the target id the payload was delivered to.
    pub async fn send(&self, payload: NotifyPayload) -> Result<String, DeliveryError> {
        // No trace is observed on this path, so the short-circuiting
        // evaluation is allowed.
        let decision = decide(&*self.table, &*self.store);
        debug!(target_id = %decision, message = %payload.message, "Forwarding notification");
        self.delivery.deliver(&decision, payload).await?;
        Ok(decision)
    }

    /// Run a full evaluation and log the complete trace
    ///
    /// Never delivers anything; this is the developer-tool surface.
    pub fn evaluate_diagnostic(&self) -> EvaluationTrace {
        let trace = route(&*self.table, &*self.store);
        for cond in &trace.conditions {
            debug!(
                entity_id = %cond.entity_id,
                observed = %cond.observed,
                operator = %cond.operator,
                reference = %cond.reference,
                result = cond.result,
                "Condition result"
            );
        }
        for group in &trace.groups {
            debug!(
                target_id = %group.target_id,
                match_mode = ?group.match_mode,
                matched = group.matched,
                "Group result"
            );
        }
        debug!(decision = %trace.decision, fallback_used = trace.fallback_used, "Evaluation complete");
        trace
    }
}
