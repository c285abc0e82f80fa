//! Notify delivery registry
//!
//! The router's decision is a notify target id; this crate owns the seam
//! through which the payload actually leaves the engine. [`Delivery`] is the
//! narrow async interface the dispatcher calls, and [`NotifyRegistry`] is the
//! in-process implementation: async handlers keyed by target id. Delivery is
//! fire-and-forget with a single error signal; nothing here retries.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dn_core::NotifyPayload;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors surfaced by a delivery attempt
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("notify target not found: {target_id}")]
    TargetNotFound { target_id: String },

    #[error("delivery to {target_id} failed: {reason}")]
    Failed { target_id: String, reason: String },
}

/// Result type for delivery attempts
pub type DeliveryResult = Result<(), DeliveryError>;

/// Boxed future returned by notify handlers
pub type DeliveryFuture = BoxFuture<'static, DeliveryResult>;

/// Async handler behind one notify target
pub type NotifyHandler = Arc<dyn Fn(NotifyPayload) -> DeliveryFuture + Send + Sync>;

/// Narrow delivery interface the dispatcher depends on
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver a payload to the given target; not retried on failure
    async fn deliver(&self, target_id: &str, payload: NotifyPayload) -> DeliveryResult;
}

/// In-process delivery registry: notify handlers keyed by target id
pub struct NotifyRegistry {
    handlers: DashMap<String, NotifyHandler>,
}

impl NotifyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register a handler for a target id such as `notify.mobile_app_phone`
    pub fn register<F, Fut>(&self, target_id: impl Into<String>, handler: F)
    where
        F: Fn(NotifyPayload) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = DeliveryResult> + Send + 'static,
    {
        let target_id = target_id.into();
        debug!(target_id = %target_id, "Registering notify target");

        let handler: NotifyHandler =
            Arc::new(move |payload| Box::pin(handler(payload)) as DeliveryFuture);
        self.handlers.insert(target_id, handler);
    }

    /// Remove a target's handler, returning whether one was registered
    #[instrument(skip(self))]
    pub fn unregister(&self, target_id: &str) -> bool {
        let removed = self.handlers.remove(target_id).is_some();
        if removed {
            debug!(target_id, "Unregistered notify target");
        }
        removed
    }

    /// Check whether a target has a handler
    pub fn has_target(&self, target_id: &str) -> bool {
        self.handlers.contains_key(target_id)
    }

    /// All registered target ids, sorted
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<_> = self.handlers.iter().map(|h| h.key().clone()).collect();
        targets.sort();
        targets
    }
}

impl Default for NotifyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Delivery for NotifyRegistry {
    async fn deliver(&self, target_id: &str, payload: NotifyPayload) -> DeliveryResult {
        let handler = match self.handlers.get(target_id) {
            Some(h) => h.clone(),
            None => {
                warn!(target_id, "Notify target not found");
                return Err(DeliveryError::TargetNotFound {
                    target_id: target_id.to_string(),
                });
            }
        };

        debug!(target_id, message = %payload.message, "Delivering notification");
        handler(payload).await
    }
}
