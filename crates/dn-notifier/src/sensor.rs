//! Live status projection: the current-target sensor
//!
//! Watches every entity referenced by the routing table and keeps a
//! continuously-updated "which target would win right now" value. Relevant
//! state changes arm a single debounce timer; one recompute runs per armed
//! window, over the latest snapshot, so bursts coalesce without any change
//! being dropped. A new value is published only when the decision actually
//! changed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dn_engine::{route, RoutingTable};
use dn_state::StateStore;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Published sensor value: the winning target plus a trace summary attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorValue {
    /// Target the router would choose right now
    pub target: String,

    /// Human-readable summary of the evaluation that produced it
    pub summary: String,
}

/// Continuously-updated current-target sensor
///
/// Owns a background task subscribed to the state store. [`shutdown`] stops
/// the task and waits for it: after `shutdown` returns, no further value can
/// be published and any pending recompute has been cancelled.
///
/// [`shutdown`]: CurrentTargetSensor::shutdown
pub struct CurrentTargetSensor {
    value_rx: watch::Receiver<SensorValue>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl CurrentTargetSensor {
    /// Spawn the sensor task for the given table
    ///
    /// The initial value is computed synchronously before the task starts,
    /// so the sensor is never observed empty.
    pub fn spawn(table: Arc<RoutingTable>, store: Arc<StateStore>, debounce: Duration) -> Self {
        let watched: BTreeSet<String> = table.referenced_entities();

        // Subscribe before taking the initial snapshot: a write landing in
        // between is then delivered as a change notification instead of
        // being lost.
        let mut changes = store.subscribe();
        let initial = route(&*table, &*store);
        debug!(
            target = %initial.decision,
            entities = watched.len(),
            "Current-target sensor starting"
        );

        let initial_summary = initial.summary();
        let (value_tx, value_rx) = watch::channel(SensorValue {
            target: initial.decision,
            summary: initial_summary,
        });
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            let recompute_at = tokio::time::sleep(Duration::ZERO);
            tokio::pin!(recompute_at);
            let mut pending = false;

            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) => {
                            if !watched.contains(&change.entity_id) {
                                continue;
                            }
                            trace!(entity_id = %change.entity_id, new_value = %change.new_value, "Relevant state change");
                            if !pending {
                                pending = true;
                                recompute_at.as_mut().reset(Instant::now() + debounce);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(missed = n, "Sensor lagged behind state changes, forcing recompute");
                            if !pending {
                                pending = true;
                                recompute_at.as_mut().reset(Instant::now() + debounce);
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("State store closed, stopping sensor");
                            break;
                        }
                    },
                    () = &mut recompute_at, if pending => {
                        pending = false;
                        let result = route(&*table, &*store);
                        let published = value_tx.send_if_modified(|value| {
                            if value.target == result.decision {
                                return false;
                            }
                            *value = SensorValue {
                                target: result.decision.clone(),
                                summary: result.summary(),
                            };
                            true
                        });
                        debug!(target = %result.decision, published, "Recomputed current target");
                    },
                    _ = shutdown_rx.recv() => {
                        debug!("Current-target sensor shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            value_rx,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// The target the router would currently choose
    pub fn current(&self) -> String {
        self.value_rx.borrow().target.clone()
    }

    /// The full sensor value including the trace summary attribute
    pub fn value(&self) -> SensorValue {
        self.value_rx.borrow().clone()
    }

    /// Subscribe to published value changes
    pub fn subscribe(&self) -> watch::Receiver<SensorValue> {
        self.value_rx.clone()
    }

    /// Stop the sensor task and wait for it to finish
    ///
    /// Any scheduled recompute is cancelled; no value is published after
    /// this returns.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for CurrentTargetSensor {
    fn drop(&mut self) {
        // Best effort if shutdown was not awaited
        if let Some(handle) = self.handle.take() {
            let _ = self.shutdown_tx.send(());
            handle.abort();
        }
    }
}
