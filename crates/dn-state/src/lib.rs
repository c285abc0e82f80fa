//! Entity state registry for device-notifier
//!
//! The StateStore is the narrow view of the host's entity registry that the
//! routing engine needs: a key→state lookup that returns the `unknown`
//! sentinel for missing entities, and a broadcast channel carrying state
//! change notifications in the order they are written.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dn_core::{EntityId, STATE_UNKNOWN};
use dn_engine::StateLookup;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default capacity of the change broadcast channel
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// The state of one entity at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
    /// Entity this state belongs to
    pub entity_id: EntityId,

    /// Current state value (e.g. "on", "23.5", "unavailable")
    pub value: String,

    /// When the value last changed to something different
    pub last_changed: DateTime<Utc>,

    /// When the value was last written, changed or not
    pub last_updated: DateTime<Utc>,
}

/// A state change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub entity_id: String,
    pub old_value: Option<String>,
    pub new_value: String,
}

/// Tracks entity states and notifies subscribers of writes
pub struct StateStore {
    states: DashMap<String, State>,
    change_tx: broadcast::Sender<StateChange>,
}

impl StateStore {
    /// Create a new store with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new store with the given change channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (change_tx, _) = broadcast::channel(capacity);
        Self {
            states: DashMap::new(),
            change_tx,
        }
    }

    /// Write an entity's state and notify subscribers
    ///
    /// `last_changed` is preserved when the value is unchanged; the change
    /// notification is sent either way, matching the host's behavior of
    /// delivering every reported write.
    pub fn set(&self, entity_id: EntityId, value: impl Into<String>) -> State {
        let key = entity_id.to_string();
        let value = value.into();
        let now = Utc::now();

        let old_value = self.states.get(&key).map(|s| s.value.clone());
        let last_changed = match self.states.get(&key) {
            Some(prev) if prev.value == value => prev.last_changed,
            _ => now,
        };

        let state = State {
            entity_id,
            value: value.clone(),
            last_changed,
            last_updated: now,
        };
        self.states.insert(key.clone(), state.clone());

        debug!(
            entity_id = %key,
            value = %value,
            changed = old_value.as_deref() != Some(&value),
            "Set entity state"
        );

        // Send errors only mean there are no subscribers right now
        let _ = self.change_tx.send(StateChange {
            entity_id: key,
            old_value,
            new_value: value,
        });

        state
    }

    /// Remove an entity from the store, notifying subscribers with the
    /// `unknown` sentinel
    pub fn remove(&self, entity_id: &str) -> Option<State> {
        let removed = self.states.remove(entity_id).map(|(_, s)| s);
        if let Some(old) = &removed {
            trace!(entity_id, "Removed entity state");
            let _ = self.change_tx.send(StateChange {
                entity_id: entity_id.to_string(),
                old_value: Some(old.value.clone()),
                new_value: STATE_UNKNOWN.to_string(),
            });
        }
        removed
    }

    /// Get the full state of an entity, if it exists
    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Number of tracked entities
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Subscribe to state change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.change_tx.subscribe()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateLookup for StateStore {
    /// Missing entities read as the `unknown` sentinel; lookups never fail
    fn get_state(&self, entity_id: &str) -> String {
        self.states
            .get(entity_id)
            .map(|s| s.value.clone())
            .unwrap_or_else(|| STATE_UNKNOWN.to_string())
    }
}
