//! Core types for device-notifier
//!
//! This crate provides the fundamental types shared by the routing engine and
//! the integration glue: EntityId, the sentinel state constants, and the
//! notify payload normalization.

mod entity_id;
mod payload;

pub use entity_id::{EntityId, EntityIdError};
pub use payload::NotifyPayload;

/// Integration domain, used for the diagnostic service id
pub const DOMAIN: &str = "device_notifier";

/// State value for an entity that has never reported a usable value
pub const STATE_UNKNOWN: &str = "unknown";

/// State value for an entity whose integration is not ready
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Reference literal that matches either sentinel state
pub const REF_UNKNOWN_OR_UNAVAILABLE: &str = "unknown or unavailable";

/// Check whether a state value is one of the reserved sentinels
pub fn is_sentinel(state: &str) -> bool {
    state == STATE_UNKNOWN || state == STATE_UNAVAILABLE
}
