//! Notify payload normalization
//!
//! Callers of the notify service send `{message, title?, target?, data?}` plus
//! any number of extra top-level keys (mobile app extras such as `ttl`,
//! `channel`, `tts_text`, ...). Downstream notify services expect the extras
//! nested under `data`, so normalization moves every non-reserved top-level
//! key into `data` without overwriting keys that are already there.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level keys that stay top-level during normalization
const RESERVED_KEYS: [&str; 4] = ["message", "title", "target", "data"];

/// A normalized notification payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyPayload {
    /// Notification body
    #[serde(default)]
    pub message: String,

    /// Optional notification title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Optional sub-target (device or channel within the notify service)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,

    /// Service-specific extras, insertion-ordered
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, Value>,
}

impl NotifyPayload {
    /// Create a payload with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Normalize a raw service-call body
    ///
    /// Non-reserved top-level keys are merged into `data`; keys already
    /// present inside a nested `data` object win over top-level duplicates.
    /// A non-object value yields an empty payload.
    pub fn from_value(raw: &Value) -> Self {
        let Some(map) = raw.as_object() else {
            return Self::default();
        };

        let mut data: IndexMap<String, Value> = IndexMap::new();
        if let Some(Value::Object(nested)) = map.get("data") {
            for (k, v) in nested {
                data.insert(k.clone(), v.clone());
            }
        }

        for (k, v) in map {
            if RESERVED_KEYS.contains(&k.as_str()) {
                continue;
            }
            if !data.contains_key(k) {
                data.insert(k.clone(), v.clone());
            }
        }

        Self {
            message: map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: map
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string),
            target: map.get("target").cloned(),
            data,
        }
    }
}
