//! Configuration layer for device-notifier
//!
//! The setup wizard (out of scope here) produces an ordered list of targets,
//! each with a priority, a match mode, and a list of conditions, plus a
//! fallback target. This crate parses that shape from YAML or JSON and
//! validates it into the engine's immutable [`dn_engine::RoutingTable`].
//! All configuration problems surface at load time as [`ConfigError`]; the
//! engine itself never sees an invalid table.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use schema::{ConditionConfig, NotifierConfig, TargetConfig};
