//! Priority notification routing integration
//!
//! Ties the routing engine to a live system: [`Notifier`] is the callable
//! dispatch surface (send a notification, or run a diagnostic evaluation),
//! [`CurrentTargetSensor`] is the continuously-updated view of which target
//! would be chosen right now, and [`NotifierEntry`] owns the setup, reload,
//! and unload lifecycle of one configured notifier.

mod entry;
mod notify;
mod sensor;

pub use entry::NotifierEntry;
pub use notify::Notifier;
pub use sensor::{CurrentTargetSensor, SensorValue};
