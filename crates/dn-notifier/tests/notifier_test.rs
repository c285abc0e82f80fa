//! End-to-end tests for the dispatch entry point and the entry lifecycle

use std::sync::Arc;

use dn_config::NotifierConfig;
use dn_core::NotifyPayload;
use dn_notifier::NotifierEntry;
use dn_services::{Delivery, DeliveryError, NotifyRegistry};
use dn_state::StateStore;
use serde_json::json;
use tokio::sync::mpsc;

fn scenario_config() -> NotifierConfig {
    NotifierConfig::from_json(json!({
        "service_name": "household",
        "targets": [
            {
                "target_id": "notify.phone",
                "priority": 1,
                "match_mode": "all",
                "conditions": [
                    {"entity_id": "sensor.battery", "operator": ">", "value": 20}
                ]
            },
            {
                "target_id": "notify.pc",
                "priority": 2,
                "match_mode": "any",
                "conditions": [
                    {"entity_id": "sensor.pc_state", "operator": "==", "value": "on"}
                ]
            }
        ],
        "fallback_target_id": "notify.sms"
    }))
    .unwrap()
}

/// Register a capturing handler for a target and return its receiver
fn capture(registry: &NotifyRegistry, target_id: &str) -> mpsc::UnboundedReceiver<NotifyPayload> {
    let (tx, rx) = mpsc::unbounded_channel();
    registry.register(target_id, move |payload| {
        let tx = tx.clone();
        async move {
            tx.send(payload).ok();
            Ok(())
        }
    });
    rx
}

fn set(store: &StateStore, entity_id: &str, value: &str) {
    store.set(entity_id.parse().unwrap(), value);
}

#[tokio::test]
async fn test_send_routes_to_first_matching_target() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());
    let mut phone = capture(&registry, "notify.phone");
    let mut pc = capture(&registry, "notify.pc");
    capture(&registry, "notify.sms");

    set(&store, "sensor.battery", "50");
    set(&store, "sensor.pc_state", "on");

    let entry = NotifierEntry::setup(&scenario_config(), store, registry.clone()).unwrap();

    // The registered notify service routes through the real dispatcher
    registry
        .deliver(
            "notify.household",
            NotifyPayload::new("door open").with_title("Alert"),
        )
        .await
        .unwrap();

    let delivered = phone.recv().await.unwrap();
    assert_eq!(delivered.message, "door open");
    assert_eq!(delivered.title.as_deref(), Some("Alert"));
    assert!(pc.try_recv().is_err());

    entry.unload().await;
}

#[tokio::test]
async fn test_end_to_end_scenario_decisions() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());
    capture(&registry, "notify.phone");
    capture(&registry, "notify.pc");
    capture(&registry, "notify.sms");

    let entry = NotifierEntry::setup(&scenario_config(), store.clone(), registry).unwrap();
    let notifier = entry.notifier().clone();

    set(&store, "sensor.battery", "15");
    set(&store, "sensor.pc_state", "on");
    assert_eq!(notifier.send(NotifyPayload::new("a")).await.unwrap(), "notify.pc");

    set(&store, "sensor.battery", "50");
    set(&store, "sensor.pc_state", "off");
    assert_eq!(notifier.send(NotifyPayload::new("b")).await.unwrap(), "notify.phone");

    set(&store, "sensor.battery", "10");
    assert_eq!(notifier.send(NotifyPayload::new("c")).await.unwrap(), "notify.sms");

    entry.unload().await;
}

#[tokio::test]
async fn test_payload_forwarded_unmodified() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());
    let mut sms = capture(&registry, "notify.sms");

    let entry = NotifierEntry::setup(&scenario_config(), store, registry).unwrap();

    let payload = NotifyPayload::from_value(&json!({
        "message": "wake up",
        "title": "Alarm",
        "channel": "alarm_stream",
        "data": {"ttl": 0}
    }));
    entry.notifier().send(payload.clone()).await.unwrap();

    assert_eq!(sms.recv().await.unwrap(), payload);
    entry.unload().await;
}

#[tokio::test]
async fn test_delivery_error_surfaces_to_caller() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());
    // Fallback target deliberately not registered

    let entry = NotifierEntry::setup(&scenario_config(), store, registry).unwrap();
    let err = entry
        .notifier()
        .send(NotifyPayload::new("lost"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::TargetNotFound { target_id } if target_id == "notify.sms"));

    entry.unload().await;
}

#[tokio::test]
async fn test_evaluate_diagnostic_never_delivers() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());
    let mut phone = capture(&registry, "notify.phone");
    let mut sms = capture(&registry, "notify.sms");

    set(&store, "sensor.battery", "50");
    let entry = NotifierEntry::setup(&scenario_config(), store, registry.clone()).unwrap();

    let trace = entry.notifier().evaluate_diagnostic();
    assert_eq!(trace.decision, "notify.phone");
    assert_eq!(trace.groups.len(), 2);
    assert_eq!(trace.conditions.len(), 2);

    // Diagnostic service is registered and side-effect free apart from logging
    registry
        .deliver("device_notifier.evaluate", NotifyPayload::default())
        .await
        .unwrap();

    assert!(phone.try_recv().is_err());
    assert!(sms.try_recv().is_err());
    entry.unload().await;
}

#[tokio::test]
async fn test_unload_removes_services() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());

    let entry = NotifierEntry::setup(&scenario_config(), store, registry.clone()).unwrap();
    assert!(registry.has_target("notify.household"));
    assert!(registry.has_target("device_notifier.evaluate"));

    entry.unload().await;
    assert!(!registry.has_target("notify.household"));
    assert!(!registry.has_target("device_notifier.evaluate"));
}

#[tokio::test]
async fn test_setup_rejects_bad_config() {
    let store = Arc::new(StateStore::new());
    let registry = Arc::new(NotifyRegistry::new());

    let mut body = json!({
        "service_name": "household",
        "targets": [],
        "fallback_target_id": ""
    });
    body["targets"] = json!([]);
    let config = NotifierConfig::from_json(body).unwrap();

    assert!(NotifierEntry::setup(&config, store, registry.clone()).is_err());
    // Nothing was registered
    assert!(registry.targets().is_empty());
}
