//! Entry lifecycle: setup, reload, unload
//!
//! A [`NotifierEntry`] is one configured notifier wired into the host: the
//! `notify.<service_name>` dispatch service, the `device_notifier.evaluate`
//! diagnostic service, and the current-target sensor. Configuration edits
//! replace the whole routing table: reload validates the new configuration
//! first, then tears the old services and sensor down before the new ones
//! come up, so old and new entries never mix.

use std::sync::Arc;
use std::time::Duration;

use dn_core::DOMAIN;
use dn_config::{ConfigResult, NotifierConfig};
use dn_services::NotifyRegistry;
use dn_state::StateStore;
use tracing::{debug, info};

use crate::notify::Notifier;
use crate::sensor::{CurrentTargetSensor, SensorValue};

/// Debounce window for the current-target sensor
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One configured notifier, set up against a state store and a registry
pub struct NotifierEntry {
    store: Arc<StateStore>,
    registry: Arc<NotifyRegistry>,
    notifier: Arc<Notifier>,
    sensor: CurrentTargetSensor,
    notify_service_id: String,
    evaluate_service_id: String,
    debounce: Duration,
}

impl NotifierEntry {
    /// Set up an entry with the default sensor debounce
    pub fn setup(
        config: &NotifierConfig,
        store: Arc<StateStore>,
        registry: Arc<NotifyRegistry>,
    ) -> ConfigResult<Self> {
        Self::setup_with_debounce(config, store, registry, DEFAULT_DEBOUNCE)
    }

    /// Set up an entry with an explicit sensor debounce window
    pub fn setup_with_debounce(
        config: &NotifierConfig,
        store: Arc<StateStore>,
        registry: Arc<NotifyRegistry>,
        debounce: Duration,
    ) -> ConfigResult<Self> {
        let table = Arc::new(config.build_table()?);
        let notifier = Arc::new(Notifier::new(table.clone(), store.clone(), registry.clone()));

        let notify_service_id = format!("notify.{}", config.service_name);
        let evaluate_service_id = format!("{DOMAIN}.evaluate");
        register_services(&registry, &notifier, &notify_service_id, &evaluate_service_id);

        let sensor = CurrentTargetSensor::spawn(table, store.clone(), debounce);

        info!(
            service = %notify_service_id,
            name = %config.display_name(),
            "Notifier entry set up"
        );

        Ok(Self {
            store,
            registry,
            notifier,
            sensor,
            notify_service_id,
            evaluate_service_id,
            debounce,
        })
    }

    /// Replace the configuration wholesale
    ///
    /// The new configuration is validated before anything is torn down; on
    /// error the entry keeps running unchanged. On success the next
    /// evaluation and the sensor's subscription set reflect only the new
    /// table.
    pub async fn reload(&mut self, config: &NotifierConfig) -> ConfigResult<()> {
        let table = Arc::new(config.build_table()?);
        debug!(service = %self.notify_service_id, "Reloading notifier entry");

        self.registry.unregister(&self.notify_service_id);
        self.registry.unregister(&self.evaluate_service_id);
        self.sensor.shutdown().await;

        self.notifier = Arc::new(Notifier::new(
            table.clone(),
            self.store.clone(),
            self.registry.clone(),
        ));
        self.notify_service_id = format!("notify.{}", config.service_name);
        register_services(
            &self.registry,
            &self.notifier,
            &self.notify_service_id,
            &self.evaluate_service_id,
        );
        self.sensor = CurrentTargetSensor::spawn(table, self.store.clone(), self.debounce);

        info!(service = %self.notify_service_id, "Notifier entry reloaded");
        Ok(())
    }

    /// Remove the services and stop the sensor
    pub async fn unload(mut self) {
        self.registry.unregister(&self.notify_service_id);
        self.registry.unregister(&self.evaluate_service_id);
        self.sensor.shutdown().await;
        info!(service = %self.notify_service_id, "Notifier entry unloaded");
    }

    /// The dispatch surface
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// The live current-target sensor
    pub fn sensor(&self) -> &CurrentTargetSensor {
        &self.sensor
    }

    /// Current sensor value (target plus trace summary)
    pub fn current_target(&self) -> SensorValue {
        self.sensor.value()
    }

    /// Full id of the registered notify service
    pub fn notify_service_id(&self) -> &str {
        &self.notify_service_id
    }
}

fn register_services(
    registry: &Arc<NotifyRegistry>,
    notifier: &Arc<Notifier>,
    notify_service_id: &str,
    evaluate_service_id: &str,
) {
    let send_notifier = notifier.clone();
    registry.register(notify_service_id, move |payload| {
        let notifier = send_notifier.clone();
        async move { notifier.send(payload).await.map(|_| ()) }
    });

    let eval_notifier = notifier.clone();
    registry.register(evaluate_service_id, move |_payload| {
        let notifier = eval_notifier.clone();
        async move {
            notifier.evaluate_diagnostic();
            Ok(())
        }
    });

    debug!(
        notify = notify_service_id,
        evaluate = evaluate_service_id,
        "Registered entry services"
    );
}
