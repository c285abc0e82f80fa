//! Raw configuration shapes and validation into a routing table

use dn_engine::{
    Condition, ConditionGroup, MatchMode, Operator, ReferenceValue, RoutingEntry, RoutingTable,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// One condition as the wizard writes it: operator and value are loosely
/// typed and validated during table construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Entity whose state is compared
    pub entity_id: String,

    /// Operator symbol: `>`, `<`, `>=`, `<=`, `==`, `!=`
    pub operator: String,

    /// Reference value: number or string
    pub value: Value,
}

/// One prioritized notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Notify service to route to, e.g. `notify.mobile_app_phone`
    pub target_id: String,

    /// Evaluation order; lower goes first, duplicates are rejected
    pub priority: u32,

    /// ALL or ANY combinator for the conditions
    #[serde(default)]
    pub match_mode: MatchMode,

    /// Conditions guarding this target; must not be empty
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

/// Complete configuration for one notifier entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Slug the notify service is registered under (`notify.<service_name>`)
    pub service_name: String,

    /// Optional human-readable name for display surfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Prioritized targets
    pub targets: Vec<TargetConfig>,

    /// Target used when no entry matches
    pub fallback_target_id: String,
}

impl NotifierConfig {
    /// Parse a configuration from a JSON body (e.g. a stored config entry)
    pub fn from_json(value: Value) -> ConfigResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Display name, falling back to the service slug
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.service_name)
    }

    /// Validate the configuration and build the immutable routing table
    pub fn build_table(&self) -> ConfigResult<RoutingTable> {
        if !is_valid_slug(&self.service_name) {
            return Err(ConfigError::InvalidServiceName {
                name: self.service_name.clone(),
            });
        }

        let mut entries = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let mut conditions = Vec::with_capacity(target.conditions.len());
            for cond in &target.conditions {
                conditions.push(build_condition(&target.target_id, cond)?);
            }
            entries.push(RoutingEntry {
                target_id: target.target_id.clone(),
                priority: target.priority,
                group: ConditionGroup {
                    conditions,
                    match_mode: target.match_mode,
                },
            });
        }

        let table = RoutingTable::new(entries, self.fallback_target_id.clone())?;
        debug!(
            service_name = %self.service_name,
            targets = table.entries().len(),
            entities = table.referenced_entities().len(),
            "Built routing table"
        );
        Ok(table)
    }
}

fn build_condition(target_id: &str, cond: &ConditionConfig) -> ConfigResult<Condition> {
    let entity_id = cond
        .entity_id
        .parse()
        .map_err(|source| ConfigError::InvalidEntityId {
            target_id: target_id.to_string(),
            source,
        })?;

    let operator: Operator =
        cond.operator
            .parse()
            .map_err(|_| ConfigError::InvalidOperator {
                target_id: target_id.to_string(),
                operator: cond.operator.clone(),
            })?;

    let value = match &cond.value {
        Value::Number(n) => match n.as_f64() {
            Some(f) => ReferenceValue::Number(f),
            None => {
                return Err(ConfigError::InvalidValue {
                    target_id: target_id.to_string(),
                    entity_id: cond.entity_id.clone(),
                })
            }
        },
        Value::String(s) => ReferenceValue::Text(s.clone()),
        _ => {
            return Err(ConfigError::InvalidValue {
                target_id: target_id.to_string(),
                entity_id: cond.entity_id.clone(),
            })
        }
    };

    Ok(Condition {
        entity_id,
        operator,
        value,
    })
}

fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
