use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{ActivityEvent, AuditEvent, Logger};

/// Sessions currently active on the tracker topic, at most one entry per
/// session id, ordered by their latest update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerState {
    pub activities: Vec<ActivityEvent>,
}

impl TrackerState {
    /// Fold one inbound event: it replaces its session's entry, or removes it
    /// when the page is `logout`.
    pub fn apply(mut self, event: &ActivityEvent) -> Self {
        self.activities.retain(|a| a.session_id != event.session_id);
        if !event.is_logout() {
            self.activities.push(event.clone());
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GatewayState {
    pub routes: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogsState {
    pub loggers: Vec<Logger>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationState {
    pub config_props: Value,
    pub env: Value,
}

impl Default for ConfigurationState {
    fn default() -> Self {
        Self {
            config_props: empty_object(),
            env: empty_object(),
        }
    }
}

/// View model of the administration screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationState {
    pub loading: bool,
    pub error_message: Option<String>,
    pub gateway: GatewayState,
    pub logs: LogsState,
    pub health: Value,
    pub metrics: Value,
    pub thread_dump: Vec<Value>,
    pub configuration: ConfigurationState,
    pub audits: Vec<AuditEvent>,
    pub tracker: TrackerState,
    pub total_items: u64,
}

impl Default for AdministrationState {
    fn default() -> Self {
        Self {
            loading: false,
            error_message: None,
            gateway: GatewayState::default(),
            logs: LogsState::default(),
            health: empty_object(),
            metrics: empty_object(),
            thread_dump: Vec::new(),
            configuration: ConfigurationState::default(),
            audits: Vec::new(),
            tracker: TrackerState::default(),
            total_items: 0,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
