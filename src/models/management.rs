use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Response for `/management/health`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ManagementHealth {
    pub status: String,
    pub details: HealthDetails,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthDetails {
    pub tracker_connections: u32,
    pub tracker_subscribers: u32,
    /// Live connections, oldest first
    pub tracker_sessions: Vec<TrackerConnection>,
}

/// A live tracker connection as seen by the hub.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConnection {
    pub login: String,
    pub ip_address: Option<String>,
    pub subscriptions: u32,
    pub connected_at: DateTime<Utc>,
}

/// Response for `/management/metrics`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub n_conn: u32,
    pub n_subscriptions: u32,
    pub n_user_ctx: u32,
    pub n_audits: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
    pub uptime_secs: u64,
}

/// Logger name and its configured level
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Logger {
    pub name: String,
    pub level: String,
}

/// Response for `/management/env`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvResponse {
    pub active_profiles: Vec<String>,
    pub property_sources: Vec<PropertySource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct PropertySource {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

/// A recorded audit event
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: u64,
    pub principal: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}
