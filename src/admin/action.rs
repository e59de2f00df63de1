use serde_json::Value;
use std::fmt;

use crate::models::{ActivityEvent, AuditEvent, Logger};

/// Management data the console can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    GatewayRoutes,
    Logs,
    Health,
    Metrics,
    ThreadDump,
    Configurations,
    Env,
    Audits,
}

impl FetchKind {
    pub const ALL: [FetchKind; 8] = [
        FetchKind::GatewayRoutes,
        FetchKind::Logs,
        FetchKind::Health,
        FetchKind::Metrics,
        FetchKind::ThreadDump,
        FetchKind::Configurations,
        FetchKind::Env,
        FetchKind::Audits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::GatewayRoutes => "FETCH_GATEWAY_ROUTE",
            FetchKind::Logs => "FETCH_LOGS",
            FetchKind::Health => "FETCH_HEALTH",
            FetchKind::Metrics => "FETCH_METRICS",
            FetchKind::ThreadDump => "FETCH_THREAD_DUMP",
            FetchKind::Configurations => "FETCH_CONFIGURATIONS",
            FetchKind::Env => "FETCH_ENV",
            FetchKind::Audits => "FETCH_AUDITS",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "administration/{}", self.as_str())
    }
}

/// A successful fetch, carrying the data for its slice.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    GatewayRoutes(Vec<Value>),
    Logs(Vec<Logger>),
    Health(Value),
    Metrics(Value),
    ThreadDump(Vec<Value>),
    Configurations(Value),
    Env(Value),
    Audits { audits: Vec<AuditEvent>, total_items: u64 },
}

impl FetchPayload {
    pub fn kind(&self) -> FetchKind {
        match self {
            FetchPayload::GatewayRoutes(_) => FetchKind::GatewayRoutes,
            FetchPayload::Logs(_) => FetchKind::Logs,
            FetchPayload::Health(_) => FetchKind::Health,
            FetchPayload::Metrics(_) => FetchKind::Metrics,
            FetchPayload::ThreadDump(_) => FetchKind::ThreadDump,
            FetchPayload::Configurations(_) => FetchKind::Configurations,
            FetchPayload::Env(_) => FetchKind::Env,
            FetchPayload::Audits { .. } => FetchKind::Audits,
        }
    }
}

/// Everything the administration store reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Request(FetchKind),
    Success(FetchPayload),
    Failure(FetchKind, String),
    /// An activity record received from the tracker topic
    WebsocketMessage(ActivityEvent),
    /// The user's session was established (login or session restore)
    SessionEstablished,
    /// The user's session was rejected or ended
    SessionEnded,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Request(kind) => write!(f, "{}_PENDING", kind),
            Action::Success(payload) => write!(f, "{}_FULFILLED", payload.kind()),
            Action::Failure(kind, _) => write!(f, "{}_REJECTED", kind),
            Action::WebsocketMessage(_) => f.write_str("administration/WEBSOCKET_MESSAGE"),
            Action::SessionEstablished => f.write_str("authentication/GET_SESSION_FULFILLED"),
            Action::SessionEnded => f.write_str("authentication/GET_SESSION_REJECTED"),
        }
    }
}
