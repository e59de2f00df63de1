use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;
use tokio::sync::broadcast;

use super::audit::AuditLog;
use crate::models::{ActivityEvent, TrackerConnection};

/// Shared state of the hub: the `/topic/tracker` fan-out, the connection
/// registry and the audit trail.
pub struct HubState {
    pub tracker: broadcast::Sender<ActivityEvent>,
    connections: RwLock<HashMap<String, TrackerConnection>>,
    pub audits: AuditLog,
    pub started_at: Instant,
}

impl HubState {
    pub fn new(audit_capacity: usize) -> Self {
        let (tracker, _rx) = broadcast::channel::<ActivityEvent>(256);
        Self {
            tracker,
            connections: RwLock::new(HashMap::new()),
            audits: AuditLog::new(audit_capacity),
            started_at: Instant::now(),
        }
    }

    /// Fan an event out to every tracker subscriber, returns the receiver count.
    pub fn broadcast(&self, event: ActivityEvent) -> usize {
        self.tracker.send(event).unwrap_or(0)
    }

    pub fn register(&self, session_id: &str, connection: TrackerConnection) {
        if let Ok(mut connections) = self.connections.write() {
            connections.insert(session_id.to_string(), connection);
        }
    }

    pub fn unregister(&self, session_id: &str) -> Option<TrackerConnection> {
        self.connections
            .write()
            .ok()
            .and_then(|mut connections| connections.remove(session_id))
    }

    pub fn set_subscriptions(&self, session_id: &str, subscriptions: u32) {
        if let Ok(mut connections) = self.connections.write() {
            if let Some(connection) = connections.get_mut(session_id) {
                connection.subscriptions = subscriptions;
            }
        }
    }

    pub fn connection_count(&self) -> u32 {
        self.connections.read().map(|c| c.len() as u32).unwrap_or(0)
    }

    pub fn subscription_count(&self) -> u32 {
        self.connections
            .read()
            .map(|c| c.values().map(|conn| conn.subscriptions).sum())
            .unwrap_or(0)
    }

    /// Snapshot of the registry, oldest connection first.
    pub fn connections(&self) -> Vec<TrackerConnection> {
        let mut connections: Vec<TrackerConnection> = self
            .connections
            .read()
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        connections.sort_by_key(|c| c.connected_at);
        connections
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
