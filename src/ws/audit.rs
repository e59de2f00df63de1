use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::models::AuditEvent;

pub const TRACKER_CONNECT: &str = "TRACKER_CONNECT";
pub const TRACKER_DISCONNECT: &str = "TRACKER_DISCONNECT";

/// Bounded in-memory audit trail, oldest events are evicted first.
pub struct AuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn record(&self, principal: &str, event_type: &str, data: BTreeMap<String, String>) -> AuditEvent {
        let event = AuditEvent {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            principal: principal.to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            data,
        };
        info!("Audit {} for {}", event.event_type, event.principal);

        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        event
    }

    /// Newest first, together with the total number of retained events.
    pub fn page(&self, page: usize, size: usize) -> (Vec<AuditEvent>, u64) {
        let events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        let items = events
            .iter()
            .rev()
            .skip(page.saturating_mul(size))
            .take(size)
            .cloned()
            .collect();
        (items, events.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }
}
