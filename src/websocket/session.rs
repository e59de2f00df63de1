use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::models::{ActivityEvent, LOGOUT_PAGE};
use crate::stomp::Frame;
use crate::ws::audit::TRACKER_DISCONNECT;
use crate::ws::hubctx::HubState;
use crate::ws::principal::Principal;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// One tracker connection on the hub side.
pub struct TrackerSession {
    pub session_id: String,
    pub principal: Principal,
    pub ip_address: Option<String>,
    sender: WsSender,
    // subscription id -> destination
    subscriptions: std::sync::Mutex<HashMap<String, String>>,
    next_message_id: AtomicU64,
}

impl TrackerSession {
    pub fn new(session_id: String, principal: Principal, ip_address: Option<String>, sender: WsSender) -> Self {
        Self {
            session_id,
            principal,
            ip_address,
            sender,
            subscriptions: std::sync::Mutex::new(HashMap::new()),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Returns false once the socket is gone.
    pub async fn send_frame(&self, frame: &Frame) -> bool {
        if self.sender.lock().await.send(Message::Text(frame.encode())).await.is_err() {
            error!("Failed to send {} frame to session {}", frame.command, self.session_id);
            return false;
        }
        true
    }

    pub async fn close(&self) {
        let _ = self.sender.lock().await.close().await;
    }

    /// Register a subscription, returns the new subscription count.
    pub fn subscribe(&self, id: &str, destination: &str) -> u32 {
        let mut subscriptions = match self.subscriptions.lock() {
            Ok(subscriptions) => subscriptions,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscriptions.insert(id.to_string(), destination.to_string());
        subscriptions.len() as u32
    }

    /// Drop a subscription, returns the remaining count or None if unknown.
    pub fn unsubscribe(&self, id: &str) -> Option<u32> {
        let mut subscriptions = match self.subscriptions.lock() {
            Ok(subscriptions) => subscriptions,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscriptions.remove(id).map(|_| subscriptions.len() as u32)
    }

    /// Subscription ids listening on `destination`.
    pub fn subscriptions_to(&self, destination: &str) -> Vec<String> {
        match self.subscriptions.lock() {
            Ok(subscriptions) => subscriptions
                .iter()
                .filter(|(_, dest)| dest.as_str() == destination)
                .map(|(id, _)| id.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn next_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn audit_data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        data.insert("sessionId".to_string(), self.session_id.clone());
        if let Some(ip) = &self.ip_address {
            data.insert("remoteAddress".to_string(), ip.clone());
        }
        data
    }

    /// Activity of this session on `page`, stamped now.
    pub fn activity(&self, page: &str) -> ActivityEvent {
        ActivityEvent {
            id: self.principal.id,
            ip_address: self.ip_address.clone(),
            time: Some(chrono::Utc::now()),
            ..ActivityEvent::new(self.session_id.clone(), self.principal.login.clone(), page)
        }
    }
}

/// Retires a session from the hub when dropped: broadcasts its logout,
/// audits the disconnect and unregisters it.
pub struct SessionGuard {
    hub: Arc<HubState>,
    session: Arc<TrackerSession>,
}

impl SessionGuard {
    pub fn new(hub: Arc<HubState>, session: Arc<TrackerSession>) -> Self {
        Self { hub, session }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session = &self.session;
        self.hub.broadcast(session.activity(LOGOUT_PAGE));
        self.hub
            .audits
            .record(&session.principal.login, TRACKER_DISCONNECT, session.audit_data());
        self.hub.unregister(&session.session_id);
        info!("Tracker connection {} terminated", session.session_id);
    }
}
