use std::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::action::Action;
use super::store::{Middleware, Store};
use crate::tracker::ConnectionManager;

/// Drives the tracker connection from session signals and feeds inbound
/// activity back into the store.
pub struct SessionMiddleware {
    manager: ConnectionManager,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

impl SessionMiddleware {
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            bridge: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    #[cfg(test)]
    pub fn is_bridged(&self) -> bool {
        match self.bridge.lock() {
            Ok(bridge) => bridge.as_ref().is_some_and(|h| !h.is_finished()),
            Err(_) => false,
        }
    }

    /// Forward the activity stream into the store, unless a bridge is already
    /// running. A bridge ends when the stream is reset.
    fn attach_bridge(&self, store: &Store) {
        let mut bridge = match self.bridge.lock() {
            Ok(bridge) => bridge,
            Err(poisoned) => poisoned.into_inner(),
        };
        if bridge.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let mut events = self.manager.stream().attach();
        let store = store.clone();
        *bridge = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => store.dispatch(Action::WebsocketMessage(event)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Activity bridge lagged, {} events skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Activity bridge finished");
        }));
        info!("Activity stream attached to the store");
    }
}

impl Middleware for SessionMiddleware {
    fn on_action(&self, store: &Store, action: &Action) {
        match action {
            Action::SessionEstablished => {
                // An open connection whose registration was dropped gets a
                // fresh one instead of a second connection.
                if !self.manager.connect() && !self.manager.is_subscribed() {
                    self.manager.subscribe();
                }
                self.attach_bridge(store);
            }
            Action::SessionEnded => self.manager.disconnect(),
            _ => {}
        }
    }
}
