use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::action::Action;
use super::reducer::reduce;
use super::state::AdministrationState;

/// Sees every action before the reducer does.
pub trait Middleware: Send + Sync {
    fn on_action(&self, store: &Store, action: &Action);
}

struct StoreInner {
    state: watch::Sender<AdministrationState>,
    middleware: Vec<Arc<dyn Middleware>>,
}

/// Central state-update channel: runs the middleware chain, folds the action
/// into the state and notifies view-model subscribers.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        let (state, _) = watch::channel(AdministrationState::default());
        Self {
            inner: Arc::new(StoreInner { state, middleware }),
        }
    }

    pub fn dispatch(&self, action: Action) {
        debug!("Dispatching {}", action);
        for middleware in &self.inner.middleware {
            middleware.on_action(self, &action);
        }
        self.inner.state.send_modify(|state| {
            let previous = std::mem::take(state);
            *state = reduce(previous, &action);
        });
    }

    pub fn state(&self) -> AdministrationState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every dispatched action.
    pub fn subscribe(&self) -> watch::Receiver<AdministrationState> {
        self.inner.state.subscribe()
    }
}
