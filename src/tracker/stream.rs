use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::trace;

use crate::models::ActivityEvent;

const STREAM_CAPACITY: usize = 256;

/// Multicast stream of inbound activity.
///
/// Nothing is buffered for observers that attach later: an event reaches only
/// the receivers attached at the moment it is delivered. `reset` ends the
/// current stream for every attached receiver and starts a new one.
#[derive(Clone)]
pub struct ActivityStream {
    sender: Arc<Mutex<broadcast::Sender<ActivityEvent>>>,
}

impl ActivityStream {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            sender: Arc::new(Mutex::new(tx)),
        }
    }

    /// Attach an observer to the current stream.
    pub fn attach(&self) -> broadcast::Receiver<ActivityEvent> {
        match self.sender.lock() {
            Ok(tx) => tx.subscribe(),
            Err(poisoned) => poisoned.into_inner().subscribe(),
        }
    }

    /// Deliver to the observers attached right now. Returns how many got it.
    pub fn deliver(&self, event: ActivityEvent) -> usize {
        let tx = match self.sender.lock() {
            Ok(tx) => tx.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let delivered = tx.send(event).unwrap_or(0);
        trace!("Activity delivered to {} observers", delivered);
        delivered
    }

    /// Replace the stream. Receivers of the old one observe `Closed`.
    pub fn reset(&self) {
        let (tx, _) = broadcast::channel(STREAM_CAPACITY);
        let old = match self.sender.lock() {
            Ok(mut current) => std::mem::replace(&mut *current, tx),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), tx),
        };
        drop(old);
    }

    #[cfg(test)]
    pub fn observer_count(&self) -> usize {
        match self.sender.lock() {
            Ok(tx) => tx.receiver_count(),
            Err(poisoned) => poisoned.into_inner().receiver_count(),
        }
    }
}

impl Default for ActivityStream {
    fn default() -> Self {
        Self::new()
    }
}
