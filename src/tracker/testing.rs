//! In-memory broker used by the tracker and store tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

use super::transport::{Connector, FrameLink};
use crate::error::TrackerError;
use crate::models::ActivityEvent;
use crate::stomp::{self, Command, Frame, TRACKER_TOPIC};

#[derive(Default)]
struct Peer {
    to_client: Option<mpsc::UnboundedSender<Frame>>,
    awaiting_accept: bool,
    subscription: Option<String>,
}

#[derive(Default)]
struct BrokerState {
    opened: Vec<Url>,
    received: Vec<Frame>,
    peers: Vec<Peer>,
    refuse_next: u32,
    hold_handshakes: bool,
    next_message_id: u64,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` transport opens.
    pub fn refuse_next(&self, n: u32) {
        self.state.lock().unwrap().refuse_next = n;
    }

    /// Leave CONNECT frames unanswered until `accept_pending`.
    pub fn hold_handshakes(&self, hold: bool) {
        self.state.lock().unwrap().hold_handshakes = hold;
    }

    pub fn accept_pending(&self) {
        let mut state = self.state.lock().unwrap();
        for peer in state.peers.iter_mut().filter(|p| p.awaiting_accept) {
            peer.awaiting_accept = false;
            if let Some(tx) = &peer.to_client {
                let _ = tx.send(stomp::connected_frame("memory"));
            }
        }
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn opened_urls(&self) -> Vec<Url> {
        self.state.lock().unwrap().opened.clone()
    }

    /// Every frame clients sent, CONNECT frames excluded.
    pub fn received(&self) -> Vec<Frame> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn received_of(&self, command: Command) -> Vec<Frame> {
        self.received().into_iter().filter(|f| f.command == command).collect()
    }

    pub fn subscriber_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.peers.iter().filter(|p| p.subscription.is_some()).count()
    }

    /// Push a raw body to every subscribed client.
    pub fn broadcast_raw(&self, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_message_id += 1;
        let id = state.next_message_id;
        for peer in &state.peers {
            if let (Some(tx), Some(sub)) = (&peer.to_client, &peer.subscription) {
                let _ = tx.send(stomp::message_frame(TRACKER_TOPIC, sub, id, body));
            }
        }
    }

    pub fn broadcast(&self, event: &ActivityEvent) {
        self.broadcast_raw(&serde_json::to_string(event).unwrap());
    }

    /// Drop every client connection, as a crashed server would.
    pub fn drop_clients(&self) {
        let mut state = self.state.lock().unwrap();
        for peer in state.peers.iter_mut() {
            peer.to_client = None;
            peer.subscription = None;
        }
    }

    fn on_frame(&self, idx: usize, frame: Frame) -> bool {
        let mut state = self.state.lock().unwrap();
        let hold = state.hold_handshakes;
        match frame.command {
            Command::Connect | Command::Stomp => {
                let peer = &mut state.peers[idx];
                if hold {
                    peer.awaiting_accept = true;
                } else if let Some(tx) = &peer.to_client {
                    let _ = tx.send(stomp::connected_frame("memory"));
                }
                return true;
            }
            Command::Subscribe => {
                state.peers[idx].subscription = frame.get_header("id").map(str::to_string);
            }
            Command::Unsubscribe => {
                state.peers[idx].subscription = None;
            }
            _ => {}
        }
        let done = frame.command == Command::Disconnect;
        state.received.push(frame);
        if done {
            state.peers[idx] = Peer::default();
        }
        !done
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    async fn open(&self, url: &Url) -> Result<FrameLink, TrackerError> {
        let (outbound, mut from_client) = mpsc::unbounded_channel::<Frame>();
        let (to_client, inbound) = mpsc::unbounded_channel::<Frame>();
        let idx = {
            let mut state = self.state.lock().unwrap();
            state.opened.push(url.clone());
            if state.refuse_next > 0 {
                state.refuse_next -= 1;
                return Err(TrackerError::Transport("connection refused".to_string()));
            }
            state.peers.push(Peer {
                to_client: Some(to_client),
                ..Peer::default()
            });
            state.peers.len() - 1
        };

        let broker = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = from_client.recv().await {
                if !broker.on_frame(idx, frame) {
                    break;
                }
            }
        });
        Ok(FrameLink { outbound, inbound })
    }
}

/// Poll `check` until it holds, yielding to spawned tasks in between.
pub async fn wait_until<F: FnMut() -> bool>(mut check: F) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
