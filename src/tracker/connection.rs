use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use super::credentials::Credentials;
use super::endpoint::{handshake_host, tracker_url};
use super::navigation::Navigator;
use super::ready::{ready_pair, ReadyResolver, ReadySignal};
use super::stream::ActivityStream;
use super::transport::{Connector, FrameLink};
use crate::config::Config;
use crate::error::TrackerError;
use crate::models::ActivityEvent;
use crate::stomp::{self, Command, Frame, ACTIVITY_DESTINATION, TRACKER_TOPIC};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a closing session waits for the peer to hang up after DISCONNECT.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Application origin, e.g. `http://localhost:8080/`
    pub origin: Url,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    pub reconnect_attempts: u32,
}

impl TrackerOptions {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(10),
            reconnect_attempts: 5,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TrackerError> {
        let origin = Url::parse(&config.tracker_origin)
            .map_err(|e| TrackerError::Endpoint(format!("{}: {}", config.tracker_origin, e)))?;
        Ok(Self {
            reconnect_initial: config.reconnect_initial(),
            reconnect_max: config.reconnect_max(),
            reconnect_attempts: config.reconnect_attempts.max(1),
            ..Self::new(origin)
        })
    }
}

/// Double the delay, capped at `max`.
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    let next = current + current;
    if next > max {
        max
    } else {
        next
    }
}

enum SessionCommand {
    Publish(String),
    Subscribe,
    Unsubscribe,
    Disconnect,
}

struct Session {
    attempt: u64,
    ready: ReadySignal,
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

struct ManagerState {
    phase: ConnectionState,
    session: Option<Session>,
    connected_once: bool,
    subscribed: bool,
    nav_listener: Option<JoinHandle<()>>,
    next_attempt: u64,
}

struct Shared {
    options: TrackerOptions,
    connector: Arc<dyn Connector>,
    credentials: Credentials,
    navigator: Navigator,
    stream: ActivityStream,
    state: Mutex<ManagerState>,
    listener_installs: AtomicU32,
}

/// Owns the single tracker connection.
///
/// `connect` is a no-op while a connection is open or being opened, so there
/// is never more than one live connection per manager. Cloning yields another
/// handle to the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        options: TrackerOptions,
        connector: Arc<dyn Connector>,
        credentials: Credentials,
        navigator: Navigator,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                connector,
                credentials,
                navigator,
                stream: ActivityStream::new(),
                state: Mutex::new(ManagerState {
                    phase: ConnectionState::Disconnected,
                    session: None,
                    connected_once: false,
                    subscribed: false,
                    nav_listener: None,
                    next_attempt: 0,
                }),
                listener_installs: AtomicU32::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().phase
    }

    pub fn stream(&self) -> &ActivityStream {
        &self.shared.stream
    }

    #[cfg(test)]
    pub fn navigator(&self) -> &Navigator {
        &self.shared.navigator
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().subscribed
    }

    #[cfg(test)]
    pub fn has_navigation_listener(&self) -> bool {
        self.lock().nav_listener.is_some()
    }

    /// How many times a navigation listener has been installed.
    #[cfg(test)]
    pub fn listener_installs(&self) -> u32 {
        self.shared.listener_installs.load(Ordering::SeqCst)
    }

    /// Ready signal of the current attempt, if any.
    pub fn ready(&self) -> Option<ReadySignal> {
        self.lock().session.as_ref().map(|s| s.ready.clone())
    }

    pub async fn await_ready(&self) -> Result<(), TrackerError> {
        let ready = self.ready().ok_or(TrackerError::NotConnected)?;
        ready.wait().await
    }

    /// Start connecting unless a connection is open or in flight.
    ///
    /// Returns whether a new attempt was started.
    pub fn connect(&self) -> bool {
        let mut state = self.lock();
        if state.phase != ConnectionState::Disconnected {
            debug!("Tracker connect ignored while {:?}", state.phase);
            return false;
        }

        let token = self.shared.credentials.token();
        let url = match tracker_url(&self.shared.options.origin, token.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                error!("Cannot derive tracker endpoint: {}", e);
                return false;
            }
        };

        state.next_attempt += 1;
        let attempt = state.next_attempt;
        let (resolver, ready) = ready_pair();
        let (commands, rx) = mpsc::unbounded_channel();
        let manager = self.clone();
        let task = tokio::spawn(async move {
            manager.run_session(attempt, url, resolver, rx).await;
        });

        info!(
            "Connecting tracker (attempt {}, authenticated: {})",
            attempt,
            token.is_some()
        );
        state.phase = ConnectionState::Connecting;
        state.session = Some(Session {
            attempt,
            ready,
            commands,
            task,
        });
        true
    }

    /// Close the connection, if any, and forget the navigation listener.
    ///
    /// A handshake still in flight is abandoned; its waiters observe `Closed`.
    /// Messages that arrive after this call are not delivered.
    pub fn disconnect(&self) {
        let _ = self.detach();
    }

    /// `disconnect`, then wait until the DISCONNECT frame went out and the
    /// peer hung up, or the drain timed out.
    pub async fn close(&self) {
        if let Some(task) = self.detach() {
            if let Err(e) = task.await {
                debug!("Tracker session task ended abnormally: {}", e);
            }
        }
    }

    fn detach(&self) -> Option<JoinHandle<()>> {
        let mut state = self.lock();
        let mut draining = None;
        if let Some(session) = state.session.take() {
            if state.phase == ConnectionState::Connected {
                let _ = session.commands.send(SessionCommand::Disconnect);
                draining = Some(session.task);
            } else {
                session.task.abort();
            }
            info!("Tracker disconnected (attempt {})", session.attempt);
        }
        state.phase = ConnectionState::Disconnected;
        state.subscribed = false;
        if let Some(listener) = state.nav_listener.take() {
            listener.abort();
        }
        state.connected_once = false;
        draining
    }

    /// Send the current page once the connection is ready. Fire and forget.
    pub fn publish(&self) {
        let Some((ready, commands)) = self.session_handles() else {
            debug!("Activity not published, tracker is not connected");
            return;
        };
        let navigator = self.shared.navigator.clone();
        tokio::spawn(async move {
            if ready.wait().await.is_ok() {
                let body = activity_body(&navigator.current());
                let _ = commands.send(SessionCommand::Publish(body));
            }
        });
    }

    /// Register on the tracker topic once the connection is ready.
    pub fn subscribe(&self) {
        let Some((ready, commands)) = self.session_handles() else {
            debug!("Tracker subscription skipped, not connected");
            return;
        };
        tokio::spawn(async move {
            if ready.wait().await.is_ok() {
                let _ = commands.send(SessionCommand::Subscribe);
            }
        });
    }

    /// Drop the topic registration, if any, and restart the event stream.
    pub fn unsubscribe(&self) {
        {
            let mut state = self.lock();
            if state.subscribed {
                if let Some(session) = &state.session {
                    let _ = session.commands.send(SessionCommand::Unsubscribe);
                }
                state.subscribed = false;
            }
        }
        self.shared.stream.reset();
    }

    fn session_handles(&self) -> Option<(ReadySignal, mpsc::UnboundedSender<SessionCommand>)> {
        self.lock()
            .session
            .as_ref()
            .map(|s| (s.ready.clone(), s.commands.clone()))
    }

    async fn run_session(
        self,
        attempt: u64,
        url: Url,
        resolver: ReadyResolver,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) {
        let FrameLink {
            outbound,
            mut inbound,
        } = match self.establish(&url).await {
            Ok(link) => link,
            Err(e) => {
                error!("Tracker connection to {} failed: {}", without_query(&url), e);
                self.end_session(attempt);
                resolver.fail(e);
                return;
            }
        };

        let Some(first_connection) = self.mark_connected(attempt) else {
            debug!("Tracker attempt {} superseded, closing", attempt);
            return;
        };
        // Listen before the first publish so no navigation falls in between.
        let changes = first_connection.then(|| self.shared.navigator.listen());
        resolver.resolve();
        info!("Tracker connected to {}", without_query(&url));

        let mut live = LiveSession::new(outbound);
        live.publish(activity_body(&self.shared.navigator.current()));
        if live.subscribe() {
            self.set_subscribed(attempt, true);
        }
        if let Some(changes) = changes {
            self.install_navigation_listener(changes);
        }

        loop {
            tokio::select! {
                biased;
                cmd = commands.recv() => match cmd {
                    Some(SessionCommand::Publish(body)) => live.publish(body),
                    Some(SessionCommand::Subscribe) => {
                        if live.subscribe() {
                            self.set_subscribed(attempt, true);
                        }
                    }
                    Some(SessionCommand::Unsubscribe) => live.unsubscribe(),
                    Some(SessionCommand::Disconnect) | None => {
                        live.send(stomp::disconnect_frame());
                        drain(&mut inbound).await;
                        break;
                    }
                },
                frame = inbound.recv() => match frame {
                    Some(frame) => self.handle_inbound(attempt, &live, frame),
                    None => {
                        warn!("Tracker connection closed by peer");
                        break;
                    }
                },
            }
        }
        self.end_session(attempt);
    }

    /// Open the transport and complete the STOMP handshake, retrying with
    /// exponential backoff.
    async fn establish(&self, url: &Url) -> Result<FrameLink, TrackerError> {
        let options = &self.shared.options;
        let attempts = options.reconnect_attempts.max(1);
        let mut backoff = options.reconnect_initial;
        let mut last_error = TrackerError::Closed;

        for n in 1..=attempts {
            match self.handshake(url).await {
                Ok(link) => return Ok(link),
                Err(e) => {
                    warn!("Tracker connect attempt {}/{} failed: {}", n, attempts, e);
                    last_error = e;
                }
            }
            if n < attempts {
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff, options.reconnect_max);
            }
        }

        Err(TrackerError::ConnectFailed {
            attempts,
            reason: last_error.to_string(),
        })
    }

    async fn handshake(&self, url: &Url) -> Result<FrameLink, TrackerError> {
        let mut link = self.shared.connector.open(url).await?;
        link.outbound
            .send(stomp::connect_frame(&handshake_host(url)))
            .map_err(|_| TrackerError::Closed)?;

        let answer = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            loop {
                match link.inbound.recv().await {
                    Some(frame) if frame.command == Command::Connected => return Ok(()),
                    Some(frame) if frame.command == Command::Error => {
                        let message = frame.get_header("message").unwrap_or("ERROR frame");
                        return Err(TrackerError::Handshake(message.to_string()));
                    }
                    Some(frame) => debug!("Ignoring {} before CONNECTED", frame.command),
                    None => return Err(TrackerError::Closed),
                }
            }
        })
        .await
        .map_err(|_| TrackerError::Handshake("timed out waiting for CONNECTED".to_string()))?;

        answer.map(|_| link)
    }

    /// Returns whether this is the first connection since the last
    /// disconnect, or `None` when the attempt has been superseded.
    fn mark_connected(&self, attempt: u64) -> Option<bool> {
        let mut state = self.lock();
        if state.session.as_ref().map(|s| s.attempt) != Some(attempt) {
            return None;
        }
        state.phase = ConnectionState::Connected;
        let first = !state.connected_once;
        state.connected_once = true;
        Some(first)
    }

    fn set_subscribed(&self, attempt: u64, subscribed: bool) {
        let mut state = self.lock();
        if state.session.as_ref().map(|s| s.attempt) == Some(attempt) {
            state.subscribed = subscribed;
        }
    }

    fn end_session(&self, attempt: u64) {
        let mut state = self.lock();
        if state.session.as_ref().map(|s| s.attempt) == Some(attempt) {
            state.session = None;
            state.phase = ConnectionState::Disconnected;
            state.subscribed = false;
        }
    }

    fn install_navigation_listener(&self, mut changes: watch::Receiver<String>) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let listener = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                ConnectionManager { shared }.publish();
            }
        });

        let mut state = self.lock();
        if let Some(previous) = state.nav_listener.replace(listener) {
            previous.abort();
        }
        self.shared.listener_installs.fetch_add(1, Ordering::SeqCst);
        debug!("Navigation listener installed");
    }

    fn handle_inbound(&self, attempt: u64, live: &LiveSession, frame: Frame) {
        match frame.command {
            Command::Message => {
                let subscription = frame.get_header("subscription");
                if subscription.is_none() || subscription != live.subscription.as_deref() {
                    debug!("Ignoring message for subscription {:?}", subscription);
                    return;
                }
                match decode_event(&frame.body) {
                    Ok(event) => {
                        // Held across delivery so a concurrent disconnect
                        // either precedes the check or follows the send.
                        let state = self.lock();
                        if state.session.as_ref().map(|s| s.attempt) == Some(attempt) {
                            self.shared.stream.deliver(event);
                        } else {
                            debug!("Dropping message for closed attempt {}", attempt);
                        }
                    }
                    Err(e) => error!("Malformed tracker message dropped: {}", e),
                }
            }
            Command::Error => {
                error!(
                    "Broker error: {}",
                    frame.get_header("message").unwrap_or(frame.body.as_str())
                );
            }
            other => debug!("Ignoring {} frame", other),
        }
    }
}

/// Frame-level state of an established connection, owned by its task.
struct LiveSession {
    outbound: mpsc::UnboundedSender<Frame>,
    subscription: Option<String>,
    next_subscription: u32,
}

impl LiveSession {
    fn new(outbound: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            outbound,
            subscription: None,
            next_subscription: 0,
        }
    }

    fn send(&self, frame: Frame) {
        if self.outbound.send(frame).is_err() {
            warn!("Tracker transport already closed");
        }
    }

    fn publish(&self, body: String) {
        debug!("Publishing activity {}", body);
        self.send(stomp::send_frame(ACTIVITY_DESTINATION, body));
    }

    /// At most one registration per connection.
    fn subscribe(&mut self) -> bool {
        if self.subscription.is_some() {
            return false;
        }
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;
        self.send(stomp::subscribe_frame(&id, TRACKER_TOPIC));
        self.subscription = Some(id);
        true
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.send(stomp::unsubscribe_frame(&id));
        }
    }
}

fn decode_event(body: &str) -> Result<ActivityEvent, TrackerError> {
    Ok(serde_json::from_str(body)?)
}

/// Wait for the peer to close after DISCONNECT, discarding what it still sends.
async fn drain(inbound: &mut mpsc::UnboundedReceiver<Frame>) {
    let closed = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while let Some(frame) = inbound.recv().await {
            debug!("Discarding {} frame after DISCONNECT", frame.command);
        }
    })
    .await;
    if closed.is_err() {
        warn!("Tracker peer did not close within {:?}", DRAIN_TIMEOUT);
    }
}

fn activity_body(page: &str) -> String {
    serde_json::json!({ "page": page }).to_string()
}

fn without_query(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::credentials::{CredentialStore, SessionStore, AUTH_TOKEN_KEY};
    use crate::tracker::testing::{wait_until, MemoryBroker};
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn manager_with(broker: &MemoryBroker, attempts: u32) -> (ConnectionManager, Arc<SessionStore>) {
        let session = Arc::new(SessionStore::default());
        let credentials = Credentials::new(Arc::new(SessionStore::default()), session.clone());
        let mut options = TrackerOptions::new(Url::parse("http://localhost:8080/").unwrap());
        options.reconnect_initial = Duration::from_millis(100);
        options.reconnect_max = Duration::from_millis(400);
        options.reconnect_attempts = attempts;
        let manager = ConnectionManager::new(
            options,
            Arc::new(broker.clone()),
            credentials,
            Navigator::new("#/home"),
        );
        (manager, session)
    }

    fn pages(broker: &MemoryBroker) -> Vec<String> {
        broker
            .received_of(Command::Send)
            .iter()
            .map(|f| {
                let v: serde_json::Value = serde_json::from_str(&f.body).unwrap();
                v["page"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let max = Duration::from_secs(10);
        assert_eq!(next_backoff(Duration::from_secs(1), max), Duration::from_secs(2));
        assert_eq!(next_backoff(Duration::from_secs(8), max), max);
    }

    #[tokio::test]
    async fn connect_twice_opens_one_connection_and_one_listener() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);

        assert!(manager.connect());
        assert!(!manager.connect());
        manager.await_ready().await.expect("ready");
        assert!(!manager.connect());

        wait_until(|| manager.has_navigation_listener()).await;
        assert_eq!(broker.open_count(), 1);
        assert_eq!(manager.listener_installs(), 1);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn handshake_publishes_before_subscribing() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| broker.subscriber_count() == 1).await;

        let received = broker.received();
        assert_eq!(received[0].command, Command::Send);
        assert_eq!(received[0].destination(), Some(ACTIVITY_DESTINATION));
        assert_eq!(received[1].command, Command::Subscribe);
        assert_eq!(received[1].destination(), Some(TRACKER_TOPIC));
        assert_eq!(pages(&broker), vec!["#/home".to_string()]);
        assert!(manager.is_subscribed());
    }

    #[tokio::test]
    async fn navigation_republishes_activity() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| manager.has_navigation_listener()).await;

        manager.navigator().navigate("#/user-management");
        wait_until(|| pages(&broker).len() == 2).await;
        assert_eq!(pages(&broker)[1], "#/user-management");
    }

    #[tokio::test]
    async fn token_is_passed_as_query_parameter() {
        let broker = MemoryBroker::new();
        let (manager, session) = manager_with(&broker, 1);
        session.set(AUTH_TOKEN_KEY, "jwt-token");
        manager.connect();
        manager.await_ready().await.expect("ready");

        let url = &broker.opened_urls()[0];
        assert_eq!(url.path(), "/websocket/tracker");
        assert_eq!(url.query(), Some("access_token=jwt-token"));
    }

    #[tokio::test]
    async fn inbound_messages_reach_stream_observers() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        let mut observer = manager.stream().attach();
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| broker.subscriber_count() == 1).await;

        broker.broadcast_raw("{not json");
        let event = ActivityEvent::new("s1", "admin", "home");
        broker.broadcast(&event);

        assert_eq!(observer.recv().await.expect("event"), event);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(matches!(decode_event("{not json"), Err(TrackerError::Decode(_))));
        let event = ActivityEvent::new("s1", "admin", "home");
        let body = serde_json::to_string(&event).unwrap();
        assert_eq!(decode_event(&body).unwrap(), event);
    }

    #[tokio::test]
    async fn messages_queued_before_disconnect_are_not_delivered() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        let mut observer = manager.stream().attach();
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| broker.subscriber_count() == 1).await;

        broker.broadcast(&ActivityEvent::new("s1", "admin", "home"));
        manager.disconnect();
        wait_until(|| broker.received_of(Command::Disconnect).len() == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn close_returns_once_disconnect_is_flushed() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");

        manager.close().await;
        assert_eq!(broker.received_of(Command::Disconnect).len(), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        // Nothing left to close.
        manager.close().await;
        assert_eq!(broker.received_of(Command::Disconnect).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn navigation_right_after_ready_is_published() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");

        manager.navigator().navigate("#/metrics");
        wait_until(|| pages(&broker).last().map(String::as_str) == Some("#/metrics")).await;
    }

    #[tokio::test]
    async fn unsubscribe_unregisters_and_resets_stream() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| broker.subscriber_count() == 1).await;

        let mut old = manager.stream().attach();
        manager.unsubscribe();
        assert!(matches!(old.recv().await, Err(RecvError::Closed)));
        wait_until(|| broker.subscriber_count() == 0).await;
        assert_eq!(broker.received_of(Command::Unsubscribe).len(), 1);
        assert!(!manager.is_subscribed());

        // No registration left: a second call sends nothing.
        manager.unsubscribe();
        manager.subscribe();
        wait_until(|| broker.subscriber_count() == 1).await;
        assert_eq!(broker.received_of(Command::Unsubscribe).len(), 1);
        assert_eq!(broker.received_of(Command::Subscribe).len(), 2);
    }

    #[tokio::test]
    async fn disconnect_closes_and_allows_a_fresh_connection() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| manager.has_navigation_listener()).await;

        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.has_navigation_listener());
        wait_until(|| broker.received_of(Command::Disconnect).len() == 1).await;

        // Navigation while disconnected publishes nothing.
        manager.navigator().navigate("#/docs");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pages(&broker).len(), 1);

        assert!(manager.connect());
        manager.await_ready().await.expect("ready");
        wait_until(|| manager.has_navigation_listener()).await;
        assert_eq!(broker.open_count(), 2);
        assert_eq!(manager.listener_installs(), 2);
    }

    #[tokio::test]
    async fn disconnect_without_connection_still_clears_listener_state() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(matches!(manager.await_ready().await, Err(TrackerError::NotConnected)));
        assert_eq!(broker.open_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_abandons_pending_handshake() {
        let broker = MemoryBroker::new();
        broker.hold_handshakes(true);
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        let ready = manager.ready().expect("attempt");
        wait_until(|| broker.open_count() == 1).await;
        assert_eq!(manager.state(), ConnectionState::Connecting);

        manager.disconnect();
        assert!(matches!(ready.wait().await, Err(TrackerError::Closed)));
        broker.accept_pending();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.listener_installs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_backoff_until_the_broker_accepts() {
        let broker = MemoryBroker::new();
        broker.refuse_next(2);
        let (manager, _) = manager_with(&broker, 3);
        manager.connect();
        manager.await_ready().await.expect("ready");
        assert_eq!(broker.open_count(), 3);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_the_ready_signal() {
        let broker = MemoryBroker::new();
        broker.refuse_next(10);
        let (manager, _) = manager_with(&broker, 3);
        manager.connect();
        let ready = manager.ready().expect("attempt");

        match ready.wait().await {
            Err(TrackerError::ConnectFailed { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("unexpected {:?}", other),
        }
        wait_until(|| manager.state() == ConnectionState::Disconnected).await;
        assert_eq!(broker.open_count(), 3);
    }

    #[tokio::test]
    async fn peer_close_returns_to_disconnected_and_keeps_listener() {
        let broker = MemoryBroker::new();
        let (manager, _) = manager_with(&broker, 1);
        manager.connect();
        manager.await_ready().await.expect("ready");
        wait_until(|| manager.has_navigation_listener()).await;

        broker.drop_clients();
        wait_until(|| manager.state() == ConnectionState::Disconnected).await;
        assert!(manager.has_navigation_listener());

        assert!(manager.connect());
        manager.await_ready().await.expect("ready");
        assert_eq!(manager.listener_installs(), 1);
    }
}
