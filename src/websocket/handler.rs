use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{ConnectInfo, Query, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config;
use crate::models::{ErrorResponse, TrackerConnection};
use crate::stomp::{error_frame, is_heartbeat, message_frame, receipt_frame, Command, Frame, TRACKER_TOPIC};
use crate::websocket::msg_connect_handler::handle_connect_message;
use crate::websocket::msg_send_handler::handle_send_message;
use crate::websocket::msg_subscribe_handler::{handle_subscribe_message, handle_unsubscribe_message};
use crate::websocket::session::{SessionGuard, TrackerSession};
use crate::ws::audit::TRACKER_CONNECT;
use crate::ws::hubctx::HubState;
use crate::ws::principal::{resolve_principal, Principal};

#[derive(Debug, Deserialize)]
pub struct TrackerParams {
    pub access_token: Option<String>,
}

/// Tracker web socket endpoint
pub async fn tracker_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<TrackerParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(hub): State<Arc<HubState>>,
) -> Response {
    info!("New tracker connection attempt from {}", addr);

    let config = config::get_config();
    let principal = match resolve_principal(params.access_token.as_deref(), config.auth_jwt_secret.as_deref()) {
        Ok(principal) => principal,
        Err(e) => {
            error!("Rejecting tracker connection from {}: {}", addr, e);
            return ErrorResponse::reply(StatusCode::UNAUTHORIZED, e).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, principal, Some(addr.ip().to_string()), hub))
}

/// Handle one tracker connection
async fn handle_socket(socket: WebSocket, principal: Principal, ip_address: Option<String>, hub: Arc<HubState>) {

    let session_id = Uuid::new_v4().to_string();
    let (sender, mut receiver) = socket.split();
    let session = Arc::new(TrackerSession::new(
        session_id.clone(),
        principal,
        ip_address,
        Arc::new(tokio::sync::Mutex::new(sender)),
    ));

    hub.register(&session_id, TrackerConnection {
        login: session.principal.login.clone(),
        ip_address: session.ip_address.clone(),
        subscriptions: 0,
        connected_at: Utc::now(),
    });
    hub.audits.record(&session.principal.login, TRACKER_CONNECT, session.audit_data());
    info!("Tracker connection {} established for {}", session_id, session.principal.login);

    // Whatever ends the connection, the session is announced as logged out
    let _logout = SessionGuard::new(hub.clone(), session.clone());

    let mut rbc = hub.tracker.subscribe();

    // Read STOMP frames from the client
    let recv_session = session.clone();
    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        let session = recv_session;
        let mut connected = false;

        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            if is_heartbeat(&text) {
                continue;
            }

            let frame = match Frame::decode(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to decode frame from session {}: {}", session.session_id, e);
                    session.send_frame(&error_frame(&e.to_string())).await;
                    continue;
                }
            };
            debug!("Session {} sent {}", session.session_id, frame.command);

            match frame.command {
                Command::Connect | Command::Stomp => {
                    connected = handle_connect_message(&frame, &session).await;
                    if !connected {
                        break;
                    }
                }
                _ if !connected => {
                    session.send_frame(&error_frame("CONNECT expected")).await;
                    break;
                }
                Command::Subscribe => handle_subscribe_message(&frame, &session, &recv_hub).await,
                Command::Unsubscribe => handle_unsubscribe_message(&frame, &session, &recv_hub).await,
                Command::Send => handle_send_message(&frame, &session, &recv_hub).await,
                Command::Disconnect => {
                    if let Some(receipt) = frame.get_header("receipt") {
                        session.send_frame(&receipt_frame(receipt)).await;
                    }
                    break;
                }
                other => {
                    session
                        .send_frame(&error_frame(&format!("Unexpected {} frame", other)))
                        .await;
                }
            }
        }
    });

    // Relay tracker broadcasts to this client's subscriptions
    let send_session = session.clone();
    let mut send_task = tokio::spawn(async move {
        let session = send_session;
        loop {
            let event = match rbc.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Session {} lagged, {} activities skipped", session.session_id, skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let subscriptions = session.subscriptions_to(TRACKER_TOPIC);
            if subscriptions.is_empty() {
                continue;
            }
            let body = match serde_json::to_string(&event) {
                Ok(body) => body,
                Err(e) => {
                    error!("Failed to serialize activity: {}", e);
                    continue;
                }
            };
            for subscription in subscriptions {
                let frame = message_frame(TRACKER_TOPIC, &subscription, session.next_message_id(), body.clone());
                if !session.send_frame(&frame).await {
                    return;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut recv_task) => send_task.abort(),
        _ = (&mut send_task) => recv_task.abort(),
    };
    session.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityEvent;
    use crate::routes::create_tracker_routes;
    use crate::tracker::testing::wait_until;
    use crate::ws::audit::TRACKER_DISCONNECT;
    use crate::tracker::{ConnectionManager, Credentials, Navigator, SessionStore, TrackerOptions, WsConnector};
    use futures_util::SinkExt;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{connect_async, tungstenite};
    use url::Url;

    async fn serve_hub() -> (Url, Arc<HubState>) {
        let hub = Arc::new(HubState::new(100));
        let app = create_tracker_routes(hub.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("serve");
        });
        (Url::parse(&format!("http://{}/", addr)).expect("url"), hub)
    }

    fn manager(origin: &Url) -> ConnectionManager {
        ConnectionManager::new(
            TrackerOptions::new(origin.clone()),
            Arc::new(WsConnector),
            Credentials::new(Arc::new(SessionStore::default()), Arc::new(SessionStore::default())),
            Navigator::new("#/"),
        )
    }

    async fn next_matching<F: Fn(&ActivityEvent) -> bool>(
        rx: &mut tokio::sync::broadcast::Receiver<ActivityEvent>,
        matches: F,
    ) -> ActivityEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.expect("activity");
                if matches(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("activity in time")
    }

    async fn next_text(
        ws: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    ) -> Frame {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame in time")
            .expect("open")
            .expect("message");
        Frame::decode(msg.to_text().expect("text")).expect("frame")
    }

    #[tokio::test]
    async fn activity_is_relayed_and_logout_follows_disconnect() {
        let (origin, hub) = serve_hub().await;

        let watcher = manager(&origin);
        let mut events = watcher.stream().attach();
        watcher.connect();
        watcher.await_ready().await.expect("watcher ready");
        wait_until(|| hub.subscription_count() == 1).await;

        let visitor = manager(&origin);
        visitor.connect();
        visitor.await_ready().await.expect("visitor ready");
        wait_until(|| hub.subscription_count() == 2).await;

        visitor.navigator().navigate("#/metrics");
        let seen = next_matching(&mut events, |e| e.page == "#/metrics").await;
        assert_eq!(seen.user_login, "anonymoususer");
        assert_eq!(seen.ip_address.as_deref(), Some("127.0.0.1"));
        assert!(seen.time.is_some());
        assert!(!seen.session_id.is_empty());

        visitor.disconnect();
        let gone = next_matching(&mut events, |e| e.is_logout()).await;
        assert_eq!(gone.session_id, seen.session_id);

        wait_until(|| hub.connection_count() == 1).await;
        let (audits, _) = hub.audits.page(0, 10);
        assert_eq!(audits[0].event_type, TRACKER_DISCONNECT);
        assert_eq!(audits[0].data.get("sessionId"), Some(&seen.session_id));
    }

    #[tokio::test]
    async fn protocol_errors_are_reported() {
        let (origin, hub) = serve_hub().await;
        let url = crate::tracker::endpoint::tracker_url(&origin, None).expect("url");
        let (mut ws, _) = connect_async(url.as_str()).await.expect("ws");

        ws.send(tungstenite::Message::text(crate::stomp::connect_frame("localhost").encode()))
            .await
            .expect("send");
        assert_eq!(next_text(&mut ws).await.command, Command::Connected);

        ws.send(tungstenite::Message::text(crate::stomp::subscribe_frame("sub-0", "/topic/other").encode()))
            .await
            .expect("send");
        assert_eq!(next_text(&mut ws).await.command, Command::Error);
        assert_eq!(hub.subscription_count(), 0);

        ws.send(tungstenite::Message::text(crate::stomp::send_frame("/topic/activity", "not json").encode()))
            .await
            .expect("send");
        assert_eq!(next_text(&mut ws).await.command, Command::Error);

        let disconnect = crate::stomp::disconnect_frame().header("receipt", "bye");
        ws.send(tungstenite::Message::text(disconnect.encode())).await.expect("send");
        let receipt = next_text(&mut ws).await;
        assert_eq!(receipt.command, Command::Receipt);
        assert_eq!(receipt.get_header("receipt-id"), Some("bye"));

        wait_until(|| hub.connection_count() == 0).await;
    }

    #[tokio::test]
    async fn frames_before_connect_close_the_session() {
        let (origin, hub) = serve_hub().await;
        let url = crate::tracker::endpoint::tracker_url(&origin, None).expect("url");
        let (mut ws, _) = connect_async(url.as_str()).await.expect("ws");

        ws.send(tungstenite::Message::text(crate::stomp::subscribe_frame("sub-0", TRACKER_TOPIC).encode()))
            .await
            .expect("send");
        let error = next_text(&mut ws).await;
        assert_eq!(error.command, Command::Error);
        assert_eq!(error.get_header("message"), Some("CONNECT expected"));

        wait_until(|| hub.connection_count() == 0).await;
        assert_eq!(hub.audits.len(), 2);
    }
}
