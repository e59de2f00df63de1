//! Interactive admin console: drives one tracker session from stdin and logs
//! the live activity dashboard.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::admin::{Action, AdministrationState, Middleware, SessionMiddleware, Store, TrackerState};
use crate::clients::ManagementClient;
use crate::config::Config;
use crate::error::TrackerError;
use crate::tracker::{
    ConnectionManager, CredentialStore, Credentials, FileStore, Navigator, SessionStore, TrackerOptions,
    WsConnector, AUTH_TOKEN_KEY,
};

pub async fn run(config: &Config) -> Result<(), TrackerError> {
    let options = TrackerOptions::from_config(config)?;

    let session = Arc::new(SessionStore::default());
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
        session.set(AUTH_TOKEN_KEY, token);
    }
    let credentials = Credentials::new(Arc::new(FileStore::open(&config.token_file)), session);

    let navigator = Navigator::new("#/");
    let manager = ConnectionManager::new(options, Arc::new(WsConnector), credentials.clone(), navigator.clone());
    let store = Store::new(vec![Arc::new(SessionMiddleware::new(manager.clone())) as Arc<dyn Middleware>]);
    let view = tokio::spawn(log_tracker_view(store.subscribe()));

    match ManagementClient::from_config(config, credentials.token()) {
        Ok(client) => {
            client.load_all(&store).await;
            if let Some(message) = store.state().error_message {
                warn!("Management data incomplete: {}", message);
            }
        }
        Err(e) => warn!("Management API unavailable: {}", e),
    }

    store.dispatch(Action::SessionEstablished);
    if let Err(e) = manager.await_ready().await {
        error!("Tracker connection failed: {}", e);
        store.dispatch(Action::SessionEnded);
        view.abort();
        return Err(e);
    }
    info!("Tracking as {}, type a page name to navigate, EOF to leave", navigator.current());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(page) = page_for(&line) {
                        navigator.navigate(page);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    manager.unsubscribe();
    manager.close().await;
    store.dispatch(Action::SessionEnded);
    view.abort();
    Ok(())
}

/// Route fragment for a typed line, `None` for blank input.
pub(crate) fn page_for(line: &str) -> Option<String> {
    let page = line.trim();
    if page.is_empty() {
        return None;
    }
    let page = page.strip_prefix('#').unwrap_or(page);
    let page = page.strip_prefix('/').unwrap_or(page);
    Some(format!("#/{}", page))
}

async fn log_tracker_view(mut view: watch::Receiver<AdministrationState>) {
    let mut last = TrackerState::default();
    while view.changed().await.is_ok() {
        let tracker = view.borrow_and_update().tracker.clone();
        if tracker != last {
            info!("{}", describe(&tracker));
            last = tracker;
        }
    }
}

pub(crate) fn describe(tracker: &TrackerState) -> String {
    if tracker.activities.is_empty() {
        return "No active sessions".to_string();
    }
    let sessions = tracker
        .activities
        .iter()
        .map(|a| format!("{} on {} ({})", a.user_login, a.page, a.session_id))
        .collect::<Vec<_>>();
    format!("{} active session(s): {}", sessions.len(), sessions.join(", "))
}
