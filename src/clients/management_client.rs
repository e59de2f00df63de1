use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

use crate::admin::{Action, FetchKind, FetchPayload, Store};
use crate::config::Config;
use crate::models::{AuditEvent, Logger};

/// Page size requested for the audit trail.
pub const AUDITS_PAGE_SIZE: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ManagementError {
    #[error("invalid management url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// Fetches the administration slices from the hub's management API.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ManagementClient {
    /// `base_url` is the application origin; endpoints resolve relative to
    /// its directory.
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> Result<Self, ManagementError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self, ManagementError> {
        Self::new(
            Url::parse(&config.tracker_origin)?,
            token,
            Duration::from_secs(config.management_timeout_secs),
        )
    }

    fn path(kind: FetchKind) -> String {
        match kind {
            FetchKind::GatewayRoutes => "api/gateway/routes".to_string(),
            FetchKind::Logs => "management/logs".to_string(),
            FetchKind::Health => "management/health".to_string(),
            FetchKind::Metrics => "management/metrics".to_string(),
            FetchKind::ThreadDump => "management/threaddump".to_string(),
            FetchKind::Configurations => "management/configprops".to_string(),
            FetchKind::Env => "management/env".to_string(),
            FetchKind::Audits => format!("management/audits?page=0&size={}", AUDITS_PAGE_SIZE),
        }
    }

    async fn get(&self, kind: FetchKind) -> Result<Response, ManagementError> {
        let url = self.base_url.join(&Self::path(kind))?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?.error_for_status()?)
    }

    /// Fetch one slice.
    pub async fn fetch(&self, kind: FetchKind) -> Result<FetchPayload, ManagementError> {
        let response = self.get(kind).await?;
        let payload = match kind {
            FetchKind::GatewayRoutes => FetchPayload::GatewayRoutes(response.json::<Vec<Value>>().await?),
            FetchKind::Logs => FetchPayload::Logs(response.json::<Vec<Logger>>().await?),
            FetchKind::Health => FetchPayload::Health(response.json::<Value>().await?),
            FetchKind::Metrics => FetchPayload::Metrics(response.json::<Value>().await?),
            FetchKind::ThreadDump => FetchPayload::ThreadDump(response.json::<Vec<Value>>().await?),
            FetchKind::Configurations => FetchPayload::Configurations(response.json::<Value>().await?),
            FetchKind::Env => FetchPayload::Env(response.json::<Value>().await?),
            FetchKind::Audits => {
                let total = response
                    .headers()
                    .get("x-total-count")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                let audits = response.json::<Vec<AuditEvent>>().await?;
                FetchPayload::Audits {
                    total_items: total.unwrap_or(audits.len() as u64),
                    audits,
                }
            }
        };
        Ok(payload)
    }

    /// Fetch one slice into the store: pending, then fulfilled or rejected.
    pub async fn load(&self, kind: FetchKind, store: &Store) {
        store.dispatch(Action::Request(kind));
        match self.fetch(kind).await {
            Ok(payload) => store.dispatch(Action::Success(payload)),
            Err(e) => {
                error!("{} failed: {}", kind, e);
                store.dispatch(Action::Failure(kind, e.to_string()));
            }
        }
    }

    pub async fn load_all(&self, store: &Store) {
        for kind in FetchKind::ALL {
            self.load(kind, store).await;
        }
        info!("Administration slices loaded from {}", self.base_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::create_app_routes;
    use crate::ws::audit::TRACKER_CONNECT;
    use crate::ws::hubctx::HubState;
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn serve_hub() -> (Url, Arc<HubState>) {
        let hub = Arc::new(HubState::new(100));
        let app = create_app_routes(hub.clone(), &Config::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("serve");
        });
        (Url::parse(&format!("http://{}/", addr)).expect("url"), hub)
    }

    fn client(origin: Url) -> ManagementClient {
        ManagementClient::new(origin, None, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn health_and_logs_are_loaded_into_the_store() {
        let (origin, _hub) = serve_hub().await;
        let client = client(origin);
        let store = Store::new(Vec::new());

        client.load(FetchKind::Health, &store).await;
        let state = store.state();
        assert!(!state.loading);
        assert_eq!(state.error_message, None);
        assert_eq!(state.health["status"], "UP");

        client.load(FetchKind::Logs, &store).await;
        assert_eq!(store.state().logs.loggers[0].name, "ROOT");

        client.load(FetchKind::Configurations, &store).await;
        assert!(store.state().configuration.config_props.get("port").is_some());
    }

    #[tokio::test]
    async fn audits_carry_the_total_count() {
        let (origin, hub) = serve_hub().await;
        for i in 0..25 {
            hub.audits.record(&format!("user{}", i), TRACKER_CONNECT, BTreeMap::new());
        }
        let store = Store::new(Vec::new());

        client(origin).load(FetchKind::Audits, &store).await;
        let state = store.state();
        assert_eq!(state.total_items, 25);
        assert_eq!(state.audits.len(), AUDITS_PAGE_SIZE);
        assert_eq!(state.audits[0].principal, "user24");
    }

    #[tokio::test]
    async fn missing_endpoint_is_rejected() {
        let (origin, _hub) = serve_hub().await;
        let store = Store::new(Vec::new());

        client(origin).load(FetchKind::ThreadDump, &store).await;
        let state = store.state();
        assert!(!state.loading);
        assert!(state.error_message.as_deref().is_some_and(|m| m.contains("404")));
        assert!(state.thread_dump.is_empty());
    }

    #[test]
    fn endpoints_resolve_against_the_origin_directory() {
        let base = Url::parse("http://localhost:8080/admin/index.html").expect("url");
        let url = base.join(&ManagementClient::path(FetchKind::Env)).expect("join");
        assert_eq!(url.as_str(), "http://localhost:8080/admin/management/env");
    }
}
