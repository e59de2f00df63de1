use crate::{
    config,
    models::{
        AuditEvent, EnvResponse, ErrorResponse, HealthDetails, Logger, ManagementHealth, MetricsResponse,
        PropertySource,
    },
    ws::{hubctx::HubState, principal},
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::{debug, error, info};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

type ErrorReply = (StatusCode, Json<ErrorResponse>);

/// Hub health with its tracker connection counts
pub async fn management_health(
    State(hub): State<Arc<HubState>>,
) -> Result<(StatusCode, Json<ManagementHealth>), ErrorReply> {
    debug!("Management health requested");
    Ok((
        StatusCode::OK,
        Json(ManagementHealth {
            status: "UP".to_string(),
            details: HealthDetails {
                tracker_connections: hub.connection_count(),
                tracker_subscribers: hub.subscription_count(),
                tracker_sessions: hub.connections(),
            },
        }),
    ))
}

/// Process and hub metrics
pub async fn management_metrics(
    State(hub): State<Arc<HubState>>,
) -> Result<(StatusCode, Json<MetricsResponse>), ErrorReply> {

    let n_conn = hub.connection_count();
    let n_subscriptions = hub.subscription_count();
    let n_user_ctx = principal::get_principal_cache().entry_count() as u32;
    let n_audits = hub.audits.len() as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Metrics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Subs: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_subscriptions
    );

    Ok((
        StatusCode::OK,
        Json(MetricsResponse {
            n_conn,
            n_subscriptions,
            n_user_ctx,
            n_audits,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
            uptime_secs: hub.uptime_secs(),
        }),
    ))
}

/// Loggers from the configured level and `RUST_LOG` directives
pub async fn management_logs() -> Result<(StatusCode, Json<Vec<Logger>>), ErrorReply> {
    let config = config::get_config();
    let directives = std::env::var("RUST_LOG").unwrap_or_default();
    Ok((StatusCode::OK, Json(loggers_from(&config.log_level, &directives))))
}

pub(crate) fn loggers_from(root_level: &str, directives: &str) -> Vec<Logger> {
    let mut loggers = vec![Logger {
        name: "ROOT".to_string(),
        level: root_level.to_uppercase(),
    }];
    for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        match directive.split_once('=') {
            Some((target, level)) => loggers.push(Logger {
                name: target.to_string(),
                level: level.to_uppercase(),
            }),
            // a bare level sets the root
            None => loggers[0].level = directive.to_uppercase(),
        }
    }
    loggers
}

/// Active profile and process environment, secrets masked
pub async fn management_env() -> Result<(StatusCode, Json<EnvResponse>), ErrorReply> {
    let config = config::get_config();
    let env = std::env::vars().collect::<Vec<_>>();
    Ok((
        StatusCode::OK,
        Json(EnvResponse {
            active_profiles: vec![config.environment.clone()],
            property_sources: vec![PropertySource {
                name: "systemEnvironment".to_string(),
                properties: mask_environment(env),
            }],
        }),
    ))
}

pub(crate) fn mask_environment(vars: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, String> {
    const SENSITIVE: [&str; 5] = ["SECRET", "TOKEN", "PASSWORD", "KEY", "CREDENTIAL"];
    vars.into_iter()
        .map(|(name, value)| {
            let upper = name.to_uppercase();
            if SENSITIVE.iter().any(|s| upper.contains(s)) {
                (name, "******".to_string())
            } else {
                (name, value)
            }
        })
        .collect()
}

/// Running configuration with secrets redacted
pub async fn management_configprops() -> Result<(StatusCode, Json<Value>), ErrorReply> {
    let redacted = config::get_config().redacted();
    match serde_json::to_value(&redacted) {
        Ok(value) => Ok((StatusCode::OK, Json(value))),
        Err(e) => {
            error!("Failed to serialize configuration: {}", e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize configuration"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_audit_page_size")]
    pub size: usize,
}

fn default_audit_page_size() -> usize {
    20
}

/// Page of the audit trail, newest first, total count in `X-Total-Count`
pub async fn management_audits(
    State(hub): State<Arc<HubState>>,
    Query(query): Query<AuditQuery>,
) -> Result<(StatusCode, HeaderMap, Json<Vec<AuditEvent>>), ErrorReply> {
    if query.size == 0 {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Page size must be positive"));
    }

    let (audits, total) = hub.audits.page(query.page, query.size);
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(TOTAL_COUNT_HEADER), HeaderValue::from(total));
    Ok((StatusCode::OK, headers, Json(audits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::audit::TRACKER_CONNECT;
    use crate::models::TrackerConnection;

    #[tokio::test]
    async fn health_reports_tracker_connections() {
        let hub = Arc::new(HubState::new(10));
        let connected_at = chrono::Utc::now();
        hub.register("s1", TrackerConnection {
            login: "admin".to_string(),
            ip_address: Some("192.168.1.20".to_string()),
            subscriptions: 1,
            connected_at,
        });

        let (status, Json(health)) = management_health(State(hub)).await.ok().expect("health");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "UP");
        assert_eq!(health.details.tracker_connections, 1);
        assert_eq!(health.details.tracker_subscribers, 1);

        let body = serde_json::to_value(&health).expect("json");
        let session = &body["details"]["trackerSessions"][0];
        assert_eq!(session["login"], "admin");
        assert_eq!(session["ipAddress"], "192.168.1.20");
        assert_eq!(session["connectedAt"], serde_json::to_value(connected_at).expect("json"));
    }

    #[tokio::test]
    async fn audits_are_paged_with_total_count() {
        let hub = Arc::new(HubState::new(10));
        for login in ["a", "b", "c"] {
            hub.audits.record(login, TRACKER_CONNECT, BTreeMap::new());
        }

        let query = AuditQuery { page: 0, size: 2 };
        let (_, headers, Json(audits)) = management_audits(State(hub.clone()), Query(query)).await.ok().expect("audits");
        assert_eq!(headers.get(TOTAL_COUNT_HEADER).and_then(|v| v.to_str().ok()), Some("3"));
        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].principal, "c");

        let empty = AuditQuery { page: 0, size: 0 };
        let err = management_audits(State(hub), Query(empty)).await.err().expect("bad request");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn logger_directives_are_listed() {
        let loggers = loggers_from("info", "activity_tracker=debug,tower_http=trace,warn");
        assert_eq!(loggers[0], Logger { name: "ROOT".to_string(), level: "WARN".to_string() });
        assert_eq!(loggers[1], Logger { name: "activity_tracker".to_string(), level: "DEBUG".to_string() });
        assert_eq!(loggers.len(), 3);
    }

    #[test]
    fn sensitive_environment_is_masked() {
        let env = mask_environment(vec![
            ("AUTH_JWT_SECRET".to_string(), "s3cret".to_string()),
            ("ACCESS_TOKEN".to_string(), "abc".to_string()),
            ("PORT".to_string(), "8080".to_string()),
        ]);
        assert_eq!(env["AUTH_JWT_SECRET"], "******");
        assert_eq!(env["ACCESS_TOKEN"], "******");
        assert_eq!(env["PORT"], "8080");
    }

    #[tokio::test]
    async fn configprops_hides_secrets() {
        let (_, Json(value)) = management_configprops().await.ok().expect("config");
        assert!(value.get("port").is_some());
        assert!(value.get("auth_jwt_secret").map_or(true, |s| s.is_null() || s == "******"));
    }
}
