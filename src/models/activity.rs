use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Page value a session reports when it ends.
pub const LOGOUT_PAGE: &str = "logout";

/// One session's current activity as broadcast on the tracker topic
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    /// Identifier of the user owning the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_login: String,
    /// Route fragment, or `logout`
    pub page: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl ActivityEvent {
    pub fn new(session_id: impl Into<String>, user_login: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            id: None,
            user_login: user_login.into(),
            page: page.into(),
            session_id: session_id.into(),
            ip_address: None,
            time: None,
        }
    }

    pub fn is_logout(&self) -> bool {
        self.page == LOGOUT_PAGE
    }
}

/// Body the tracker sends to the activity destination
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActivityPayload {
    pub page: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_record_with_camel_case_names() {
        let body = r#"{"id":1,"userLogin":"admin","page":"home","sessionId":"abc123"}"#;
        let event: ActivityEvent = serde_json::from_str(body).expect("event");
        assert_eq!(event.id, Some(1));
        assert_eq!(event.user_login, "admin");
        assert_eq!(event.session_id, "abc123");
        assert!(event.ip_address.is_none());
        assert!(!event.is_logout());
    }

    #[test]
    fn omits_absent_optional_fields() {
        let event = ActivityEvent::new("s1", "admin", LOGOUT_PAGE);
        let json = serde_json::to_string(&event).expect("json");
        assert_eq!(json, r#"{"userLogin":"admin","page":"logout","sessionId":"s1"}"#);
        assert!(event.is_logout());
    }
}
