use moka::sync::Cache;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::services::auth_service::{principal_from_claims, validate_jwt};

pub const ADMIN_AUTHORITY: &str = "ROLE_ADMIN";
pub const ANONYMOUS_LOGIN: &str = "anonymoususer";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub login: String,
    pub id: Option<i64>,
    pub authorities: Vec<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            login: ANONYMOUS_LOGIN.to_string(),
            id: None,
            authorities: Vec::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.authorities.iter().any(|a| a == ADMIN_AUTHORITY)
    }
}

/// Last principal resolved for each login
static PRINCIPAL_CACHE: OnceLock<Cache<String, Principal>> = OnceLock::new();

pub fn init_principal_cache() {
    get_principal_cache();
    info!("Principal cache initialized");
}

pub fn get_principal_cache() -> &'static Cache<String, Principal> {
    PRINCIPAL_CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(Duration::from_secs(5 * 60))
            .build()
    })
}

/// Resolve who is behind `token`.
///
/// No token means an anonymous principal, and so does a missing secret, since
/// authenticating the bus is left to the token issuer. A token that fails
/// validation is an error. Every token is validated, even for a login that is
/// already cached, so expiry and signature are checked on each connect.
pub fn resolve_principal(token: Option<&str>, secret: Option<&str>) -> Result<Principal, String> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(Principal::anonymous());
    };
    let Some(secret) = secret else {
        debug!("No JWT secret configured, treating tracker client as anonymous");
        return Ok(Principal::anonymous());
    };

    let token_data = validate_jwt(token, secret).map_err(|e| {
        error!("JWT validation failed: {}", e);
        format!("JWT validation failed: {}", e)
    })?;
    let principal = principal_from_claims(&token_data.claims)?;

    let cache = get_principal_cache();
    if cache.get(&principal.login).as_ref() != Some(&principal) {
        info!("Resolved principal {} from token", principal.login);
        cache.insert(principal.login.clone(), principal.clone());
    }
    Ok(principal)
}
