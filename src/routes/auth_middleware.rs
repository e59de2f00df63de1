use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info};
use crate::config;
use crate::ws::principal::{resolve_principal, Principal};
use crate::services::auth_service::get_auth_token;

/// Management endpoints require an admin principal once a JWT secret is
/// configured. Without a secret every caller passes as anonymous.
pub async fn auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    let config = config::get_config();
    let principal = authorize(get_auth_token(&req), config.auth_jwt_secret.as_deref())?;

    // Make the principal available to downstream handlers
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

pub(crate) fn authorize(token: Result<String, String>, secret: Option<&str>) -> Result<Principal, StatusCode> {
    // 1. No secret, nothing to check
    let Some(secret) = secret else {
        debug!("No JWT secret configured, management access is open");
        return Ok(Principal::anonymous());
    };

    // 2. Token must be present
    let token = token.map_err(|e| {
        error!("Missing management token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 3. Validate and resolve the principal
    let principal = resolve_principal(Some(&token), Some(secret)).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // 4. Only admins see management data
    if !principal.is_admin() {
        error!("Principal {} is not an admin", principal.login);
        return Err(StatusCode::FORBIDDEN);
    }
    info!("Management access granted to {}", principal.login);
    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::tests::{admin_claims, signed_token};
    use serde_json::json;

    #[test]
    fn open_without_secret() {
        let principal = authorize(Err("missing".to_string()), None).expect("open");
        assert_eq!(principal, Principal::anonymous());
    }

    #[test]
    fn admin_token_is_required_with_secret() {
        assert_eq!(authorize(Err("missing".to_string()), Some("mgmt")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(authorize(Ok("garbage".to_string()), Some("mgmt")), Err(StatusCode::UNAUTHORIZED));

        let user = signed_token("mgmt", json!({
            "sub": "user",
            "auth": "ROLE_USER",
            "exp": chrono::Utc::now().timestamp() + 3600,
        }));
        assert_eq!(authorize(Ok(user), Some("mgmt")), Err(StatusCode::FORBIDDEN));

        let admin = signed_token("mgmt", admin_claims());
        assert_eq!(authorize(Ok(admin), Some("mgmt")).expect("admin").login, "admin");
    }
}
