use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde_json::Value;

use crate::ws::principal::Principal;

/// Name of the cookie carrying the token when no Authorization header is sent.
pub const AUTH_COOKIE: &str = "auth_token";

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = req.headers().get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == AUTH_COOKIE {
                return Ok(cookie.value().to_string());
            }
        }
        Err(format!("{} cookie not found", AUTH_COOKIE))
    }
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Value>(token, &decoding_key, &validation)
}

// Build the principal from validated claims: `sub` is the login, `auth` the
// comma separated authorities and `uid` the optional numeric user id.
pub fn principal_from_claims(claims: &Value) -> Result<Principal, String> {
    let login = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Can't extract a login from the JWT token".to_string())?;

    let authorities = match claims.get("auth") {
        Some(Value::String(auth)) => auth
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(auth)) => auth
            .iter()
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    Ok(Principal {
        login: login.to_string(),
        id: claims.get("uid").and_then(|v| v.as_i64()),
        authorities,
    })
}
