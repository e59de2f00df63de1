use url::Url;

use crate::error::TrackerError;

/// Sub-path of the tracker endpoint, relative to the application base path.
pub const TRACKER_PATH: &str = "websocket/tracker";

/// Build the tracker web socket URL from the application origin.
///
/// The base path is the directory part of the origin path, so a context path
/// such as `/admin/` is preserved. `http` maps to `ws` and `https` to `wss`.
pub fn tracker_url(origin: &Url, token: Option<&str>) -> Result<Url, TrackerError> {
    if origin.host_str().is_none() {
        return Err(TrackerError::Endpoint(format!("origin '{}' has no host", origin)));
    }
    let scheme = match origin.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TrackerError::Endpoint(format!("unsupported scheme '{}'", other)));
        }
    };

    let mut url = origin.clone();
    url.set_scheme(scheme)
        .map_err(|_| TrackerError::Endpoint(format!("cannot use scheme '{}' for '{}'", scheme, origin)))?;

    let path = origin.path();
    let base = match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    };
    url.set_path(&format!("{}{}", base, TRACKER_PATH));
    url.set_query(None);
    url.set_fragment(None);

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("access_token", token);
    }
    Ok(url)
}

/// Value of the STOMP `host` header for a tracker URL.
pub fn handshake_host(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}
