use tracing::info;

use super::session::TrackerSession;
use crate::stomp::{connected_frame, error_frame, Frame, STOMP_VERSION};

/// Handle CONNECT / STOMP, returns whether the session is now connected
pub async fn handle_connect_message(frame: &Frame, session: &TrackerSession) -> bool {
    let accepts_version = frame
        .get_header("accept-version")
        .map(|versions| versions.split(',').any(|v| v.trim() == STOMP_VERSION))
        .unwrap_or(true);

    if !accepts_version {
        session
            .send_frame(&error_frame(&format!("Supported protocol version is {}", STOMP_VERSION)))
            .await;
        return false;
    }

    info!("Tracker session {} connected as {}", session.session_id, session.principal.login);
    session.send_frame(&connected_frame(&session.session_id)).await
}
