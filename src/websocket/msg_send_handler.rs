use tracing::{debug, error};

use super::session::TrackerSession;
use crate::models::ActivityPayload;
use crate::stomp::{error_frame, Frame, ACTIVITY_DESTINATION};
use crate::ws::hubctx::HubState;

/// Handle SEND: an activity report becomes a tracker broadcast
pub async fn handle_send_message(frame: &Frame, session: &TrackerSession, hub: &HubState) {
    let destination = frame.destination().unwrap_or_default();
    if destination != ACTIVITY_DESTINATION {
        session
            .send_frame(&error_frame(&format!("Unknown destination {}", destination)))
            .await;
        return;
    }

    let payload: ActivityPayload = match serde_json::from_str(&frame.body) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Invalid activity from session {}: {}", session.session_id, e);
            session.send_frame(&error_frame("Invalid activity payload")).await;
            return;
        }
    };

    let receivers = hub.broadcast(session.activity(&payload.page));
    debug!(
        "Activity {} of session {} sent to {} receivers",
        payload.page, session.session_id, receivers
    );
}
