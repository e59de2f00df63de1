use tracing::{info, warn};

use super::session::TrackerSession;
use crate::stomp::{error_frame, Frame, TRACKER_TOPIC};
use crate::ws::hubctx::HubState;

/// Handle SUBSCRIBE
pub async fn handle_subscribe_message(frame: &Frame, session: &TrackerSession, hub: &HubState) {
    let (Some(id), Some(destination)) = (frame.get_header("id"), frame.destination()) else {
        session.send_frame(&error_frame("SUBSCRIBE requires id and destination")).await;
        return;
    };

    if destination != TRACKER_TOPIC {
        warn!("Session {} tried to subscribe to {}", session.session_id, destination);
        session
            .send_frame(&error_frame(&format!("Unknown destination {}", destination)))
            .await;
        return;
    }

    let count = session.subscribe(id, destination);
    hub.set_subscriptions(&session.session_id, count);
    info!("Session {} subscribed to {} as {}", session.session_id, destination, id);
}

/// Handle UNSUBSCRIBE
pub async fn handle_unsubscribe_message(frame: &Frame, session: &TrackerSession, hub: &HubState) {
    let Some(id) = frame.get_header("id") else {
        session.send_frame(&error_frame("UNSUBSCRIBE requires id")).await;
        return;
    };

    match session.unsubscribe(id) {
        Some(count) => {
            hub.set_subscriptions(&session.session_id, count);
            info!("Session {} unsubscribed {}", session.session_id, id);
        }
        None => warn!("Session {} unsubscribed unknown id {}", session.session_id, id),
    }
}
