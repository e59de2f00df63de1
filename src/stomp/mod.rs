//! STOMP 1.2 framing shared by the tracker client and the hub broker.

pub mod frame;

pub use frame::{is_heartbeat, Command, Frame, FrameError};

pub const STOMP_VERSION: &str = "1.2";

/// Destination the tracker publishes its own navigation to.
pub const ACTIVITY_DESTINATION: &str = "/topic/activity";

/// Broadcast topic carrying every session's activity.
pub const TRACKER_TOPIC: &str = "/topic/tracker";

pub fn connect_frame(host: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", STOMP_VERSION)
        .header("host", host)
        .header("heart-beat", "0,0")
}

pub fn connected_frame(session: &str) -> Frame {
    Frame::new(Command::Connected)
        .header("version", STOMP_VERSION)
        .header("session", session)
        .header("heart-beat", "0,0")
}

pub fn send_frame(destination: &str, body: impl Into<String>) -> Frame {
    Frame::new(Command::Send)
        .header("destination", destination)
        .header("content-type", "application/json")
        .with_body(body)
}

pub fn subscribe_frame(id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
}

pub fn unsubscribe_frame(id: &str) -> Frame {
    Frame::new(Command::Unsubscribe).header("id", id)
}

pub fn message_frame(destination: &str, subscription: &str, message_id: u64, body: impl Into<String>) -> Frame {
    Frame::new(Command::Message)
        .header("destination", destination)
        .header("subscription", subscription)
        .header("message-id", message_id.to_string())
        .header("content-type", "application/json")
        .with_body(body)
}

pub fn receipt_frame(receipt_id: &str) -> Frame {
    Frame::new(Command::Receipt).header("receipt-id", receipt_id)
}

pub fn error_frame(message: &str) -> Frame {
    Frame::new(Command::Error).header("message", message)
}

pub fn disconnect_frame() -> Frame {
    Frame::new(Command::Disconnect)
}
