pub mod handler;
pub mod msg_connect_handler;
pub mod msg_send_handler;
pub mod msg_subscribe_handler;
pub mod session;

pub use handler::tracker_handler;
