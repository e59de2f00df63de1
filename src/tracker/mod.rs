//! Client side of the activity tracker: one message-bus connection that
//! publishes this session's navigation and streams everyone else's.

pub mod connection;
pub mod credentials;
pub mod endpoint;
pub mod navigation;
pub mod ready;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ConnectionManager, TrackerOptions};
pub use credentials::{CredentialStore, Credentials, FileStore, SessionStore, AUTH_TOKEN_KEY};
pub use navigation::Navigator;
pub use transport::WsConnector;
