//! Hub-side state: the connection registry, resolved principals and the
//! audit trail.

pub mod audit;
pub mod hubctx;
pub mod principal;
