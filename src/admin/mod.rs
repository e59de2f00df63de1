//! Administration view model: actions, the reducer folding them, and the
//! store that runs middleware in front of it.

pub mod action;
pub mod middleware;
pub mod reducer;
pub mod state;
pub mod store;

pub use action::{Action, FetchKind, FetchPayload};
pub use middleware::SessionMiddleware;
pub use state::{AdministrationState, TrackerState};
pub use store::{Middleware, Store};
