pub mod activity;
pub mod health;
pub mod management;
pub mod error;

pub use activity::*;
pub use health::*;
pub use management::*;
pub use error::*;
