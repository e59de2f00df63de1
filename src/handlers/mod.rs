pub mod health;
pub mod management;

pub use health::*;
pub use management::*;
