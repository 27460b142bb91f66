//! Request handlers.

pub mod generation;
pub mod hardware;
pub mod health;
pub mod models;
pub mod videos;

pub use generation::*;
pub use hardware::*;
pub use health::*;
pub use models::*;
pub use videos::*;
