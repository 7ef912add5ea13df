//! Request handlers.

pub mod chat;
pub mod health;
pub mod quiz;
pub mod videos;

pub use chat::*;
pub use health::*;
pub use quiz::*;
pub use videos::*;
