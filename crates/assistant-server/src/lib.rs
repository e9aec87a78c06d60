//! HTTP surface for the mealflow chat assistant.
//!
//! Exposes one streaming chat endpoint per conversation thread: a user
//! message goes in, and the engine's lifecycle events come back as framed
//! wire records over a long-lived response. The encoder preserves event
//! order exactly, writes exactly one terminal record per send, and aborts
//! the engine invocation when the client disconnects.

/// Environment-driven server configuration.
pub mod config;
/// HTTP error responses.
pub mod error;
/// Router and streaming chat handler.
pub mod routes;
/// Demo engine replaying a fixed meal-plan scenario.
pub mod scripted;
/// Encoder task bridging engine events onto the response channel.
pub mod stream;

pub use config::ServerConfig;
pub use error::AppError;
pub use routes::{AppState, build_router};
pub use scripted::ScriptedEngine;
pub use stream::encode_engine_stream;
