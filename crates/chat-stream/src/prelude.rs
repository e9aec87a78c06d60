//! Common imports for typical chat-stream usage.
//!
//! This module intentionally exports the most frequently used client/runtime
//! types so examples and application code need fewer import lines.
pub use crate::{
    AbortHandle, ChatClient, ChatError, ChatEvent, ChatMessage, ChatSession, Part, SendHandle,
    SessionOptions, ToolStatus,
};
