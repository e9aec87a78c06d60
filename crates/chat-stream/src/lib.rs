//! Streaming transport and message assembly for the mealflow chat assistant.
//!
//! The assistant server streams model/tool lifecycle events as framed
//! `event:`/`data:` records over a long-lived HTTP response. Network chunk
//! boundaries never align with record boundaries, so this crate reassembles
//! the byte stream into typed events and folds them into an ordered chat
//! transcript while the response is still arriving.
//!
//! # Streaming a send
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mealflow_chat_stream::prelude::*;
//! use mealflow_chat_stream::transport::{HttpChatTransport, HttpTransportConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let transport = HttpChatTransport::new(HttpTransportConfig::new("http://127.0.0.1:8787"))?;
//! let client = ChatClient::new(Arc::new(transport));
//! let session = client.session("week-32");
//!
//! let mut send = session.send("What's for dinner tonight?")?;
//! while let Some(event) = send.next_event().await {
//!     if let ChatEvent::Token { chunk } = event {
//!         print!("{chunk}");
//!     }
//! }
//! let message = send.finish().await?;
//! println!("\nassistant reply: {}", message.text());
//! # Ok(())
//! # }
//! ```

/// Engine contract consumed by the producer side.
pub mod engine;
/// Public error types used by the chat API.
pub mod errors;
/// Typed stream events and the wire-record decoder.
pub mod event;
/// Common imports for typical usage.
pub mod prelude;
/// Session controller: per-thread sends, live transcripts, cancellation.
pub mod session;
/// Transcript parts and the event reducer.
pub mod transcript;
/// Transport seam opening one streaming response per send.
pub mod transport;
/// Wire-record framing and the incremental frame parser.
pub mod wire;

pub use engine::{ChatEngine, EngineEvent, EngineRequest, EngineStream};
pub use errors::{ChatError, EngineError};
pub use event::{ChatEvent, decode_record};
pub use session::{AbortHandle, ChatClient, ChatSession, SendHandle, SessionOptions};
pub use transcript::{ChatMessage, Part, ToolStatus, TranscriptReducer};
pub use transport::{ByteStream, HttpChatTransport, HttpTransportConfig, StreamTransport};
pub use wire::{FrameDecoder, WireRecord};
