use futures::stream::BoxStream;

use crate::errors::EngineError;

/// Abstract lifecycle events emitted by the underlying chat engine during one
/// invocation.
///
/// The engine mints a unique `call_id` for every tool invocation and echoes
/// it when the invocation finishes; repeated calls to the same tool carry
/// distinct ids.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineEvent {
    /// Incremental fragment of the assistant reply.
    TextDelta { text: String },
    /// A tool invocation started.
    ToolStarted { tool_name: String, call_id: String },
    /// A tool invocation finished.
    ToolFinished { tool_name: String, call_id: String },
    /// Terminal event carrying the fully resolved reply text.
    Completed { final_text: String },
}

/// Event stream for one engine invocation.
///
/// Dropping the stream cancels the invocation; the encoder relies on this
/// when the client disconnects mid-response.
pub type EngineStream = BoxStream<'static, Result<EngineEvent, EngineError>>;

/// One engine invocation request.
#[derive(Clone, Debug)]
pub struct EngineRequest {
    /// Conversation thread the reply belongs to.
    pub thread_id: String,
    /// The user's message text.
    pub message: String,
}

/// Contract for the chat/tool-calling engine behind the streaming endpoint.
///
/// The engine is consumed, not reimplemented, here: it must notify content
/// fragments, tool start/end, and exactly one terminal outcome per
/// invocation.
#[async_trait::async_trait]
pub trait ChatEngine: Send + Sync {
    /// Starts one invocation and returns its live event stream.
    async fn run(&self, request: EngineRequest) -> Result<EngineStream, EngineError>;
}
