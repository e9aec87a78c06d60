use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::ChatEvent;

/// Execution status of a tool-call segment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// The invocation started and its outcome is not yet known.
    Running,
    /// The invocation finished.
    Completed,
}

/// Ordered element of a transcript: a text run or a tool-call segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    /// Assistant text, accumulated token by token while streaming.
    Text { content: String, is_streaming: bool },
    /// One tool invocation, correlated by `call_id`.
    Tool {
        tool_name: String,
        call_id: String,
        status: ToolStatus,
        is_streaming: bool,
    },
}

impl Part {
    fn stop_streaming(&mut self) {
        match self {
            Self::Text { is_streaming, .. } | Self::Tool { is_streaming, .. } => {
                *is_streaming = false;
            }
        }
    }
}

/// One chat message: interleaved text and tool-call segments, ordered by
/// arrival.
///
/// While a response streams, the owning send task mutates the message in
/// place; once sealed it is an immutable snapshot safe to share with any
/// number of readers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: uuid::Uuid,
    /// Conversation thread this message belongs to.
    pub thread_id: String,
    pub is_user: bool,
    pub parts: Vec<Part>,
    /// Set when the send ended in a terminal failure or an abnormal close.
    pub failed: bool,
    pub error: Option<String>,
}

impl ChatMessage {
    /// Creates an empty assistant message for one send.
    pub fn assistant(thread_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            thread_id: thread_id.into(),
            is_user: false,
            parts: Vec::new(),
            failed: false,
            error: None,
        }
    }

    /// Creates a sealed user message holding one text part.
    pub fn user(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            thread_id: thread_id.into(),
            is_user: true,
            parts: vec![Part::Text {
                content: text.into(),
                is_streaming: false,
            }],
            failed: false,
            error: None,
        }
    }

    /// Concatenates all text parts in order, ignoring tool parts.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let Part::Text { content, .. } = part {
                out.push_str(content);
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TranscriptState {
    Open,
    Sealed,
}

/// State machine folding the ordered event sequence into a `ChatMessage`.
///
/// The reducer is the sole writer of the message it owns. It is driven
/// synchronously, one event at a time, and is never re-entrant.
pub struct TranscriptReducer {
    message: ChatMessage,
    state: TranscriptState,
}

impl TranscriptReducer {
    /// Creates a reducer owning a fresh open transcript.
    pub fn new(message: ChatMessage) -> Self {
        Self {
            message,
            state: TranscriptState::Open,
        }
    }

    /// True once a terminal event or an abnormal close sealed the transcript.
    pub fn is_sealed(&self) -> bool {
        self.state == TranscriptState::Sealed
    }

    /// Current view of the transcript being built.
    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    /// Consumes the reducer, returning the message in its final state.
    pub fn into_message(self) -> ChatMessage {
        self.message
    }

    /// Applies one event in arrival order.
    pub fn apply(&mut self, event: ChatEvent) {
        if self.is_sealed() {
            debug!(?event, "ignoring event applied after transcript seal");
            return;
        }
        match event {
            ChatEvent::Token { chunk } => self.apply_token(chunk),
            ChatEvent::ToolStart { call_id, tool_name } => self.apply_tool_start(call_id, tool_name),
            ChatEvent::ToolEnd { call_id, tool_name } => self.apply_tool_end(call_id, tool_name),
            ChatEvent::Done { final_text } => self.apply_done(final_text),
            ChatEvent::Error { message } => self.seal_failed(message),
        }
    }

    /// Seals the transcript after the stream ended with no terminal event.
    ///
    /// Treated identically to an `error` event with a fixed message. Calling
    /// this on an already sealed transcript is a no-op.
    pub fn seal_abnormal(&mut self) {
        if !self.is_sealed() {
            self.seal_failed("stream ended unexpectedly".to_string());
        }
    }

    fn apply_token(&mut self, chunk: String) {
        if let Some(Part::Text {
            content,
            is_streaming: true,
        }) = self.message.parts.last_mut()
        {
            content.push_str(&chunk);
            return;
        }
        self.stop_trailing_stream();
        self.message.parts.push(Part::Text {
            content: chunk,
            is_streaming: true,
        });
    }

    fn apply_tool_start(&mut self, call_id: String, tool_name: String) {
        self.stop_trailing_stream();
        self.message.parts.push(Part::Tool {
            tool_name,
            call_id,
            status: ToolStatus::Running,
            is_streaming: true,
        });
    }

    fn apply_tool_end(&mut self, call_id: String, tool_name: String) {
        for part in self.message.parts.iter_mut() {
            if let Part::Tool {
                call_id: id,
                status,
                is_streaming,
                ..
            } = part
                && *id == call_id
                && *status == ToolStatus::Running
            {
                *status = ToolStatus::Completed;
                *is_streaming = false;
                return;
            }
        }
        warn!(%call_id, %tool_name, "tool_end without a matching running tool part, ignoring");
    }

    fn apply_done(&mut self, final_text: String) {
        if self.message.text() != final_text {
            // The terminal text is authoritative; replace the trailing text
            // run since the last tool part.
            while matches!(self.message.parts.last(), Some(Part::Text { .. })) {
                self.message.parts.pop();
            }
            self.message.parts.push(Part::Text {
                content: final_text,
                is_streaming: false,
            });
        }
        self.seal_parts();
        self.state = TranscriptState::Sealed;
    }

    fn seal_failed(&mut self, message: String) {
        // Running tool parts stay Running: their outcome is unknown.
        self.seal_parts();
        self.message.failed = true;
        self.message.error = Some(message);
        self.state = TranscriptState::Sealed;
    }

    fn seal_parts(&mut self) {
        for part in self.message.parts.iter_mut() {
            part.stop_streaming();
        }
    }

    // At most one trailing part may be streaming while the message is open.
    fn stop_trailing_stream(&mut self) {
        if let Some(part) = self.message.parts.last_mut() {
            part.stop_streaming();
        }
    }
}
