use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::wire::WireRecord;

/// Decoded, strongly typed representation of one wire record.
///
/// Everything downstream of the decoder matches exhaustively on this enum;
/// no payload shape-sniffing happens past the stream boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Content fragment belonging to the assistant's running reply.
    Token { chunk: String },
    /// A tool invocation started. `call_id` is minted by the producer and is
    /// unique per invocation, even for repeated calls to the same tool.
    ToolStart { call_id: String, tool_name: String },
    /// A tool invocation finished, echoing the originating `call_id`.
    ToolEnd { call_id: String, tool_name: String },
    /// Terminal success carrying the engine's fully resolved reply text.
    Done { final_text: String },
    /// Terminal failure.
    Error { message: String },
}

#[derive(Serialize, Deserialize)]
struct TokenPayload {
    chunk: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolPayload {
    name: String,
    call_id: String,
}

#[derive(Serialize, Deserialize)]
struct DonePayload {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorPayload {
    message: String,
}

impl ChatEvent {
    /// Returns true for the terminal `Done`/`Error` events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Serializes the event as a wire record.
    pub fn to_record(&self) -> WireRecord {
        let (event, data) = match self {
            Self::Token { chunk } => (
                "token",
                to_json(&TokenPayload {
                    chunk: chunk.clone(),
                }),
            ),
            Self::ToolStart { call_id, tool_name } => (
                "tool_call",
                to_json(&ToolPayload {
                    name: tool_name.clone(),
                    call_id: call_id.clone(),
                }),
            ),
            Self::ToolEnd { call_id, tool_name } => (
                "tool_end",
                to_json(&ToolPayload {
                    name: tool_name.clone(),
                    call_id: call_id.clone(),
                }),
            ),
            Self::Done { final_text } => (
                "done",
                to_json(&DonePayload {
                    text: final_text.clone(),
                }),
            ),
            Self::Error { message } => (
                "error",
                to_json(&ErrorPayload {
                    message: message.clone(),
                }),
            ),
        };
        WireRecord::new(event, data)
    }
}

fn to_json<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).expect("event payload serialization should be infallible")
}

/// Maps a wire record to a typed event.
///
/// Unknown event names and payloads that fail validation yield `None` with a
/// diagnostic; decoding never terminates the stream.
pub fn decode_record(record: &WireRecord) -> Option<ChatEvent> {
    match record.event.as_str() {
        "token" => parse_payload::<TokenPayload>(record).map(|p| ChatEvent::Token { chunk: p.chunk }),
        "tool_call" => parse_payload::<ToolPayload>(record).map(|p| ChatEvent::ToolStart {
            call_id: p.call_id,
            tool_name: p.name,
        }),
        "tool_end" => parse_payload::<ToolPayload>(record).map(|p| ChatEvent::ToolEnd {
            call_id: p.call_id,
            tool_name: p.name,
        }),
        "done" => parse_payload::<DonePayload>(record).map(|p| ChatEvent::Done { final_text: p.text }),
        "error" => parse_payload::<ErrorPayload>(record).map(|p| ChatEvent::Error { message: p.message }),
        other => {
            warn!(event = other, "skipping unrecognized stream event");
            None
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(record: &WireRecord) -> Option<T> {
    match serde_json::from_str(&record.data) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(event = %record.event, error = %e, "skipping stream event with invalid payload");
            None
        }
    }
}
