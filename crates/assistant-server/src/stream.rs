//! Producer-side encoder: one engine invocation onto one response channel.

use futures::StreamExt as _;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mealflow_chat_stream::engine::{EngineEvent, EngineStream};
use mealflow_chat_stream::event::ChatEvent;
use mealflow_chat_stream::wire::WireRecord;

/// Serializes one engine invocation's events as wire records.
///
/// Records are written in arrival order with no batching, and exactly one
/// terminal record is written; the channel closes when this task returns. A
/// failed channel send means the client disconnected: the engine stream is
/// dropped, cancelling the invocation upstream rather than running it to
/// completion wastefully.
pub async fn encode_engine_stream(mut events: EngineStream, tx: mpsc::Sender<WireRecord>) {
    while let Some(item) = events.next().await {
        let event = match item {
            Ok(EngineEvent::TextDelta { text }) => ChatEvent::Token { chunk: text },
            Ok(EngineEvent::ToolStarted { tool_name, call_id }) => {
                ChatEvent::ToolStart { call_id, tool_name }
            }
            Ok(EngineEvent::ToolFinished { tool_name, call_id }) => {
                ChatEvent::ToolEnd { call_id, tool_name }
            }
            Ok(EngineEvent::Completed { final_text }) => ChatEvent::Done { final_text },
            Err(err) => ChatEvent::Error {
                message: err.to_string(),
            },
        };
        let terminal = event.is_terminal();
        if tx.send(event.to_record()).await.is_err() {
            debug!("chat client disconnected, aborting engine invocation");
            return;
        }
        if terminal {
            return;
        }
    }

    warn!("engine stream ended without a terminal event");
    let _ = tx
        .send(
            ChatEvent::Error {
                message: "engine stream ended without completion".into(),
            }
            .to_record(),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use mealflow_chat_stream::errors::EngineError;
    use tokio_stream::wrappers::ReceiverStream;

    fn ok_events(events: Vec<EngineEvent>) -> EngineStream {
        stream::iter(events.into_iter().map(Ok)).boxed()
    }

    async fn collect_records(events: EngineStream) -> Vec<WireRecord> {
        let (tx, mut rx) = mpsc::channel(32);
        encode_engine_stream(events, tx).await;
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn writes_records_in_order_with_one_terminal() {
        let records = collect_records(ok_events(vec![
            EngineEvent::ToolStarted {
                tool_name: "read_plan".into(),
                call_id: "c1".into(),
            },
            EngineEvent::ToolFinished {
                tool_name: "read_plan".into(),
                call_id: "c1".into(),
            },
            EngineEvent::TextDelta { text: "hi".into() },
            EngineEvent::Completed {
                final_text: "hi".into(),
            },
        ]))
        .await;

        let names: Vec<&str> = records.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(names, vec!["tool_call", "tool_end", "token", "done"]);
    }

    #[tokio::test]
    async fn stops_at_the_first_terminal_event() {
        let records = collect_records(ok_events(vec![
            EngineEvent::Completed {
                final_text: "done".into(),
            },
            // Anything after the terminal must not be written.
            EngineEvent::TextDelta {
                text: "late".into(),
            },
        ]))
        .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, "done");
    }

    #[tokio::test]
    async fn engine_error_becomes_a_terminal_error_record() {
        let events = stream::iter(vec![
            Ok(EngineEvent::TextDelta { text: "a".into() }),
            Err(EngineError::engine("tool crashed")),
        ])
        .boxed();

        let records = collect_records(events).await;
        let names: Vec<&str> = records.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(names, vec!["token", "error"]);
        assert!(records[1].data.contains("tool crashed"));
    }

    #[tokio::test]
    async fn missing_terminal_is_synthesized_as_error() {
        let records =
            collect_records(ok_events(vec![EngineEvent::TextDelta { text: "a".into() }])).await;
        let names: Vec<&str> = records.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(names, vec!["token", "error"]);
    }

    #[tokio::test]
    async fn client_disconnect_drops_the_engine_stream() {
        let (engine_tx, engine_rx) = mpsc::channel::<Result<EngineEvent, EngineError>>(8);
        let events = ReceiverStream::new(engine_rx).boxed();

        let (tx, rx) = mpsc::channel(1);
        let encoder = tokio::spawn(encode_engine_stream(events, tx));

        // Simulate a disconnect: no receiver for the response channel.
        drop(rx);
        engine_tx
            .send(Ok(EngineEvent::TextDelta { text: "a".into() }))
            .await
            .expect("engine stream still alive");

        encoder.await.expect("encoder task");
        // The encoder dropped its stream, so the engine side is now closed.
        assert!(
            engine_tx
                .send(Ok(EngineEvent::TextDelta { text: "b".into() }))
                .await
                .is_err()
        );
    }
}
