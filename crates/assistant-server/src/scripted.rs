use std::time::Duration;

use futures::StreamExt as _;

use mealflow_chat_stream::engine::{ChatEngine, EngineEvent, EngineRequest, EngineStream};
use mealflow_chat_stream::errors::EngineError;

/// Deterministic demo engine that replays a meal-plan lookup.
///
/// Stands in for the real tool-calling engine so the streaming surface can
/// be exercised end to end. Every invocation mints a fresh tool call id, as
/// the engine contract requires.
pub struct ScriptedEngine {
    /// Delay between replayed events, for lifelike streaming.
    pub event_delay: Duration,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            event_delay: Duration::from_millis(40),
        }
    }
}

#[async_trait::async_trait]
impl ChatEngine for ScriptedEngine {
    async fn run(&self, _request: EngineRequest) -> Result<EngineStream, EngineError> {
        let call_id = uuid::Uuid::new_v4().to_string();
        let fragments = [
            "Here is your meal plan: ",
            "oats for breakfast, lentil soup for lunch, ",
            "salmon with greens for dinner.",
        ];
        let final_text: String = fragments.concat();

        let mut events = vec![
            EngineEvent::ToolStarted {
                tool_name: "read_plan".into(),
                call_id: call_id.clone(),
            },
            EngineEvent::ToolFinished {
                tool_name: "read_plan".into(),
                call_id,
            },
        ];
        events.extend(fragments.iter().map(|f| EngineEvent::TextDelta {
            text: (*f).to_string(),
        }));
        events.push(EngineEvent::Completed { final_text });

        let delay = self.event_delay;
        let stream = futures::stream::iter(events.into_iter().map(Ok)).then(move |event| async move {
            tokio::time::sleep(delay).await;
            event
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mints_a_fresh_call_id_per_invocation() {
        let engine = ScriptedEngine {
            event_delay: Duration::from_millis(0),
        };
        let request = EngineRequest {
            thread_id: "t".into(),
            message: "Show my plan".into(),
        };

        let mut ids = Vec::new();
        for _ in 0..2 {
            let mut stream = engine.run(request.clone()).await.expect("run");
            while let Some(Ok(event)) = stream.next().await {
                if let EngineEvent::ToolStarted { call_id, .. } = event {
                    ids.push(call_id);
                }
            }
        }
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn ends_with_a_completed_event() {
        let engine = ScriptedEngine {
            event_delay: Duration::from_millis(0),
        };
        let mut stream = engine
            .run(EngineRequest {
                thread_id: "t".into(),
                message: "hi".into(),
            })
            .await
            .expect("run");

        let mut last = None;
        while let Some(item) = stream.next().await {
            last = Some(item.expect("scripted events never fail"));
        }
        assert!(matches!(last, Some(EngineEvent::Completed { .. })));
    }
}
