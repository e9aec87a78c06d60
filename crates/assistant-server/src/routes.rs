use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt as _};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use mealflow_chat_stream::engine::{ChatEngine, EngineEvent, EngineRequest};

use crate::error::AppError;
use crate::stream::encode_engine_stream;

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    /// The chat/tool-calling engine answering sends.
    pub engine: Arc<dyn ChatEngine>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

/// Builds the assistant router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/threads/{thread_id}/chat", post(chat_stream))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Accepts a user message and streams the assistant reply as wire records
/// over a long-lived response, one send per connection.
async fn chat_stream(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".into()));
    }
    info!(thread_id = %thread_id, "starting chat stream");

    let request = EngineRequest {
        thread_id,
        message: req.message,
    };
    let events = match state.engine.run(request).await {
        Ok(events) => events,
        // Startup failures still travel the stream as a terminal error record.
        Err(err) => futures::stream::iter([Err::<EngineEvent, _>(err)]).boxed(),
    };

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(encode_engine_stream(events, tx));

    let stream = ReceiverStream::new(rx)
        .map(|record| Ok(Event::default().event(record.event).data(record.data)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
