use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use mealflow_assistant_server::config::{self, ServerConfig};
use mealflow_assistant_server::routes::{AppState, build_router};
use mealflow_assistant_server::scripted::ScriptedEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    config::init_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let state = AppState {
        engine: Arc::new(ScriptedEngine::default()),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "assistant server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
