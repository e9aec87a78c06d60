use std::sync::Arc;

use mealflow_chat_stream::prelude::*;
use mealflow_chat_stream::transport::{HttpChatTransport, HttpTransportConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ChatError> {
    let base_url = std::env::var("MEALFLOW_BASE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8787".to_string());
    let transport = HttpChatTransport::new(HttpTransportConfig::new(base_url))?;
    let client = ChatClient::new(Arc::new(transport));
    let session = client.session("demo");

    let mut send = session.send("Show my plan for this week")?;
    while let Some(event) = send.next_event().await {
        match event {
            ChatEvent::Token { chunk } => print!("{chunk}"),
            ChatEvent::ToolStart { tool_name, .. } => eprintln!("[tool started: {tool_name}]"),
            ChatEvent::ToolEnd { tool_name, .. } => eprintln!("[tool finished: {tool_name}]"),
            ChatEvent::Done { .. } => println!(),
            ChatEvent::Error { message } => eprintln!("stream error: {message}"),
        }
    }

    let message = send.finish().await?;
    eprintln!("final transcript has {} part(s)", message.parts.len());
    Ok(())
}
