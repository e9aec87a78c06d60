use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;

use crate::errors::ChatError;

/// Raw byte stream of one chat response.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ChatError>> + Send + 'static>>;

/// Opens one streaming chat response per send.
///
/// Streams are not restartable; every send opens a fresh one.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Posts the user message and returns the live response byte stream.
    async fn open(&self, thread_id: &str, message: &str) -> Result<ByteStream, ChatError>;
}

/// Configuration for the HTTP chat transport.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Base URL of the assistant server.
    pub base_url: String,
    /// Timeout for establishing the connection. The response body is
    /// long-lived and deliberately not bounded by a total request timeout.
    pub connect_timeout: Duration,
}

impl HttpTransportConfig {
    /// Creates a config with defaults for a given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn chat_url(&self, thread_id: &str) -> String {
        format!(
            "{}/api/threads/{}/chat",
            self.base_url.trim_end_matches('/'),
            thread_id
        )
    }
}

/// `StreamTransport` backed by a reqwest client posting to the assistant
/// server's streaming chat endpoint.
#[derive(Debug)]
pub struct HttpChatTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpChatTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ChatError> {
        if config.base_url.trim().is_empty() {
            return Err(ChatError::Config(
                "transport base_url must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpChatTransport {
    async fn open(&self, thread_id: &str, message: &str) -> Result<ByteStream, ChatError> {
        let response = self
            .client
            .post(self.config.chat_url(thread_id))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ChatError::transport(format!(
                "chat request failed with status {status}: {body}"
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| ChatError::transport(format!("chat stream read failed: {e}"))));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_joins_base_and_thread() {
        let config = HttpTransportConfig::new("http://127.0.0.1:8787/");
        assert_eq!(
            config.chat_url("week-32"),
            "http://127.0.0.1:8787/api/threads/week-32/chat"
        );
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = HttpChatTransport::new(HttpTransportConfig::new("  ")).unwrap_err();
        assert!(matches!(err, ChatError::Config(msg) if msg.contains("base_url")));
    }
}
