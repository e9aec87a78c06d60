/// Failure reported by the underlying chat engine for one invocation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The engine itself failed (model error, tool crash, refusal).
    #[error("engine failure: {message}")]
    Engine { message: String },
    /// The invocation exceeded its time budget.
    #[error("engine timeout: {message}")]
    Timeout { message: String },
}

impl EngineError {
    /// Creates an engine-level failure.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Creates a timeout failure.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the public chat client API.
///
/// Failures inside an established stream never surface here: they seal the
/// transcript with its failure flag instead, and the caller reads the flag.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client/transport configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input to `send`.
    #[error("validation error: {0}")]
    Validation(String),
    /// A send is already streaming on this thread.
    #[error("send already in flight for thread {thread_id}")]
    SendInFlight { thread_id: String },
    /// Connecting to or reading from the chat endpoint failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Internal wiring failed or an invariant was violated.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl ChatError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
