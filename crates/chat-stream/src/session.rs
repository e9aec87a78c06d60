use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::errors::ChatError;
use crate::event::{ChatEvent, decode_record};
use crate::transcript::{ChatMessage, TranscriptReducer};
use crate::transport::StreamTransport;
use crate::wire::FrameDecoder;

/// Handle used to request cancellation of an in-flight send.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The send task stops reading the transport and seals the transcript
    /// via the abnormal-close rule. Aborting an already sealed send is a
    /// no-op.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Options for sends started from a session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Bounded event buffer size between the send task and the consumer.
    pub event_buffer_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            event_buffer_capacity: 128,
        }
    }
}

/// Entry point for per-thread chat sessions over one transport.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn StreamTransport>,
    options: SessionOptions,
}

impl ChatClient {
    /// Creates a client over the given transport.
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            options: SessionOptions::default(),
        }
    }

    /// Overrides options for sessions created afterwards.
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates the session for one conversation thread.
    ///
    /// Sessions are explicit values owned by the caller; there is no
    /// process-wide conversation state.
    pub fn session(&self, thread_id: impl Into<String>) -> ChatSession {
        ChatSession {
            transport: self.transport.clone(),
            thread_id: thread_id.into(),
            options: self.options.clone(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Controller for one conversation thread.
///
/// At most one send may be streaming at a time; a second `send` while one is
/// active is rejected with `ChatError::SendInFlight`. The slot frees once
/// the active send's transcript is sealed.
pub struct ChatSession {
    transport: Arc<dyn StreamTransport>,
    thread_id: String,
    options: SessionOptions,
    active: Arc<AtomicBool>,
}

impl ChatSession {
    /// Thread this session belongs to.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Starts one send and returns its streaming handle.
    ///
    /// Must be called from within a tokio runtime: the send is driven by a
    /// spawned task that owns the transcript until it seals.
    pub fn send(&self, text: impl Into<String>) -> Result<SendHandle, ChatError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::Validation(
                "message text must not be empty".into(),
            ));
        }
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::SendInFlight {
                thread_id: self.thread_id.clone(),
            });
        }

        let message = ChatMessage::assistant(&self.thread_id);
        let message_id = message.id;
        let (events_tx, events_rx) = mpsc::channel(self.options.event_buffer_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(message.clone());
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);
        let abort = AbortHandle { tx: abort_tx };

        tokio::spawn(run_send(SendTask {
            transport: self.transport.clone(),
            thread_id: self.thread_id.clone(),
            text,
            reducer: TranscriptReducer::new(message),
            events_tx,
            snapshot_tx,
            final_tx,
            abort_rx,
            active: ActiveGuard(self.active.clone()),
        }));

        Ok(SendHandle {
            thread_id: self.thread_id.clone(),
            message_id,
            rx: events_rx,
            snapshot_rx,
            final_rx,
            abort,
            saw_terminal: false,
        })
    }
}

/// Streaming handle for one send.
///
/// `next_event()` yields decoded events as they arrive; the sequence is
/// finite and ends after a terminal event or an abnormal close. `finish()`
/// returns the sealed message.
#[derive(Debug)]
pub struct SendHandle {
    thread_id: String,
    message_id: uuid::Uuid,
    rx: mpsc::Receiver<ChatEvent>,
    snapshot_rx: watch::Receiver<ChatMessage>,
    final_rx: oneshot::Receiver<ChatMessage>,
    abort: AbortHandle,
    saw_terminal: bool,
}

impl SendHandle {
    /// Id of the assistant message being assembled.
    pub fn message_id(&self) -> uuid::Uuid {
        self.message_id
    }

    /// Thread this send belongs to.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Returns a handle that cancels this send.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Watch channel carrying the evolving message.
    ///
    /// A fresh snapshot is published after every applied event and once more
    /// when the transcript seals.
    pub fn subscribe(&self) -> watch::Receiver<ChatMessage> {
        self.snapshot_rx.clone()
    }

    /// Waits for and returns the next decoded event.
    ///
    /// Returns `None` once the stream closed.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        let event = self.rx.recv().await;
        if matches!(&event, Some(e) if e.is_terminal()) {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the sealed message.
    ///
    /// Safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<ChatMessage, ChatError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }
        match self.final_rx.await {
            Ok(message) => Ok(message),
            Err(_) => Err(ChatError::protocol(format!(
                "send task ended without a sealed message (thread={})",
                self.thread_id
            ))),
        }
    }
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct SendTask {
    transport: Arc<dyn StreamTransport>,
    thread_id: String,
    text: String,
    reducer: TranscriptReducer,
    events_tx: mpsc::Sender<ChatEvent>,
    snapshot_tx: watch::Sender<ChatMessage>,
    final_tx: oneshot::Sender<ChatMessage>,
    abort_rx: watch::Receiver<bool>,
    active: ActiveGuard,
}

async fn run_send(task: SendTask) {
    let SendTask {
        transport,
        thread_id,
        text,
        mut reducer,
        events_tx,
        snapshot_tx,
        final_tx,
        mut abort_rx,
        active,
    } = task;

    let mut stream = tokio::select! {
        _ = wait_abort(&mut abort_rx) => {
            debug!(thread_id = %thread_id, "send aborted before the stream opened");
            reducer.seal_abnormal();
            finish_send(reducer, &snapshot_tx, final_tx, active);
            return;
        }
        opened = transport.open(&thread_id, &text) => match opened {
            Ok(stream) => stream,
            Err(err) => {
                debug!(thread_id = %thread_id, error = %err, "chat stream failed to open");
                reducer.apply(ChatEvent::Error {
                    message: err.to_string(),
                });
                finish_send(reducer, &snapshot_tx, final_tx, active);
                return;
            }
        }
    };

    let mut frames = FrameDecoder::default();
    'read: loop {
        tokio::select! {
            _ = wait_abort(&mut abort_rx) => {
                debug!(thread_id = %thread_id, "send aborted mid-stream");
                reducer.seal_abnormal();
                break 'read;
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for record in frames.push_chunk(&bytes) {
                        let Some(event) = decode_record(&record) else {
                            continue;
                        };
                        let terminal = event.is_terminal();
                        let delivered =
                            forward_and_apply(event, &mut reducer, &events_tx, &snapshot_tx).await;
                        if terminal {
                            break 'read;
                        }
                        if !delivered {
                            debug!(thread_id = %thread_id, "event receiver dropped, cancelling send");
                            reducer.seal_abnormal();
                            break 'read;
                        }
                    }
                }
                Some(Err(err)) => {
                    debug!(thread_id = %thread_id, error = %err, "chat stream read failed");
                    reducer.apply(ChatEvent::Error {
                        message: err.to_string(),
                    });
                    break 'read;
                }
                None => {
                    // Short read at end of stream: an undelimited trailing
                    // record is still applied.
                    let mut saw_terminal = false;
                    if let Some(record) = std::mem::take(&mut frames).finish()
                        && let Some(event) = decode_record(&record)
                    {
                        saw_terminal = event.is_terminal();
                        let _ = forward_and_apply(event, &mut reducer, &events_tx, &snapshot_tx)
                            .await;
                    }
                    if !saw_terminal {
                        reducer.seal_abnormal();
                    }
                    break 'read;
                }
            }
        }
    }

    finish_send(reducer, &snapshot_tx, final_tx, active);
}

async fn wait_abort(abort_rx: &mut watch::Receiver<bool>) {
    loop {
        if *abort_rx.borrow() {
            return;
        }
        if abort_rx.changed().await.is_err() {
            // Every abort handle is gone; cancellation can no longer arrive.
            std::future::pending::<()>().await;
        }
    }
}

async fn forward_and_apply(
    event: ChatEvent,
    reducer: &mut TranscriptReducer,
    events_tx: &mpsc::Sender<ChatEvent>,
    snapshot_tx: &watch::Sender<ChatMessage>,
) -> bool {
    let delivered = events_tx.send(event.clone()).await.is_ok();
    reducer.apply(event);
    let _ = snapshot_tx.send(reducer.message().clone());
    delivered
}

fn finish_send(
    reducer: TranscriptReducer,
    snapshot_tx: &watch::Sender<ChatMessage>,
    final_tx: oneshot::Sender<ChatMessage>,
    active: ActiveGuard,
) {
    // Free the session's send slot before the sealed message is delivered.
    drop(active);
    let message = reducer.into_message();
    let _ = snapshot_tx.send(message.clone());
    let _ = final_tx.send(message);
}
