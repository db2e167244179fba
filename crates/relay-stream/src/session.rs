use async_trait::async_trait;
use futures::Stream;
use relay_types::StreamEvent;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::SessionError;
use crate::metrics::SessionMetrics;
use crate::sink::EventSink;

const DEFAULT_BUFFER: usize = 64;

/// A server-push producer bound to one client connection
#[async_trait]
pub trait Session: Send + 'static {
    /// Short label used in logs
    fn kind(&self) -> &'static str;

    /// Produce events until done, failed or cancelled
    async fn run(&mut self, sink: &mut EventSink) -> Result<(), SessionError>;
}

/// Eight hex characters, enough to tell concurrent sessions apart in logs
pub fn new_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub request_id: String,
    pub cancel: CancellationToken,
    pub buffer: usize,
}

impl SessionContext {
    /// Context whose cancellation follows `parent` (typically the server shutdown token)
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            request_id: new_request_id(),
            cancel: parent.child_token(),
            buffer: DEFAULT_BUFFER,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

/// Start `session` on its own task. Dropping the returned stream cancels it.
pub fn spawn_session<S: Session>(mut session: S, ctx: SessionContext) -> SessionStream {
    let SessionContext {
        request_id,
        cancel,
        buffer,
    } = ctx;
    let (tx, rx) = mpsc::channel(buffer);
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let metrics = SessionMetrics::start(request_id, session.kind());
        let mut sink = EventSink::new(tx, task_cancel, metrics);

        let outcome = session.run(&mut sink).await;
        sink.metrics().finish(&outcome);
    });

    SessionStream {
        events: ReceiverStream::new(rx),
        _cancel_on_drop: cancel.drop_guard(),
    }
}

/// Events of one spawned session
pub struct SessionStream {
    events: ReceiverStream<StreamEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for SessionStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Stand-in for a session whose backing service is not configured: one error event, then end
pub struct UnavailableSession {
    kind: &'static str,
    reason: String,
}

impl UnavailableSession {
    pub fn new(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Session for UnavailableSession {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn run(&mut self, sink: &mut EventSink) -> Result<(), SessionError> {
        sink.emit_error(&self.reason).await?;
        Err(SessionError::Precondition(self.reason.clone()))
    }
}
