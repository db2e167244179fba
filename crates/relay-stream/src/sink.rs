use relay_types::{EventPayload, StreamEvent};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Cancelled;
use crate::metrics::SessionMetrics;

/// Outbound half of a session
///
/// Every suspension point of a session goes through the sink, so cancellation is observed
/// at each send, sleep and guarded fetch. A dropped receiver counts as cancellation.
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    metrics: SessionMetrics,
}

impl EventSink {
    pub fn new(
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
        metrics: SessionMetrics,
    ) -> Self {
        Self {
            tx,
            cancel,
            metrics,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn request_id(&self) -> &str {
        self.metrics.request_id()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut SessionMetrics {
        &mut self.metrics
    }

    /// Format and deliver one event
    pub async fn emit(&mut self, payload: EventPayload) -> Result<(), Cancelled> {
        self.send(StreamEvent::new(payload)).await
    }

    /// Deliver an error event and remember it as the session's last error
    pub async fn emit_error(&mut self, error: impl Display) -> Result<(), Cancelled> {
        let event = StreamEvent::error(&error);
        self.metrics.record_error(error.to_string());
        self.send(event).await
    }

    async fn send(&mut self, event: StreamEvent) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Cancelled),
            sent = self.tx.send(event) => sent,
        };

        match sent {
            Ok(()) => {
                self.metrics.record_emission();
                Ok(())
            }
            Err(_) => {
                // Receiver dropped: the client went away
                self.cancel.cancel();
                Err(Cancelled)
            }
        }
    }

    /// Sleep unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.guard(tokio::time::sleep(duration)).await
    }

    /// Race `fut` against cancellation. The future is dropped if cancellation wins.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}
