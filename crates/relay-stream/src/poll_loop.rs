//! Generic polling session: bootstrap once, then fetch and emit on a fixed interval.
//!
//! Failures go through [`Backoff`]: each one is reported as an error event, and the
//! session gives up after the policy's maximum number of consecutive failures. A
//! successful cycle resets the count and, when configured, may emit a heartbeat.

use async_trait::async_trait;
use relay_types::EventPayload;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{SessionError, StepError};
use crate::heartbeat::HeartbeatTimer;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::session::Session;
use crate::sink::EventSink;

/// One kind of polled data source
#[async_trait]
pub trait PollStep: Send + 'static {
    fn kind(&self) -> &'static str;

    /// Runs once before the first poll. A failure here ends the session after one error event.
    async fn bootstrap(&mut self, _sink: &mut EventSink) -> Result<(), StepError> {
        Ok(())
    }

    /// Fetch once and emit whatever the fetch produced
    async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError>;

    fn heartbeat(&self) -> Option<EventPayload> {
        None
    }

    /// Release held resources. Called exactly once, however the session ends.
    async fn close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub heartbeat_interval: Option<Duration>,
    pub retry: RetryPolicy,
}

impl PollConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            heartbeat_interval: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

pub struct PollLoop<S> {
    step: S,
    config: PollConfig,
}

impl<S: PollStep> PollLoop<S> {
    pub fn new(step: S, config: PollConfig) -> Self {
        Self { step, config }
    }

    pub fn step(&self) -> &S {
        &self.step
    }

    async fn drive(&mut self, sink: &mut EventSink) -> Result<(), SessionError> {
        tracing::info!(
            request_id = %sink.request_id(),
            kind = self.step.kind(),
            interval_ms = self.config.interval.as_millis() as u64,
            "Poll loop starting"
        );

        match self.step.bootstrap(sink).await {
            Ok(()) => {}
            Err(StepError::Cancelled) => return Err(SessionError::Cancelled),
            Err(e) => {
                tracing::error!(request_id = %sink.request_id(), error = %e, "Bootstrap failed");
                sink.emit_error(&e).await?;
                return Err(SessionError::Precondition(e.to_string()));
            }
        }

        let mut backoff = self.config.retry.backoff();
        let mut heartbeat = self.config.heartbeat_interval.map(HeartbeatTimer::new);

        loop {
            match self.step.poll(sink).await {
                Ok(()) => {
                    backoff.on_success();

                    if let Some(timer) = heartbeat.as_mut() {
                        if timer.check(Instant::now()) {
                            if let Some(payload) = self.step.heartbeat() {
                                sink.emit(payload).await?;
                            }
                        }
                    }

                    sink.sleep(self.config.interval).await?;
                }
                Err(StepError::Cancelled) => return Err(SessionError::Cancelled),
                Err(e) => {
                    if backoff.on_failure(sink, &e).await? == RetryDecision::GiveUp {
                        return Err(SessionError::Exhausted {
                            attempts: backoff.failures(),
                            last_error: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<S: PollStep> Session for PollLoop<S> {
    fn kind(&self) -> &'static str {
        self.step.kind()
    }

    async fn run(&mut self, sink: &mut EventSink) -> Result<(), SessionError> {
        let outcome = self.drive(sink).await;
        self.step.close().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{spawn_session, SessionContext};
    use futures::StreamExt;
    use relay_persist::PersistError;
    use relay_types::StreamEvent;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    /// Fails the first `failures` polls, then emits counters
    struct Flaky {
        failures: u32,
        polls: Arc<AtomicU32>,
        closed: Arc<AtomicU32>,
    }

    #[async_trait]
    impl PollStep for Flaky {
        fn kind(&self) -> &'static str {
            "flaky"
        }

        async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(PersistError::Connection("refused".into()).into());
            }
            sink.emit(EventPayload::Counter { count: n as u64 }).await?;
            Ok(())
        }

        fn heartbeat(&self) -> Option<EventPayload> {
            Some(EventPayload::OrdersHeartbeat {
                tracked: 0,
                last_max_id: 0,
            })
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flaky(failures: u32) -> (Flaky, Arc<AtomicU32>, Arc<AtomicU32>) {
        let polls = Arc::new(AtomicU32::new(0));
        let closed = Arc::new(AtomicU32::new(0));
        let step = Flaky {
            failures,
            polls: polls.clone(),
            closed: closed.clone(),
        };
        (step, polls, closed)
    }

    fn config() -> PollConfig {
        PollConfig::every(Duration::from_millis(100))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(10)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_failures() {
        let (step, polls, closed) = flaky(u32::MAX);
        let root = CancellationToken::new();
        let stream = spawn_session(PollLoop::new(step, config()), SessionContext::child_of(&root));

        let events: Vec<StreamEvent> = stream.collect().await;

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(StreamEvent::is_error));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_below_limit() {
        let (step, _polls, closed) = flaky(2);
        let root = CancellationToken::new();
        let mut stream =
            spawn_session(PollLoop::new(step, config()), SessionContext::child_of(&root));

        let mut names = Vec::new();
        for _ in 0..4 {
            names.push(stream.next().await.unwrap().event_name());
        }
        assert_eq!(names, vec!["error", "error", "counter", "counter"]);

        root.cancel();
        while stream.next().await.is_some() {}
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_interval_closes_once() {
        let (step, polls, closed) = flaky(0);
        let root = CancellationToken::new();
        let config = PollConfig::every(Duration::from_secs(60));
        let mut stream = spawn_session(PollLoop::new(step, config), SessionContext::child_of(&root));

        assert_eq!(stream.next().await.unwrap().event_name(), "counter");
        drop(stream);

        // Let the session task observe the cancellation and run its cleanup
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_after_interval() {
        let (step, _polls, _closed) = flaky(0);
        let root = CancellationToken::new();
        let config = PollConfig::every(Duration::from_secs(1)).with_heartbeat(Duration::from_secs(3));
        let mut stream = spawn_session(PollLoop::new(step, config), SessionContext::child_of(&root));

        let mut names = Vec::new();
        for _ in 0..5 {
            names.push(stream.next().await.unwrap().event_name());
        }
        assert_eq!(
            names,
            vec!["counter", "counter", "counter", "counter", "orders_heartbeat"]
        );
    }

    /// Fetch that never completes on its own
    struct Stalled {
        polls: Arc<AtomicU32>,
        closed: Arc<AtomicU32>,
    }

    #[async_trait]
    impl PollStep for Stalled {
        fn kind(&self) -> &'static str {
            "stalled"
        }

        async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            sink.guard(std::future::pending::<()>()).await?;
            Ok(())
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_fetch_is_silent() {
        let polls = Arc::new(AtomicU32::new(0));
        let closed = Arc::new(AtomicU32::new(0));
        let step = Stalled {
            polls: polls.clone(),
            closed: closed.clone(),
        };
        let root = CancellationToken::new();
        let stream = spawn_session(PollLoop::new(step, config()), SessionContext::child_of(&root));

        tokio::time::sleep(Duration::from_secs(5)).await;
        root.cancel();

        let events: Vec<StreamEvent> = stream.collect().await;
        assert!(events.is_empty());
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    struct BrokenBootstrap;

    #[async_trait]
    impl PollStep for BrokenBootstrap {
        fn kind(&self) -> &'static str {
            "broken"
        }

        async fn bootstrap(&mut self, _sink: &mut EventSink) -> Result<(), StepError> {
            Err(StepError::Precondition("Unsupported data_type: bogus".into()))
        }

        async fn poll(&mut self, _sink: &mut EventSink) -> Result<(), StepError> {
            panic!("poll after failed bootstrap");
        }
    }

    #[tokio::test]
    async fn test_bootstrap_failure_single_error() {
        let root = CancellationToken::new();
        let stream = spawn_session(
            PollLoop::new(BrokenBootstrap, config()),
            SessionContext::child_of(&root),
        );

        let events: Vec<StreamEvent> = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].payload,
            EventPayload::Error {
                error: "Unsupported data_type: bogus".into()
            }
        );
    }
}
