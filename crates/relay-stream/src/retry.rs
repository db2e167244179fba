use std::fmt::Display;
use std::time::Duration;

use crate::error::Cancelled;
use crate::sink::EventSink;

/// Bounded linear backoff for poll failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.base_delay * failures
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(*self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    GiveUp,
}

/// Consecutive-failure counter for one session
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn on_success(&mut self) {
        self.failures = 0;
    }

    /// Count one failure, report it to the client, then either wait out the backoff or give up.
    ///
    /// Cancellation during the error send or the wait is returned as-is.
    pub async fn on_failure<E: Display + ?Sized>(
        &mut self,
        sink: &mut EventSink,
        error: &E,
    ) -> Result<RetryDecision, Cancelled> {
        self.failures += 1;

        tracing::error!(
            request_id = %sink.request_id(),
            attempt = self.failures,
            max_attempts = self.policy.max_attempts,
            error = %error,
            "Poll failed"
        );

        sink.emit_error(error).await?;

        if self.failures >= self.policy.max_attempts {
            tracing::error!(
                request_id = %sink.request_id(),
                "Max retry attempts reached. Stopping stream."
            );
            return Ok(RetryDecision::GiveUp);
        }

        sink.sleep(self.policy.delay_for(self.failures)).await?;
        Ok(RetryDecision::Retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionMetrics;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.max_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_on_third_failure() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = EventSink::new(
            tx,
            CancellationToken::new(),
            SessionMetrics::start("test0001", "database"),
        );
        let mut backoff = RetryPolicy::default().backoff();

        assert_eq!(backoff.on_failure(&mut sink, "down").await, Ok(RetryDecision::Retry));
        assert_eq!(backoff.on_failure(&mut sink, "down").await, Ok(RetryDecision::Retry));
        assert_eq!(backoff.on_failure(&mut sink, "down").await, Ok(RetryDecision::GiveUp));
        drop(sink);

        let mut errors = 0;
        while let Some(event) = rx.recv().await {
            assert!(event.is_error());
            errors += 1;
        }
        assert_eq!(errors, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_counter() {
        let (tx, _rx) = mpsc::channel(8);
        let mut sink = EventSink::new(
            tx,
            CancellationToken::new(),
            SessionMetrics::start("test0001", "database"),
        );
        let mut backoff = RetryPolicy::default().backoff();

        backoff.on_failure(&mut sink, "down").await.unwrap();
        backoff.on_failure(&mut sink, "down").await.unwrap();
        backoff.on_success();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.on_failure(&mut sink, "down").await, Ok(RetryDecision::Retry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_wait() {
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let mut sink = EventSink::new(tx, cancel.clone(), SessionMetrics::start("test0001", "database"));
        let mut backoff = RetryPolicy::new(3, Duration::from_secs(60)).backoff();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        assert_eq!(backoff.on_failure(&mut sink, "down").await, Err(Cancelled));
        canceller.await.unwrap();
    }
}
