use std::time::Duration;
use tokio::time::Instant;

use crate::error::SessionError;

/// Per-session counters, reported through `tracing` only
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    request_id: String,
    kind: &'static str,
    started_at: Instant,
    first_emission_at: Option<Instant>,
    first_token_at: Option<Instant>,
    emitted: u64,
    last_error: Option<String>,
}

impl SessionMetrics {
    /// Start the clock and log the session start
    pub fn start(request_id: impl Into<String>, kind: &'static str) -> Self {
        let request_id = request_id.into();
        tracing::info!(request_id = %request_id, kind, "START");

        Self {
            request_id,
            kind,
            started_at: Instant::now(),
            first_emission_at: None,
            first_token_at: None,
            emitted: 0,
            last_error: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn first_emission(&self) -> Option<Duration> {
        self.first_emission_at.map(|at| at - self.started_at)
    }

    pub fn first_token_latency(&self) -> Option<Duration> {
        self.first_token_at.map(|at| at - self.started_at)
    }

    pub fn record_emission(&mut self) {
        self.emitted += 1;

        if self.first_emission_at.is_none() {
            let now = Instant::now();
            self.first_emission_at = Some(now);
            tracing::info!(
                request_id = %self.request_id,
                kind = self.kind,
                after_ms = (now - self.started_at).as_millis() as u64,
                "FIRST_EMISSION"
            );
        }
    }

    /// First non-empty upstream delta. Later calls are ignored.
    pub fn record_first_token(&mut self) {
        if self.first_token_at.is_some() {
            return;
        }

        let now = Instant::now();
        self.first_token_at = Some(now);
        tracing::info!(
            request_id = %self.request_id,
            latency_ms = (now - self.started_at).as_millis() as u64,
            "FIRST_TOKEN"
        );
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Log the terminal line for this session
    pub fn finish(&self, outcome: &Result<(), SessionError>) {
        let duration_ms = self.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => tracing::info!(
                request_id = %self.request_id,
                kind = self.kind,
                duration_ms,
                emitted = self.emitted,
                "DONE"
            ),
            Err(SessionError::Cancelled) => tracing::info!(
                request_id = %self.request_id,
                kind = self.kind,
                duration_ms,
                emitted = self.emitted,
                "CANCELLED"
            ),
            Err(SessionError::Exhausted { attempts, last_error }) => tracing::error!(
                request_id = %self.request_id,
                kind = self.kind,
                duration_ms,
                emitted = self.emitted,
                attempts,
                error = %last_error,
                "EXHAUSTED"
            ),
            Err(e) => tracing::error!(
                request_id = %self.request_id,
                kind = self.kind,
                duration_ms,
                emitted = self.emitted,
                error = %e,
                "ERROR"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_emission_recorded_once() {
        let mut metrics = SessionMetrics::start("abcd1234", "counter");
        assert!(metrics.first_emission().is_none());

        tokio::time::advance(Duration::from_millis(250)).await;
        metrics.record_emission();
        tokio::time::advance(Duration::from_millis(250)).await;
        metrics.record_emission();

        assert_eq!(metrics.emitted(), 2);
        assert_eq!(metrics.first_emission(), Some(Duration::from_millis(250)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_token_latency() {
        let mut metrics = SessionMetrics::start("abcd1234", "chat");

        tokio::time::advance(Duration::from_millis(40)).await;
        metrics.record_first_token();
        tokio::time::advance(Duration::from_millis(40)).await;
        metrics.record_first_token();

        assert_eq!(metrics.first_token_latency(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_last_error() {
        let mut metrics = SessionMetrics::start("abcd1234", "database");
        metrics.record_error("timeout");
        metrics.record_error("refused");
        assert_eq!(metrics.last_error(), Some("refused"));
    }
}
