use std::time::Duration;
use tokio::time::Instant;

/// True once `interval` has elapsed since `last`
pub fn due(last: Instant, now: Instant, interval: Duration) -> bool {
    now.saturating_duration_since(last) >= interval
}

/// Tracks the last heartbeat of a long-idle stream
#[derive(Debug, Clone)]
pub struct HeartbeatTimer {
    interval: Duration,
    last: Instant,
}

impl HeartbeatTimer {
    /// Timer whose first beat is due `interval` from now
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check at `now`; a due beat resets the timer and returns true
    pub fn check(&mut self, now: Instant) -> bool {
        if due(self.last, now, self.interval) {
            self.last = now;
            true
        } else {
            false
        }
    }
}
