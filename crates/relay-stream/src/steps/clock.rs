use async_trait::async_trait;
use relay_persist::OrderStore;
use relay_types::EventPayload;
use std::sync::Arc;

use crate::error::StepError;
use crate::poll_loop::PollStep;
use crate::sink::EventSink;

/// Samples the database clock each cycle
pub struct DbClockStep {
    store: Arc<dyn OrderStore>,
    count: u64,
}

impl DbClockStep {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store, count: 0 }
    }
}

#[async_trait]
impl PollStep for DbClockStep {
    fn kind(&self) -> &'static str {
        "database"
    }

    async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let db_time = sink.guard(self.store.fetch_db_time()).await??;

        sink.emit(EventPayload::Database {
            count: self.count,
            db_time: db_time.map(|t| t.to_rfc3339()),
        })
        .await?;
        self.count += 1;
        Ok(())
    }
}

/// Database clock plus catalogue size and query latency
pub struct TelemetryStep {
    store: Arc<dyn OrderStore>,
    count: u64,
}

impl TelemetryStep {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store, count: 0 }
    }
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

#[async_trait]
impl PollStep for TelemetryStep {
    fn kind(&self) -> &'static str {
        "telemetry"
    }

    async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let telemetry = sink.guard(self.store.fetch_telemetry()).await??;

        sink.emit(EventPayload::Telemetry {
            count: self.count,
            db_time: telemetry.db_time,
            object_count: telemetry.object_count,
            query_ms: round_ms(telemetry.elapsed_ms),
        })
        .await?;
        self.count += 1;
        Ok(())
    }
}
