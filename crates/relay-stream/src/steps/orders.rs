use async_trait::async_trait;
use relay_persist::OrderStore;
use relay_types::EventPayload;
use std::sync::Arc;

use crate::error::StepError;
use crate::poll_loop::PollStep;
use crate::sink::EventSink;
use crate::tracker::{ChangeNotification, ChangeTracker};

/// Order change stream: new rows above the watermark, then status drift in the latest window
pub struct OrderChangeStep {
    store: Arc<dyn OrderStore>,
    tracker: ChangeTracker,
    limit: u32,
}

impl OrderChangeStep {
    pub fn new(store: Arc<dyn OrderStore>, limit: u32) -> Self {
        Self {
            store,
            tracker: ChangeTracker::new(limit as usize),
            limit,
        }
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    async fn emit_all(
        sink: &mut EventSink,
        changes: Vec<ChangeNotification>,
    ) -> Result<(), StepError> {
        for ChangeNotification { sequence, change } in changes {
            sink.emit(EventPayload::OrdersChange {
                change,
                count: sequence,
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PollStep for OrderChangeStep {
    fn kind(&self) -> &'static str {
        "orders"
    }

    async fn bootstrap(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let snapshot = sink
            .guard(self.store.fetch_latest_orders(self.limit))
            .await??;
        self.tracker.bootstrap(&snapshot);

        tracing::info!(
            request_id = %sink.request_id(),
            tracked = self.tracker.len(),
            last_max_id = self.tracker.watermark(),
            "Order tracker bootstrapped"
        );

        sink.emit(EventPayload::OrdersReady {
            tracked: self.tracker.len(),
            last_max_id: self.tracker.watermark(),
        })
        .await?;
        Ok(())
    }

    async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let fresh = sink
            .guard(self.store.fetch_orders_since(self.tracker.watermark()))
            .await??;
        let created = self.tracker.apply_incremental(fresh);
        Self::emit_all(sink, created).await?;

        let snapshot = sink
            .guard(self.store.fetch_latest_orders(self.limit))
            .await??;
        let changed = self.tracker.apply_snapshot(snapshot);
        Self::emit_all(sink, changed).await
    }

    fn heartbeat(&self) -> Option<EventPayload> {
        Some(EventPayload::OrdersHeartbeat {
            tracked: self.tracker.len(),
            last_max_id: self.tracker.watermark(),
        })
    }
}
