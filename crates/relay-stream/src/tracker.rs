//! Change detection over a bounded window of orders.
//!
//! Two passes run each cycle: an incremental pass for rows above the high watermark, then a
//! snapshot pass over the latest `window` rows that reports status drift and prunes the
//! tracked set back to the snapshot's ids.

use relay_types::{Order, OrderChange};
use std::collections::{HashMap, HashSet};

/// One detected change plus its position in the session's change sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub sequence: u64,
    pub change: OrderChange,
}

#[derive(Debug, Clone)]
pub struct ChangeTracker {
    status_by_id: HashMap<i64, String>,
    high_watermark: i64,
    window: usize,
    sequence: u64,
}

impl ChangeTracker {
    pub fn new(window: usize) -> Self {
        Self {
            status_by_id: HashMap::new(),
            high_watermark: 0,
            window,
            sequence: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn watermark(&self) -> i64 {
        self.high_watermark
    }

    pub fn len(&self) -> usize {
        self.status_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status_by_id.is_empty()
    }

    pub fn status_of(&self, order_id: i64) -> Option<&str> {
        self.status_by_id.get(&order_id).map(String::as_str)
    }

    /// Tracked ids, ascending
    pub fn tracked_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.status_by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Seed from the initial snapshot. Emits nothing.
    pub fn bootstrap(&mut self, snapshot: &[Order]) {
        for order in snapshot.iter().take(self.window) {
            self.status_by_id
                .insert(order.order_id, order.status.clone());
            self.high_watermark = self.high_watermark.max(order.order_id);
        }
    }

    /// Rows with ids above the watermark, in any order. Each yields one `new` change in
    /// ascending id order; ids at or below the watermark are ignored.
    pub fn apply_incremental(&mut self, mut orders: Vec<Order>) -> Vec<ChangeNotification> {
        orders.sort_by_key(|order| order.order_id);

        let mut changes = Vec::new();
        for order in orders {
            if order.order_id <= self.high_watermark {
                continue;
            }
            self.high_watermark = order.order_id;
            self.status_by_id
                .insert(order.order_id, order.status.clone());
            changes.push(self.stamp(OrderChange::New { order }));
        }
        changes
    }

    /// Latest rows, highest id first. Reports status drift on tracked ids and prunes the
    /// tracked set to the snapshot.
    ///
    /// An id seen here for the first time is tracked without an event. A status change that
    /// happened before that first sighting is therefore never reported.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Order>) -> Vec<ChangeNotification> {
        let mut keep = HashSet::with_capacity(self.window);
        let mut changes = Vec::new();

        for order in snapshot.into_iter().take(self.window) {
            keep.insert(order.order_id);

            let old_status = match self.status_by_id.get_mut(&order.order_id) {
                Some(previous) if *previous != order.status => {
                    Some(std::mem::replace(previous, order.status.clone()))
                }
                Some(_) => None,
                None => {
                    self.status_by_id
                        .insert(order.order_id, order.status.clone());
                    None
                }
            };

            if let Some(old_status) = old_status {
                let transition = order.transition_from(old_status);
                changes.push(self.stamp(OrderChange::StatusChanged { order: transition }));
            }
        }

        self.status_by_id.retain(|id, _| keep.contains(id));
        changes
    }

    fn stamp(&mut self, change: OrderChange) -> ChangeNotification {
        let notification = ChangeNotification {
            sequence: self.sequence,
            change,
        };
        self.sequence += 1;
        notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64, status: &str) -> Order {
        Order {
            order_id: id,
            customer_id: 100 + id,
            status: status.to_string(),
            salesman_id: Some(1),
            order_date: None,
        }
    }

    #[test]
    fn test_bootstrap_sets_watermark() {
        let mut tracker = ChangeTracker::new(50);
        tracker.bootstrap(&[order(5, "PENDING"), order(3, "SHIPPED")]);

        assert_eq!(tracker.watermark(), 5);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.status_of(3), Some("SHIPPED"));
    }

    #[test]
    fn test_empty_bootstrap() {
        let mut tracker = ChangeTracker::new(50);
        tracker.bootstrap(&[]);

        assert_eq!(tracker.watermark(), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_incremental_sorted_and_sequenced() {
        let mut tracker = ChangeTracker::new(50);
        tracker.bootstrap(&[order(1, "PENDING")]);

        let changes = tracker.apply_incremental(vec![order(4, "PENDING"), order(2, "PENDING")]);
        let ids: Vec<i64> = changes.iter().map(|c| c.change.order_id()).collect();
        let seqs: Vec<u64> = changes.iter().map(|c| c.sequence).collect();

        assert_eq!(ids, vec![2, 4]);
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(tracker.watermark(), 4);
    }

    #[test]
    fn test_window_of_three_trace() {
        let mut tracker = ChangeTracker::new(3);
        tracker.bootstrap(&[order(1, "PENDING")]);

        let mut events = Vec::new();
        events.extend(tracker.apply_incremental(vec![order(2, "PENDING")]));
        events.extend(tracker.apply_snapshot(vec![order(2, "PENDING"), order(1, "SHIPPED")]));
        assert_eq!(tracker.tracked_ids(), vec![1, 2]);

        events.extend(tracker.apply_incremental(vec![order(3, "PENDING")]));
        events.extend(tracker.apply_snapshot(vec![order(3, "PENDING"), order(2, "SHIPPED")]));
        assert_eq!(tracker.tracked_ids(), vec![2, 3]);

        let trace: Vec<String> = events
            .iter()
            .map(|n| match &n.change {
                OrderChange::New { order } => format!("{} new({})", n.sequence, order.order_id),
                OrderChange::StatusChanged { order } => format!(
                    "{} status_changed({}:{}->{})",
                    n.sequence, order.order_id, order.old_status, order.new_status
                ),
            })
            .collect();

        assert_eq!(
            trace,
            vec![
                "0 new(2)",
                "1 status_changed(1:PENDING->SHIPPED)",
                "2 new(3)",
                "3 status_changed(2:PENDING->SHIPPED)",
            ]
        );
    }

    #[test]
    fn test_incremental_ignores_rows_at_or_below_watermark() {
        let mut tracker = ChangeTracker::new(50);
        tracker.bootstrap(&[order(3, "PENDING")]);

        let changes = tracker.apply_incremental(vec![order(3, "PENDING"), order(2, "PENDING")]);
        assert!(changes.is_empty());
        assert_eq!(tracker.watermark(), 3);
    }

    #[test]
    fn test_snapshot_reports_drift_and_prunes() {
        let mut tracker = ChangeTracker::new(2);
        tracker.bootstrap(&[order(2, "PENDING"), order(1, "PENDING")]);
        tracker.apply_incremental(vec![order(3, "PENDING")]);
        assert_eq!(tracker.len(), 3);

        let changes = tracker.apply_snapshot(vec![order(3, "PENDING"), order(2, "SHIPPED")]);

        assert_eq!(changes.len(), 1);
        match &changes[0].change {
            OrderChange::StatusChanged { order } => {
                assert_eq!(order.order_id, 2);
                assert_eq!(order.old_status, "PENDING");
                assert_eq!(order.new_status, "SHIPPED");
            }
            other => panic!("unexpected change: {:?}", other),
        }
        assert_eq!(tracker.tracked_ids(), vec![2, 3]);
    }

    #[test]
    fn test_snapshot_tracks_unseen_ids_silently() {
        let mut tracker = ChangeTracker::new(5);
        tracker.bootstrap(&[order(1, "PENDING")]);

        let changes = tracker.apply_snapshot(vec![order(7, "SHIPPED"), order(1, "PENDING")]);

        assert!(changes.is_empty());
        assert_eq!(tracker.status_of(7), Some("SHIPPED"));
        // Snapshot never moves the watermark
        assert_eq!(tracker.watermark(), 1);
    }

    #[test]
    fn test_new_row_already_changed_is_not_reported_twice() {
        let mut tracker = ChangeTracker::new(50);
        tracker.bootstrap(&[order(1, "PENDING")]);

        let fresh = tracker.apply_incremental(vec![order(2, "SHIPPED")]);
        let drift = tracker.apply_snapshot(vec![order(2, "SHIPPED"), order(1, "PENDING")]);

        assert_eq!(fresh.len(), 1);
        assert!(drift.is_empty());
    }

    #[test]
    fn test_status_flip_reported_each_time() {
        let mut tracker = ChangeTracker::new(50);
        tracker.bootstrap(&[order(1, "PENDING")]);

        assert_eq!(tracker.apply_snapshot(vec![order(1, "SHIPPED")]).len(), 1);
        assert!(tracker.apply_snapshot(vec![order(1, "SHIPPED")]).is_empty());

        let back = tracker.apply_snapshot(vec![order(1, "PENDING")]);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].sequence, 1);
    }
}
