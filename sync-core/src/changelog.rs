//! Ordered change log for a synced collection.
//!
//! This module provides the queue of pending [`ChangeRecord`]s with:
//! - FIFO ordering for delivery
//! - In-flight tracking (a snapshot sent but not yet settled)
//! - Requeue-at-head when a flush fails
//!
//! Records flow through the log in this order:
//! 1. `append()` - add to the tail
//! 2. `take_snapshot()` - remove everything currently queued, hold it in flight
//! 3. `ack()` - drop the in-flight snapshot (flush succeeded)
//!
//! If the flush fails, call `requeue()` to put the snapshot back ahead of any
//! record appended while it was in flight.
//!
//! The log is unbounded. Records that keep failing accumulate until the
//! owner resolves the underlying error.

use changeq_sync_types::ChangeRecord;
use std::collections::VecDeque;

/// Ordered log of pending change records with in-flight tracking.
#[derive(Debug, Clone)]
pub struct ChangeLog<Id> {
    /// Records waiting to be flushed.
    queue: VecDeque<ChangeRecord<Id>>,
    /// Snapshot of the flush currently in flight.
    in_flight: Option<Vec<ChangeRecord<Id>>>,
}

impl<Id> Default for ChangeLog<Id> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
        }
    }
}

impl<Id: Clone> ChangeLog<Id> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the tail.
    pub fn append(&mut self, record: ChangeRecord<Id>) {
        self.queue.push_back(record);
    }

    /// Remove every queued record and hold it as the in-flight snapshot.
    ///
    /// Returns `None` if a snapshot is already in flight or nothing is
    /// queued.
    pub fn take_snapshot(&mut self) -> Option<Vec<ChangeRecord<Id>>> {
        if self.in_flight.is_some() || self.queue.is_empty() {
            return None;
        }
        let snapshot: Vec<ChangeRecord<Id>> = self.queue.drain(..).collect();
        self.in_flight = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Drop the in-flight snapshot after a successful flush.
    ///
    /// Records appended while the flush was in flight are untouched.
    pub fn ack(&mut self) -> Option<Vec<ChangeRecord<Id>>> {
        self.in_flight.take()
    }

    /// Put the in-flight snapshot back at the head of the queue.
    ///
    /// Returns the number of records reinstated.
    pub fn requeue(&mut self) -> usize {
        match self.in_flight.take() {
            Some(snapshot) => {
                let count = snapshot.len();
                for record in snapshot.into_iter().rev() {
                    self.queue.push_front(record);
                }
                count
            }
            None => 0,
        }
    }

    /// Copy of the queued records, head first (excludes the in-flight snapshot).
    pub fn records(&self) -> Vec<ChangeRecord<Id>> {
        self.queue.iter().cloned().collect()
    }
}

impl<Id> ChangeLog<Id> {
    /// Number of queued records (not including the in-flight snapshot).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no records are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a snapshot is currently in flight.
    pub fn is_flushing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of records in the in-flight snapshot.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.as_ref().map_or(0, Vec::len)
    }

    /// Iterate queued records, head first.
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord<Id>> {
        self.queue.iter()
    }

    /// Discard all queued records and forget any in-flight snapshot.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changeq_sync_types::ChangeAction;

    fn add(id: u32) -> ChangeRecord<u32> {
        ChangeRecord::add(vec![id], 0)
    }

    fn ids(records: &[ChangeRecord<u32>]) -> Vec<u32> {
        records.iter().map(|r| r.items[0]).collect()
    }

    #[test]
    fn append_preserves_order() {
        let mut log = ChangeLog::new();
        log.append(ChangeRecord::add(vec![100, 101], 0));
        log.append(ChangeRecord::moved(vec![101], 0));
        log.append(ChangeRecord::remove(vec![101], 0));

        assert_eq!(log.len(), 3);
        let actions: Vec<ChangeAction> = log.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![ChangeAction::Add, ChangeAction::Move, ChangeAction::Remove]
        );
    }

    #[test]
    fn snapshot_clears_queue() {
        let mut log = ChangeLog::new();
        log.append(add(1));
        log.append(add(2));

        let snapshot = log.take_snapshot().unwrap();

        assert_eq!(ids(&snapshot), vec![1, 2]);
        assert!(log.is_empty());
        assert!(log.is_flushing());
        assert_eq!(log.in_flight_count(), 2);
    }

    #[test]
    fn snapshot_of_empty_log_is_none() {
        let mut log: ChangeLog<u32> = ChangeLog::new();
        assert!(log.take_snapshot().is_none());
        assert!(!log.is_flushing());
    }

    #[test]
    fn second_snapshot_while_in_flight_is_none() {
        let mut log = ChangeLog::new();
        log.append(add(1));
        let _ = log.take_snapshot();

        log.append(add(2));
        assert!(log.take_snapshot().is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn ack_keeps_records_appended_mid_flight() {
        let mut log = ChangeLog::new();
        log.append(add(1));
        log.append(add(2));
        let _ = log.take_snapshot();
        log.append(add(3));

        let acked = log.ack().unwrap();

        assert_eq!(ids(&acked), vec![1, 2]);
        assert_eq!(ids(&log.records()), vec![3]);
        assert!(!log.is_flushing());
    }

    #[test]
    fn requeue_puts_snapshot_ahead_of_newer_records() {
        let mut log = ChangeLog::new();
        log.append(add(1));
        log.append(add(2));
        let _ = log.take_snapshot();
        log.append(add(3));

        assert_eq!(log.requeue(), 2);

        assert_eq!(ids(&log.records()), vec![1, 2, 3]);
        assert!(!log.is_flushing());
    }

    #[test]
    fn requeued_records_flush_first_next_time() {
        let mut log = ChangeLog::new();
        log.append(add(1));
        let _ = log.take_snapshot();
        log.append(add(2));
        log.requeue();

        let retry = log.take_snapshot().unwrap();
        assert_eq!(ids(&retry), vec![1, 2]);
    }

    #[test]
    fn repeated_failures_accumulate() {
        let mut log = ChangeLog::new();
        for round in 0..3 {
            log.append(add(round));
            let _ = log.take_snapshot();
            log.requeue();
        }
        assert_eq!(ids(&log.records()), vec![0, 1, 2]);
    }

    #[test]
    fn ack_and_requeue_without_flight_are_no_ops() {
        let mut log = ChangeLog::new();
        log.append(add(1));

        assert!(log.ack().is_none());
        assert_eq!(log.requeue(), 0);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn clear_removes_all() {
        let mut log = ChangeLog::new();
        log.append(add(1));
        log.append(add(2));
        let _ = log.take_snapshot();
        log.append(add(3));

        log.clear();

        assert_eq!(log.len(), 0);
        assert!(!log.is_flushing());
    }
}
