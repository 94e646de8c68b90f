//! Per-request quorum state.
//!
//! A [`PendingOperation`] is created for every coordinated request and shared
//! only with that request's sub-operation tasks. Each task gets a [`ReplySlot`]
//! and reports through it exactly once; a slot dropped without reporting (a
//! panicked or cancelled task) counts as a failure, so the waiter can never be
//! stranded.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use crate::record::TimestampedRecord;

pub struct PendingOperation {
    ack: usize,
    from: usize,
    records: Mutex<Vec<TimestampedRecord>>,
    successes: AtomicUsize,
    reported: AtomicUsize,
    settled: Notify,
}

impl PendingOperation {
    pub fn new(ack: usize, from: usize) -> Arc<Self> {
        Arc::new(Self {
            ack,
            from,
            records: Mutex::new(Vec::with_capacity(from)),
            successes: AtomicUsize::new(0),
            reported: AtomicUsize::new(0),
            settled: Notify::new(),
        })
    }

    /// Hands out the reporting handle for one sub-operation.
    pub fn slot(self: &Arc<Self>) -> ReplySlot {
        ReplySlot {
            pending: Some(self.clone()),
        }
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::SeqCst)
    }

    /// `ack` successes reached, or every sub-operation has reported.
    pub fn is_settled(&self) -> bool {
        self.successes() >= self.ack || self.reported() >= self.from
    }

    /// Blocks the request until [`Self::is_settled`].
    pub async fn wait(&self) {
        while !self.is_settled() {
            self.settled.notified().await;
        }
    }

    /// Takes the records accumulated so far. Anything reported afterwards is
    /// dropped with the operation.
    pub fn take_records(&self) -> Vec<TimestampedRecord> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        mem::take(&mut *records)
    }

    fn succeed(&self, record: TimestampedRecord) {
        {
            let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            records.push(record);
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
        self.report();
    }

    fn report(&self) {
        self.reported.fetch_add(1, Ordering::SeqCst);
        // notify_one keeps a permit if the waiter is between its check and its
        // await, so no wake-up is lost.
        self.settled.notify_one();
    }
}

/// One sub-operation's reporting handle.
pub struct ReplySlot {
    pending: Option<Arc<PendingOperation>>,
}

impl ReplySlot {
    pub fn succeed(mut self, record: TimestampedRecord) {
        if let Some(pending) = self.pending.take() {
            pending.succeed(record);
        }
    }

    pub fn fail(mut self) {
        if let Some(pending) = self.pending.take() {
            pending.report();
        }
    }
}

impl Drop for ReplySlot {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.report();
        }
    }
}
