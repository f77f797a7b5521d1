//! The in-memory apply queue.
//!
//! A multi-producer, single-consumer FIFO of [`RunId`]s backed by an unbounded
//! tokio channel. Producers ([`RunQueue`], cloned into every per-event worker)
//! append without blocking. The single consumer ([`RunQueueConsumer`], owned by
//! the apply scheduler) suspends until an entry arrives and may push entries
//! back onto the tail.
//!
//! The queue also remembers which runs are pending. A producer cannot add a
//! run that is already in the queue, so a redelivered event never results in
//! a second apply for the same run. Only the consumer clears a run from the
//! pending set, when it drops the run for good.
//!
//! Contents are lost on restart.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use runtask::{RunId, Timestamp};
use thiserror::Error;
use tokio::sync::mpsc;

/// A run travelling through the apply scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub run_id: RunId,
    /// When the run was first queued. Preserved across re-enqueues.
    pub enqueued_at: Timestamp,
}

/// Result of a producer append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The run was appended to the tail.
    Added,
    /// The run was already waiting in the queue; nothing was appended.
    AlreadyPending,
}

/// The consumer side has been dropped, so nothing would ever process the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("apply scheduler is not running; run {run_id} was not queued")]
pub struct QueueClosed {
    pub run_id: RunId,
}

type PendingSet = Arc<Mutex<HashSet<RunId>>>;

fn lock(pending: &PendingSet) -> MutexGuard<'_, HashSet<RunId>> {
    // The set holds plain ids, so a panic elsewhere cannot leave it half-updated.
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates a connected producer/consumer pair.
pub fn run_queue() -> (RunQueue, RunQueueConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending: PendingSet = Arc::default();
    let producer = RunQueue {
        tx: tx.clone(),
        pending: Arc::clone(&pending),
    };
    let consumer = RunQueueConsumer { tx, rx, pending };
    (producer, consumer)
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Producer handle. Cheap to clone; safe to use from many tasks at once.
#[derive(Debug, Clone)]
pub struct RunQueue {
    tx: mpsc::UnboundedSender<QueueEntry>,
    pending: PendingSet,
}

impl RunQueue {
    /// Appends `run_id` to the tail unless it is already pending.
    pub fn enqueue(&self, run_id: RunId) -> Result<Enqueued, QueueClosed> {
        let mut pending = lock(&self.pending);
        if pending.contains(&run_id) {
            return Ok(Enqueued::AlreadyPending);
        }

        let entry = QueueEntry {
            run_id: run_id.clone(),
            enqueued_at: Timestamp::now(),
        };
        self.tx
            .send(entry)
            .map_err(|_| QueueClosed {
                run_id: run_id.clone(),
            })?;
        pending.insert(run_id);
        Ok(Enqueued::Added)
    }

    /// Returns `true` if `run_id` is waiting in the queue or being processed.
    pub fn is_pending(&self, run_id: &RunId) -> bool {
        lock(&self.pending).contains(run_id)
    }

    /// Number of distinct runs currently pending.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Consumer handle. Exactly one exists per queue.
#[derive(Debug)]
pub struct RunQueueConsumer {
    tx: mpsc::UnboundedSender<QueueEntry>,
    rx: mpsc::UnboundedReceiver<QueueEntry>,
    pending: PendingSet,
}

impl RunQueueConsumer {
    /// Waits until an entry is available and removes it from the head.
    ///
    /// The consumer keeps its own sender for re-enqueueing, so this only
    /// returns `None` if the channel is explicitly closed.
    pub async fn recv(&mut self) -> Option<QueueEntry> {
        self.rx.recv().await
    }

    /// Removes the head entry if one is immediately available.
    pub fn try_recv(&mut self) -> Option<QueueEntry> {
        self.rx.try_recv().ok()
    }

    /// Pushes an entry back onto the tail. The run stays pending.
    pub fn requeue(&self, entry: QueueEntry) {
        // The receiver lives in `self`, so the channel cannot be closed here.
        let _ = self.tx.send(entry);
    }

    /// Drops a run for good so producers may queue it again later.
    pub fn complete(&self, run_id: &RunId) {
        lock(&self.pending).remove(run_id);
    }
}
