//! Bounded worker pool.
//!
//! Each slot runs one account at a time on its own tokio task. A submission
//! reserves a slot up front and fails with [`PoolError::PoolFull`] when none
//! is free; that is the only backpressure in the system. Workers report one
//! [`WorkerEvent::JobCompleted`] per successful job and exactly one
//! [`WorkerEvent::Finished`] per submission, after the slot is released.

mod types;
mod worker;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;
use uuid::Uuid;

use crate::account::Account;
use crate::job::{JobExecutor, JobSource};
use crate::metrics::DISPATCHES;

pub use types::{PoolError, WorkerEvent, WorkerOutcome};

use worker::{SlotGuard, Worker};

/// Handle to a submitted account.
#[derive(Debug)]
pub struct WorkerHandle {
    id: Uuid,
    account: String,
    cancel_tx: watch::Sender<bool>,
}

impl WorkerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Ask the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }
}

/// Bounded set of execution slots.
pub struct WorkerPool {
    capacity: AtomicUsize,
    active: Arc<AtomicUsize>,
    source: Arc<dyn JobSource>,
    executor: Arc<dyn JobExecutor>,
    job_timeout: Duration,
    events: mpsc::Sender<WorkerEvent>,
}

impl WorkerPool {
    /// Create a pool. Worker events are delivered on `events`.
    pub fn new(
        capacity: usize,
        source: Arc<dyn JobSource>,
        executor: Arc<dyn JobExecutor>,
        job_timeout: Duration,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Self {
        Self {
            capacity: AtomicUsize::new(capacity),
            active: Arc::new(AtomicUsize::new(0)),
            source,
            executor,
            job_timeout,
            events,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    /// Change the slot count. Running workers are never preempted; a
    /// shrink only blocks new submissions until enough slots drain.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::SeqCst);
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Reserve a slot and start running the account's jobs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, account: Account) -> Result<WorkerHandle, PoolError> {
        self.reserve_slot()?;
        let slot = SlotGuard::new(Arc::clone(&self.active));

        let id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = WorkerHandle {
            id,
            account: account.email.clone(),
            cancel_tx,
        };

        debug!("Submitting {} to worker {}", account.email, id);
        DISPATCHES.inc();

        let worker = Worker {
            handle: id,
            account,
            source: Arc::clone(&self.source),
            executor: Arc::clone(&self.executor),
            job_timeout: self.job_timeout,
            cancel: cancel_rx,
            events: self.events.clone(),
        };
        tokio::spawn(worker.run(slot));

        Ok(handle)
    }

    fn reserve_slot(&self) -> Result<(), PoolError> {
        let mut current = self.active.load(Ordering::SeqCst);
        loop {
            let capacity = self.capacity();
            if current >= capacity {
                return Err(PoolError::PoolFull { capacity });
            }
            match self.active.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}
