//! Worker task: runs one account's jobs inside a reserved slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{WorkerEvent, WorkerOutcome};
use crate::account::Account;
use crate::job::{JobError, JobExecutor, JobSource};
use crate::metrics::{JOBS_COMPLETED, JOBS_FAILED, JOB_DURATION, WORKERS_ACTIVE};

/// Holds one slot; releases it when dropped.
pub(super) struct SlotGuard {
    active: Arc<AtomicUsize>,
}

impl SlotGuard {
    pub(super) fn new(active: Arc<AtomicUsize>) -> Self {
        WORKERS_ACTIVE.inc();
        Self { active }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        WORKERS_ACTIVE.dec();
    }
}

/// Everything a worker needs, owned by the task.
pub(super) struct Worker {
    pub handle: Uuid,
    pub account: Account,
    pub source: Arc<dyn JobSource>,
    pub executor: Arc<dyn JobExecutor>,
    pub job_timeout: Duration,
    pub cancel: watch::Receiver<bool>,
    pub events: mpsc::Sender<WorkerEvent>,
}

impl Worker {
    /// Drive the account to a terminal outcome, release the slot, report.
    pub(super) async fn run(self, slot: SlotGuard) {
        let outcome = self.drive().await;
        debug!(
            "Worker {} for {} finished: {}",
            self.handle,
            self.account.email,
            outcome.label()
        );

        // Free the slot before reporting so the next decision can use it.
        drop(slot);

        let event = WorkerEvent::Finished {
            handle: self.handle,
            account: self.account.email.clone(),
            outcome,
        };
        if self.events.send(event).await.is_err() {
            warn!(
                "Worker {} outcome dropped: event channel closed",
                self.handle
            );
        }
    }

    async fn drive(&self) -> WorkerOutcome {
        let started = Instant::now();
        let mut jobs_done = 0;

        loop {
            // Cancellation is observed between jobs only.
            if *self.cancel.borrow() {
                return WorkerOutcome::Cancelled;
            }

            let Some(job) = self.source.next_job(&self.account).await else {
                return WorkerOutcome::Completed {
                    jobs_done,
                    elapsed: started.elapsed(),
                };
            };

            let job_started = Instant::now();
            let result = tokio::time::timeout(
                self.job_timeout,
                self.executor.execute(&self.account, &job),
            )
            .await;

            match result {
                Ok(Ok(())) => {
                    self.source.complete(&self.account, &job).await;
                    jobs_done += 1;

                    let elapsed = job_started.elapsed();
                    JOBS_COMPLETED.inc();
                    JOB_DURATION.observe(elapsed.as_secs_f64());

                    let event = WorkerEvent::JobCompleted {
                        handle: self.handle,
                        account: self.account.email.clone(),
                        elapsed,
                    };
                    if self.events.send(event).await.is_err() {
                        warn!("Worker {}: event channel closed", self.handle);
                    }
                }
                Ok(Err(e)) => {
                    JOBS_FAILED.with_label_values(&[e.reason()]).inc();
                    return WorkerOutcome::Failed(e);
                }
                Err(_) => {
                    let e = JobError::Timeout(self.job_timeout);
                    JOBS_FAILED.with_label_values(&[e.reason()]).inc();
                    return WorkerOutcome::Failed(e);
                }
            }
        }
    }
}
