//! Mock job executor for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::account::Account;
use crate::job::{Job, JobError, JobExecutor};

/// A recorded execution for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    /// Account the job ran for.
    pub account: String,
    /// Job sequence number.
    pub seq: u64,
    /// Whether the execution succeeded.
    pub success: bool,
}

/// Mock implementation of the JobExecutor trait.
///
/// Provides controllable behavior for testing:
/// - Record executions in start order
/// - Script failures per account (next N calls, or always)
/// - Simulate job duration and jobs that never return
/// - Track peak concurrency across accounts
///
/// # Example
///
/// ```rust,ignore
/// use claimer_core::testing::MockJobExecutor;
///
/// let executor = MockJobExecutor::new();
/// executor.fail_next("a@example.com", JobError::Failed("nope".into())).await;
///
/// // ... run the orchestrator ...
///
/// assert_eq!(executor.started_order().await[0], "a@example.com");
/// ```
#[derive(Debug, Clone)]
pub struct MockJobExecutor {
    /// Finished executions.
    executions: Arc<RwLock<Vec<RecordedExecution>>>,
    /// Accounts in the order their jobs started.
    started: Arc<RwLock<Vec<String>>>,
    /// Scripted errors, consumed one per call.
    next_errors: Arc<RwLock<HashMap<String, VecDeque<JobError>>>>,
    /// Accounts whose jobs always fail.
    always_fail: Arc<RwLock<HashSet<String>>>,
    /// Accounts whose jobs never return.
    hanging: Arc<RwLock<HashSet<String>>>,
    /// Simulated job duration in milliseconds.
    job_duration_ms: Arc<RwLock<u64>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for MockJobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockJobExecutor {
    /// Create a new mock executor. Jobs succeed immediately.
    pub fn new() -> Self {
        Self {
            executions: Arc::new(RwLock::new(Vec::new())),
            started: Arc::new(RwLock::new(Vec::new())),
            next_errors: Arc::new(RwLock::new(HashMap::new())),
            always_fail: Arc::new(RwLock::new(HashSet::new())),
            hanging: Arc::new(RwLock::new(HashSet::new())),
            job_duration_ms: Arc::new(RwLock::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the simulated job duration.
    pub async fn set_job_duration(&self, duration: Duration) {
        *self.job_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Make the next job for `account` fail with `error`.
    ///
    /// Calls queue up: scripting two errors fails the next two jobs.
    pub async fn fail_next(&self, account: &str, error: JobError) {
        self.next_errors
            .write()
            .await
            .entry(account.to_string())
            .or_default()
            .push_back(error);
    }

    /// Make every job for `account` fail.
    pub async fn fail_always(&self, account: &str) {
        self.always_fail.write().await.insert(account.to_string());
    }

    /// Stop failing jobs for `account`.
    pub async fn clear_failures(&self, account: &str) {
        self.always_fail.write().await.remove(account);
        self.next_errors.write().await.remove(account);
    }

    /// Make every job for `account` hang forever.
    pub async fn hang(&self, account: &str) {
        self.hanging.write().await.insert(account.to_string());
    }

    /// Get all finished executions.
    pub async fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.read().await.clone()
    }

    /// Number of finished executions.
    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    /// Number of finished executions for one account.
    pub async fn execution_count_for(&self, account: &str) -> usize {
        self.executions
            .read()
            .await
            .iter()
            .filter(|e| e.account == account)
            .count()
    }

    /// Accounts in the order their jobs started.
    pub async fn started_order(&self) -> Vec<String> {
        self.started.read().await.clone()
    }

    /// Highest number of jobs observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Jobs currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn scripted_error(&self, account: &str) -> Option<JobError> {
        if let Some(err) = self
            .next_errors
            .write()
            .await
            .get_mut(account)
            .and_then(|q| q.pop_front())
        {
            return Some(err);
        }
        if self.always_fail.read().await.contains(account) {
            return Some(JobError::Failed("mock failure".to_string()));
        }
        None
    }
}

/// Decrements the in-flight counter even when the job future is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobExecutor for MockJobExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, account: &Account, job: &Job) -> Result<(), JobError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(Arc::clone(&self.in_flight));

        self.started.write().await.push(account.email.clone());

        if self.hanging.read().await.contains(&account.email) {
            std::future::pending::<()>().await;
        }

        let duration_ms = *self.job_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let result = match self.scripted_error(&account.email).await {
            Some(err) => Err(err),
            None => Ok(()),
        };

        self.executions.write().await.push(RecordedExecution {
            account: account.email.clone(),
            seq: job.seq,
            success: result.is_ok(),
        });

        result
    }
}
