//! Account orchestrator implementation.
//!
//! Assigns accounts to worker slots and turns worker outcomes into account
//! status changes:
//! - Control calls and worker events mutate state under one lock
//! - The lock is never held across an await
//! - Every commit republishes the snapshot before the lock is released
//!
//! One event loop task per run consumes worker events and wakes up for retry
//! deadlines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::account::{Account, AccountRegistry, AccountStatus, AccountSummary, StoreHandle};
use crate::job::{JobExecutor, JobSource};
use crate::metrics::{ACCOUNTS_DISABLED, RETRIES_SCHEDULED, RUNS_STARTED};
use crate::pool::{WorkerEvent, WorkerHandle, WorkerOutcome, WorkerPool};
use crate::status::{AppState, Settings, StatusHandle, StatusPublisher, ThroughputEstimator};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, Phase};

/// Mutable orchestrator state. Only touched under [`Shared::lock`].
struct Inner {
    registry: AccountRegistry,
    phase: Phase,
    running: bool,
    concurrent: usize,
    estimator: ThroughputEstimator,
    /// Workers holding a slot, keyed by handle id.
    handles: HashMap<Uuid, WorkerHandle>,
    /// Logical clock stamped on each dispatch for fairness.
    dispatch_clock: u64,
    /// Incremented on every start; stale event loops exit when it moves.
    run_id: u64,
    /// Concurrency set while the run was starting. Wins over the start argument.
    pending_concurrency: Option<usize>,
}

struct Shared {
    config: OrchestratorConfig,
    inner: Mutex<Inner>,
    pool: WorkerPool,
    source: Arc<dyn JobSource>,
    publisher: StatusPublisher,
    phase_tx: watch::Sender<Phase>,
    events: tokio::sync::Mutex<mpsc::Receiver<WorkerEvent>>,
    store: Option<StoreHandle>,
}

/// Runs jobs for many accounts with a bounded number of concurrent workers.
///
/// Cheaply cloneable; clones share the same state.
#[derive(Clone)]
pub struct AccountOrchestrator {
    shared: Arc<Shared>,
}

impl AccountOrchestrator {
    /// Create a stopped orchestrator over `registry`.
    ///
    /// When `store` is set, every change to the credential set is saved in
    /// the background.
    pub fn new(
        config: OrchestratorConfig,
        registry: AccountRegistry,
        source: Arc<dyn JobSource>,
        executor: Arc<dyn JobExecutor>,
        store: Option<StoreHandle>,
    ) -> Self {
        info!(
            "Creating account orchestrator ({} accounts, source: {}, executor: {})",
            registry.len(),
            source.name(),
            executor.name()
        );

        let concurrent = config.concurrent.max(1);
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let pool = WorkerPool::new(
            concurrent,
            Arc::clone(&source),
            executor,
            config.job_timeout(),
            events_tx,
        );
        let (phase_tx, _) = watch::channel(Phase::Stopped);

        let inner = Inner {
            registry,
            phase: Phase::Stopped,
            running: false,
            concurrent,
            estimator: ThroughputEstimator::new(config.rate_window),
            handles: HashMap::new(),
            dispatch_clock: 0,
            run_id: 0,
            pending_concurrency: None,
        };

        let shared = Shared {
            config,
            inner: Mutex::new(inner),
            pool,
            source,
            publisher: StatusPublisher::new(AppState::default()),
            phase_tx,
            events: tokio::sync::Mutex::new(events_rx),
            store,
        };
        {
            let inner = shared.lock();
            shared.publish(&inner);
        }

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Replace the registry with `accounts` and start a run.
    pub async fn start(
        &self,
        accounts: Vec<Account>,
        concurrency: usize,
    ) -> Result<(), OrchestratorError> {
        self.launch(Some(accounts), concurrency).await
    }

    /// Start a run over the accounts already registered.
    pub async fn start_registered(&self, concurrency: usize) -> Result<(), OrchestratorError> {
        self.launch(None, concurrency).await
    }

    async fn launch(
        &self,
        accounts: Option<Vec<Account>>,
        concurrency: usize,
    ) -> Result<(), OrchestratorError> {
        if concurrency == 0 {
            return Err(OrchestratorError::InvalidConcurrency(concurrency));
        }

        let (run_id, accounts) = self.shared.begin_start(accounts)?;
        info!(
            "Starting orchestrator with {} accounts, concurrency {}",
            accounts.len(),
            concurrency
        );

        if let Err(e) = self.shared.source.prepare(&accounts).await {
            error!(
                "Job source {} failed to prepare run: {}",
                self.shared.source.name(),
                e
            );
            self.shared.cancel_start(run_id);
            return Err(OrchestratorError::JobSource(e));
        }

        if !self.shared.begin_run(run_id, concurrency) {
            info!("Start superseded before the run began");
        }
        Ok(())
    }

    /// Stop the run and wait for every worker to drain.
    ///
    /// In-flight jobs finish (or time out); workers exit at their next
    /// checkpoint. Calling this while stopped is a no-op. Returns the final
    /// snapshot.
    pub async fn stop(&self) -> AppState {
        let mut phase_rx = self.shared.phase_tx.subscribe();
        self.shared.request_stop();

        if phase_rx.wait_for(|p| *p == Phase::Stopped).await.is_err() {
            warn!("Phase channel closed while stopping");
        }
        self.shared.publisher.snapshot()
    }

    /// Change the concurrency ceiling.
    ///
    /// Takes effect at the next scheduling decision. Running workers are
    /// never preempted to satisfy a lower ceiling. A value set while a start
    /// is preparing replaces the concurrency passed to that start.
    pub fn set_concurrency(&self, concurrency: usize) -> Result<(), OrchestratorError> {
        if concurrency == 0 {
            return Err(OrchestratorError::InvalidConcurrency(concurrency));
        }

        let shared = &self.shared;
        let mut guard = shared.lock();
        let inner = &mut *guard;
        let previous = inner.concurrent;

        if inner.phase == Phase::Running {
            shared.set_phase(inner, Phase::Reconfiguring);
            inner.concurrent = concurrency;
            shared.pool.set_capacity(concurrency);
            shared.reschedule(inner);
            if inner.phase == Phase::Reconfiguring {
                shared.set_phase(inner, Phase::Running);
            }
        } else {
            if inner.phase == Phase::Starting {
                inner.pending_concurrency = Some(concurrency);
            }
            inner.concurrent = concurrency;
            shared.pool.set_capacity(concurrency);
            shared.publish(inner);
        }

        if previous != concurrency {
            info!("Concurrency changed from {} to {}", previous, concurrency);
        }
        Ok(())
    }

    /// Apply user settings.
    pub fn apply_settings(&self, settings: Settings) -> Result<(), OrchestratorError> {
        self.set_concurrency(settings.concurrent)
    }

    /// Register an account. While running it becomes eligible immediately.
    pub fn add_account(&self, account: Account) -> Result<(), OrchestratorError> {
        let shared = &self.shared;
        let mut guard = shared.lock();
        let inner = &mut *guard;

        let email = account.email.trim().to_string();
        inner.registry.add(account)?;
        info!("Added account {}", email);

        if inner.running {
            shared.mark_queued(inner);
        }
        shared.reschedule(inner);
        shared.persist(inner);
        Ok(())
    }

    /// Unregister an account. Fails with `InUse` while it holds a worker.
    pub fn remove_account(&self, email: &str) -> Result<Account, OrchestratorError> {
        let shared = &self.shared;
        let mut guard = shared.lock();
        let inner = &mut *guard;

        let account = inner.registry.remove(email)?;
        info!("Removed account {}", email);

        shared.reschedule(inner);
        shared.persist(inner);
        Ok(account)
    }

    /// Replace every account. Only allowed while stopped.
    pub fn set_accounts(&self, accounts: Vec<Account>) -> Result<(), OrchestratorError> {
        let shared = &self.shared;
        let mut guard = shared.lock();
        let inner = &mut *guard;

        if inner.phase != Phase::Stopped {
            return Err(OrchestratorError::AlreadyRunning);
        }
        inner.registry.replace(accounts)?;
        info!("Replaced account list ({} accounts)", inner.registry.len());

        shared.publish(inner);
        shared.persist(inner);
        Ok(())
    }

    /// Return an errored or disabled account to `Idle`.
    pub fn reset_account(&self, email: &str) -> Result<(), OrchestratorError> {
        let shared = &self.shared;
        let mut guard = shared.lock();
        let inner = &mut *guard;

        inner.registry.reset(email)?;
        info!("Reset account {}", email);

        if inner.running {
            shared.mark_queued(inner);
        }
        shared.reschedule(inner);
        Ok(())
    }

    /// Read-only handle on the published state.
    pub fn status(&self) -> StatusHandle {
        self.shared.publisher.handle()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> AppState {
        self.shared.publisher.snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn concurrency(&self) -> usize {
        self.shared.lock().concurrent
    }

    /// Per-account bookkeeping, in registry order.
    pub fn accounts(&self) -> Vec<AccountSummary> {
        self.shared
            .lock()
            .registry
            .list()
            .iter()
            .map(AccountSummary::from)
            .collect()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, inner: &mut Inner, phase: Phase) {
        if inner.phase != phase {
            debug!("Orchestrator phase {} -> {}", inner.phase, phase);
            inner.phase = phase;
            self.phase_tx.send_replace(phase);
        }
    }

    fn has_work(&self, account: &Account) -> bool {
        self.source.pending(account) > 0
    }

    fn snapshot(&self, inner: &Inner) -> AppState {
        let entries = inner.registry.list();
        let jobs_left = entries
            .iter()
            .filter(|e| e.status != AccountStatus::Disabled)
            .map(|e| self.source.pending(&e.account))
            .sum();
        let time_left = if inner.running {
            inner.estimator.time_left(jobs_left)
        } else {
            None
        };

        AppState {
            running: inner.running,
            accounts_num: entries.len(),
            jobs_left,
            concurrent: inner.concurrent,
            time_left,
            account_status: entries.iter().map(|e| e.status.code()).collect(),
        }
    }

    fn publish(&self, inner: &Inner) {
        self.publisher.publish(self.snapshot(inner));
    }

    fn persist(&self, inner: &Inner) {
        if let Some(store) = &self.store {
            store.try_save(inner.registry.accounts());
        }
    }

    /// Mark idle accounts that still have work as waiting for a slot.
    fn mark_queued(&self, inner: &mut Inner) {
        for entry in inner.registry.entries_mut() {
            if entry.status == AccountStatus::Idle && self.source.pending(&entry.account) > 0 {
                entry.status = AccountStatus::Queued;
            }
        }
    }

    /// Fill free slots with eligible accounts, least recently dispatched
    /// first.
    ///
    /// The cap counts workers that still hold a handle, which includes
    /// workers whose slot was released but whose outcome is not yet applied.
    fn dispatch(&self, inner: &mut Inner) {
        if !inner.running || !inner.phase.is_active() {
            return;
        }

        while inner.handles.len() < inner.concurrent {
            let now = Instant::now();
            let Some(account) = inner
                .registry
                .next_eligible(now, |a| self.has_work(a))
                .map(|e| e.account.clone())
            else {
                break;
            };

            let handle = match self.pool.submit(account.clone()) {
                Ok(handle) => handle,
                Err(e) => {
                    debug!("Dispatch deferred: {}", e);
                    break;
                }
            };

            inner.dispatch_clock += 1;
            if let Some(entry) = inner.registry.get_mut(&account.email) {
                entry.status = AccountStatus::Running;
                entry.dispatch_seq = inner.dispatch_clock;
                entry.retry_at = None;
            }
            info!("Dispatched {} to worker {}", account.email, handle.id());
            inner.handles.insert(handle.id(), handle);
        }
    }

    /// Move to `Stopped` once the run has nothing left to do.
    fn settle(&self, inner: &mut Inner) {
        if !inner.handles.is_empty() {
            return;
        }

        let phase = inner.phase;
        match phase {
            Phase::Stopping => {
                self.finish(inner);
                info!("All workers drained, orchestrator stopped");
            }
            Phase::Running | Phase::Reconfiguring if inner.running => {
                let now = Instant::now();
                let eligible = inner
                    .registry
                    .next_eligible(now, |a| self.has_work(a))
                    .is_some();
                if !eligible && inner.registry.next_retry_at(now).is_none() {
                    inner.running = false;
                    self.finish(inner);
                    info!("Run finished: no eligible work left");
                }
            }
            _ => {}
        }
    }

    fn finish(&self, inner: &mut Inner) {
        for entry in inner.registry.entries_mut() {
            if entry.status == AccountStatus::Queued {
                entry.status = AccountStatus::Idle;
            }
        }
        self.set_phase(inner, Phase::Stopped);
    }

    fn reschedule(&self, inner: &mut Inner) {
        self.dispatch(inner);
        self.settle(inner);
        self.publish(inner);
    }

    fn begin_stop(&self, inner: &mut Inner) {
        inner.running = false;
        self.set_phase(inner, Phase::Stopping);
        for handle in inner.handles.values() {
            handle.cancel();
        }
        self.settle(inner);
    }

    /// Abort the run after an invariant violation.
    fn abort(&self, inner: &mut Inner, err: &OrchestratorError) {
        error!("Aborting run: {}", err);
        self.publish(inner);
        self.begin_stop(inner);
        self.publish(inner);
    }

    fn begin_start(
        &self,
        accounts: Option<Vec<Account>>,
    ) -> Result<(u64, Vec<Account>), OrchestratorError> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.phase != Phase::Stopped {
            return Err(OrchestratorError::AlreadyRunning);
        }
        if let Some(accounts) = accounts {
            inner.registry.replace(accounts)?;
            self.persist(inner);
        }

        inner.run_id += 1;
        inner.pending_concurrency = None;
        self.set_phase(inner, Phase::Starting);
        self.publish(inner);
        Ok((inner.run_id, inner.registry.accounts()))
    }

    fn cancel_start(&self, run_id: u64) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.run_id == run_id && inner.phase == Phase::Starting {
            inner.pending_concurrency = None;
            self.set_phase(inner, Phase::Stopped);
            self.publish(inner);
        }
    }

    /// Enter `Running` and spawn the run's event loop. Returns false if the
    /// start was overtaken by a stop.
    fn begin_run(self: &Arc<Self>, run_id: u64, concurrency: usize) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.run_id != run_id || inner.phase != Phase::Starting {
            return false;
        }

        let concurrency = inner.pending_concurrency.take().unwrap_or(concurrency);
        inner.concurrent = concurrency;
        self.pool.set_capacity(concurrency);
        inner.running = true;
        inner.estimator.reset(Instant::now());
        self.mark_queued(inner);
        self.set_phase(inner, Phase::Running);
        RUNS_STARTED.inc();

        tokio::spawn(Arc::clone(self).run_events(run_id));
        self.reschedule(inner);
        true
    }

    fn request_stop(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.phase {
            Phase::Stopped => debug!("Stop requested while already stopped"),
            Phase::Stopping => debug!("Stop already in progress"),
            _ => {
                info!(
                    "Stopping orchestrator ({} workers active)",
                    inner.handles.len()
                );
                self.begin_stop(inner);
                self.publish(inner);
            }
        }
    }

    async fn run_events(self: Arc<Self>, run_id: u64) {
        let mut events = self.events.lock().await;
        let mut phase_rx = self.phase_tx.subscribe();
        debug!("Event loop for run {} started", run_id);

        while let Some(retry_at) = self.next_wakeup(run_id) {
            let retry = async move {
                match retry_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        self.events_closed();
                        break;
                    }
                },
                _ = retry => self.retry_due(),
                changed = phase_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Event loop for run {} exited", run_id);
    }

    /// `None` when the loop for `run_id` should exit, otherwise the next
    /// retry deadline to wake up for.
    fn next_wakeup(&self, run_id: u64) -> Option<Option<Instant>> {
        let inner = self.lock();
        if inner.run_id != run_id || inner.phase == Phase::Stopped {
            return None;
        }
        Some(inner.registry.next_retry_at(Instant::now()))
    }

    fn retry_due(&self) {
        let mut guard = self.lock();
        self.reschedule(&mut guard);
    }

    fn events_closed(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let err = OrchestratorError::Fatal("worker event channel closed".to_string());
        self.abort(inner, &err);
        // No outcome can arrive any more.
        inner.handles.clear();
        self.settle(inner);
        self.publish(inner);
    }

    fn handle_event(&self, event: WorkerEvent) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match self.apply_event(inner, event) {
            Ok(()) => self.reschedule(inner),
            Err(e) => self.abort(inner, &e),
        }
    }

    fn apply_event(&self, inner: &mut Inner, event: WorkerEvent) -> Result<(), OrchestratorError> {
        match event {
            WorkerEvent::JobCompleted {
                handle,
                account,
                elapsed,
            } => {
                if !inner.handles.contains_key(&handle) {
                    return Err(OrchestratorError::Fatal(format!(
                        "job completion from unknown worker {}",
                        handle
                    )));
                }
                let entry = inner.registry.get_mut(&account).ok_or_else(|| {
                    OrchestratorError::Fatal(format!("job completion for unknown account {}", account))
                })?;
                entry.jobs_done += 1;
                entry.failures = 0;
                inner.estimator.record(Instant::now());
                debug!("Job for {} completed in {:?}", account, elapsed);
            }
            WorkerEvent::Finished {
                handle,
                account,
                outcome,
            } => {
                if inner.handles.remove(&handle).is_none() {
                    return Err(OrchestratorError::Fatal(format!(
                        "outcome from unknown worker {}",
                        handle
                    )));
                }
                let entry = inner.registry.get_mut(&account).ok_or_else(|| {
                    OrchestratorError::Fatal(format!("outcome for unknown account {}", account))
                })?;

                match outcome {
                    WorkerOutcome::Completed { jobs_done, elapsed } => {
                        entry.status = AccountStatus::Idle;
                        info!(
                            "Account {} finished {} jobs in {:?}",
                            account, jobs_done, elapsed
                        );
                    }
                    WorkerOutcome::Cancelled => {
                        entry.status = AccountStatus::Idle;
                        info!("Account {} cancelled", account);
                    }
                    WorkerOutcome::Failed(e) => {
                        entry.failures += 1;
                        entry.last_error = Some(e.to_string());
                        entry.last_error_at = Some(Utc::now());

                        if entry.failures >= self.config.retry_budget {
                            entry.status = AccountStatus::Disabled;
                            entry.retry_at = None;
                            ACCOUNTS_DISABLED.inc();
                            warn!(
                                "Disabling account {} after {} consecutive failures: {}",
                                account, entry.failures, e
                            );
                        } else {
                            let backoff = self.config.retry_backoff();
                            entry.status = AccountStatus::Errored;
                            entry.retry_at = Some(Instant::now() + backoff);
                            RETRIES_SCHEDULED.inc();
                            warn!(
                                "Account {} failed ({}/{}), retrying in {:?}: {}",
                                account, entry.failures, self.config.retry_budget, backoff, e
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::job::{FixedJobSource, JobError};
    use crate::orchestrator::ErrorClass;
    use crate::testing::{fixtures, MockJobExecutor};

    fn orchestrator(
        config: OrchestratorConfig,
        jobs: u64,
        executor: &MockJobExecutor,
    ) -> AccountOrchestrator {
        AccountOrchestrator::new(
            config,
            AccountRegistry::new(),
            Arc::new(FixedJobSource::new(jobs)),
            Arc::new(executor.clone()),
            None,
        )
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let executor = MockJobExecutor::new();
        let orch = orchestrator(fixtures::fast_config(2), 1, &executor);

        let state = orch.snapshot();
        assert!(!state.running);
        assert_eq!(state.accounts_num, 0);
        assert_eq!(state.concurrent, 2);
        assert_eq!(state.time_left, None);
        assert_eq!(orch.phase(), Phase::Stopped);
    }

    #[tokio::test]
    async fn test_start_rejects_zero_concurrency() {
        let executor = MockJobExecutor::new();
        let orch = orchestrator(fixtures::fast_config(1), 1, &executor);

        let err = orch
            .start(fixtures::accounts(&["a"]), 0)
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::InvalidConcurrency(0));
        assert_eq!(orch.phase(), Phase::Stopped);
        assert_eq!(orch.snapshot().accounts_num, 0);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_accounts() {
        let executor = MockJobExecutor::new();
        let orch = orchestrator(fixtures::fast_config(1), 1, &executor);

        let mut accounts = fixtures::accounts(&["a"]);
        accounts.push(fixtures::account("a"));
        let err = orch.start(accounts, 1).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(crate::account::RegistryError::DuplicateAccount(_))
        ));
        assert_eq!(orch.phase(), Phase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_rejected() {
        let executor = MockJobExecutor::new();
        executor.set_job_duration(Duration::from_secs(1)).await;
        let orch = orchestrator(fixtures::fast_config(1), 1, &executor);

        orch.start(fixtures::accounts(&["a"]), 1).await.unwrap();
        assert_eq!(orch.phase(), Phase::Running);
        assert_eq!(
            orch.start_registered(1).await.unwrap_err(),
            OrchestratorError::AlreadyRunning
        );
        assert_eq!(
            orch.set_accounts(fixtures::accounts(&["b"])).unwrap_err(),
            OrchestratorError::AlreadyRunning
        );

        orch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_running_account_is_in_use() {
        let executor = MockJobExecutor::new();
        executor.set_job_duration(Duration::from_secs(1)).await;
        let orch = orchestrator(fixtures::fast_config(1), 1, &executor);

        orch.start(fixtures::accounts(&["a", "b"]), 1).await.unwrap();
        let err = orch.remove_account("a@example.com").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Resource);

        // Queued accounts can go
        orch.remove_account("b@example.com").unwrap();
        assert_eq!(orch.snapshot().accounts_num, 1);

        orch.stop().await;
    }

    #[tokio::test]
    async fn test_start_with_no_work_stops_immediately() {
        let executor = MockJobExecutor::new();
        let orch = orchestrator(fixtures::fast_config(1), 1, &executor);

        orch.start(Vec::new(), 1).await.unwrap();
        assert_eq!(orch.phase(), Phase::Stopped);
        assert!(!orch.snapshot().running);
    }

    #[tokio::test]
    async fn test_set_concurrency_while_stopped() {
        let executor = MockJobExecutor::new();
        let orch = orchestrator(fixtures::fast_config(1), 1, &executor);

        orch.apply_settings(Settings { concurrent: 3 }).unwrap();
        assert_eq!(orch.concurrency(), 3);
        assert_eq!(orch.snapshot().concurrent, 3);

        assert_eq!(
            orch.set_concurrency(0).unwrap_err(),
            OrchestratorError::InvalidConcurrency(0)
        );
        assert_eq!(orch.snapshot().concurrent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_disabled_account() {
        let executor = MockJobExecutor::new();
        executor.fail_always("a@example.com").await;
        let mut config = fixtures::fast_config(1);
        config.retry_budget = 1;
        let orch = orchestrator(config, 1, &executor);

        orch.start(fixtures::accounts(&["a"]), 1).await.unwrap();
        let state = orch.status().wait_for(|s| !s.running).await.unwrap();
        assert_eq!(state.account_status, vec![AccountStatus::Disabled.code()]);
        assert_eq!(state.jobs_left, 0);

        let summary = &orch.accounts()[0];
        assert_eq!(summary.failures, 1);
        assert!(summary.last_error.is_some());

        orch.reset_account("a@example.com").unwrap();
        let summary = &orch.accounts()[0];
        assert_eq!(summary.status, AccountStatus::Idle);
        assert_eq!(summary.failures, 0);
        assert_eq!(orch.snapshot().jobs_left, 1);
    }

    #[tokio::test]
    async fn test_prepare_failure_returns_to_stopped() {
        use async_trait::async_trait;
        use crate::job::Job;

        struct BrokenSource;

        #[async_trait]
        impl JobSource for BrokenSource {
            fn name(&self) -> &str {
                "broken"
            }
            fn pending(&self, _account: &Account) -> u64 {
                1
            }
            async fn prepare(&self, _accounts: &[Account]) -> Result<(), JobError> {
                Err(JobError::Launch("service unreachable".to_string()))
            }
            async fn next_job(&self, _account: &Account) -> Option<Job> {
                None
            }
            async fn complete(&self, _account: &Account, _job: &Job) {}
        }

        let orch = AccountOrchestrator::new(
            fixtures::fast_config(1),
            AccountRegistry::new(),
            Arc::new(BrokenSource),
            Arc::new(MockJobExecutor::new()),
            None,
        );

        let err = orch
            .start(fixtures::accounts(&["a"]), 1)
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Execution);
        assert_eq!(orch.phase(), Phase::Stopped);
        assert!(!orch.snapshot().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_concurrency_while_starting_is_kept() {
        use async_trait::async_trait;
        use crate::job::Job;

        /// Takes a while to get ready.
        struct SlowSource(FixedJobSource);

        #[async_trait]
        impl JobSource for SlowSource {
            fn name(&self) -> &str {
                "slow"
            }
            fn pending(&self, account: &Account) -> u64 {
                self.0.pending(account)
            }
            async fn prepare(&self, accounts: &[Account]) -> Result<(), JobError> {
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.0.prepare(accounts).await
            }
            async fn next_job(&self, account: &Account) -> Option<Job> {
                self.0.next_job(account).await
            }
            async fn complete(&self, account: &Account, job: &Job) {
                self.0.complete(account, job).await
            }
        }

        let executor = MockJobExecutor::new();
        executor.set_job_duration(Duration::from_secs(2)).await;
        let orch = AccountOrchestrator::new(
            fixtures::fast_config(1),
            AccountRegistry::new(),
            Arc::new(SlowSource(FixedJobSource::new(1))),
            Arc::new(executor.clone()),
            None,
        );

        let mut phase_rx = orch.shared.phase_tx.subscribe();
        let starting = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.start(fixtures::accounts(&["a", "b", "c"]), 1).await })
        };
        phase_rx.wait_for(|p| *p == Phase::Starting).await.unwrap();

        orch.set_concurrency(3).unwrap();
        starting.await.unwrap().unwrap();

        assert_eq!(orch.phase(), Phase::Running);
        assert_eq!(orch.concurrency(), 3);
        let state = orch.snapshot();
        assert_eq!(state.concurrent, 3);
        assert_eq!(state.account_status, vec![AccountStatus::Running.code(); 3]);

        orch.stop().await;

        // The next start uses its own argument again
        orch.start_registered(2).await.unwrap();
        assert_eq!(orch.concurrency(), 2);
        orch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_from_unknown_worker_aborts_run() {
        let executor = MockJobExecutor::new();
        executor.set_job_duration(Duration::from_secs(1)).await;
        let orch = orchestrator(fixtures::fast_config(1), 10, &executor);

        orch.start(fixtures::accounts(&["a"]), 1).await.unwrap();
        assert_eq!(orch.phase(), Phase::Running);
        assert_eq!(orch.shared.lock().handles.len(), 1);

        let mut phase_rx = orch.shared.phase_tx.subscribe();
        orch.shared.handle_event(WorkerEvent::Finished {
            handle: Uuid::new_v4(),
            account: "a@example.com".to_string(),
            outcome: WorkerOutcome::Cancelled,
        });

        {
            let inner = orch.shared.lock();
            assert!(!inner.running);
            assert!(inner.handles.values().all(|h| h.is_cancelled()));
        }
        assert!(!orch.snapshot().running);

        phase_rx.wait_for(|p| *p == Phase::Stopped).await.unwrap();
        let state = orch.snapshot();
        assert!(!state.running);
        assert_eq!(state.account_status, vec![AccountStatus::Idle.code()]);
        assert!(state.jobs_left > 0);
        assert!(orch.shared.lock().handles.is_empty());
    }
}
