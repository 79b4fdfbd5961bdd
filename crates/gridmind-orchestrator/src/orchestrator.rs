// gridmind-orchestrator/src/orchestrator.rs
// ============================================================================
// Module: Job Orchestrator
// Description: Submission, dispatch loop, cancellation, retry, and stats.
// Purpose: Govern the training worker pool against durable job state.
// Dependencies: gridmind-config, gridmind-core, tokio
// ============================================================================

//! ## Overview
//! The job row is the single synchronization point for a job's state; the
//! dispatch loop claims queued work with a status-guarded update, spawns an
//! owned execution task per claim, and returns the slot on completion. The
//! cancel path takes the same task-map lock as dispatch, so the two never
//! race on one job. Every spawned task is owned here and aborted on
//! shutdown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use gridmind_config::OrchestratorConfig;
use gridmind_core::CancelFlag;
use gridmind_core::Event;
use gridmind_core::EventSink;
use gridmind_core::ExecutionContext;
use gridmind_core::Executor;
use gridmind_core::JobFilters;
use gridmind_core::JobId;
use gridmind_core::JobLogEntry;
use gridmind_core::JobPage;
use gridmind_core::JobStats;
use gridmind_core::JobStatus;
use gridmind_core::JobStore;
use gridmind_core::LogLevel;
use gridmind_core::ModelKind;
use gridmind_core::ModelName;
use gridmind_core::PlatformError;
use gridmind_core::ProgressSink;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::TrainingConfig;
use gridmind_core::TrainingJob;
use gridmind_core::TrainingMetrics;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

// ============================================================================
// SECTION: Duration Estimate
// ============================================================================

/// Base single-worker training time in seconds.
const BASE_SECONDS: f64 = 180.0;
/// Additional seconds per HPO trial.
const SECONDS_PER_TRIAL: f64 = 30.0;
/// Training span beyond which the estimate doubles, in days.
const LONG_SPAN_DAYS: i64 = 365;

/// Coarse, informational duration estimate for a submission.
#[must_use]
pub fn estimate_duration_seconds(config: &TrainingConfig) -> u64 {
    let workers = f64::from(config.n_workers.max(1));
    let mut estimate = BASE_SECONDS / workers;
    if config.enable_hpo {
        estimate += f64::from(config.n_trials) * SECONDS_PER_TRIAL / workers;
    }
    if config.start_date.days_until(config.end_date) > LONG_SPAN_DAYS {
        estimate *= 2.0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The estimate is a bounded positive number of seconds."
    )]
    let seconds = estimate.max(0.0).round() as u64;
    seconds
}

// ============================================================================
// SECTION: Submission Types
// ============================================================================

/// One job submission.
#[derive(Debug, Clone)]
pub struct SubmitJob {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model to train.
    pub model_kind: ModelKind,
    /// Logical model name.
    pub model_name: ModelName,
    /// Training configuration snapshot.
    pub config: TrainingConfig,
    /// Priority; higher dispatches sooner.
    pub priority: i32,
    /// Optional schedule expression.
    pub schedule: Option<String>,
    /// Free-form tags.
    pub tags: BTreeMap<String, String>,
}

/// Receipt returned for an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    /// The queued job.
    pub job: TrainingJob,
    /// Informational duration estimate in seconds.
    pub estimated_duration_seconds: u64,
}

// ============================================================================
// SECTION: Progress Sink
// ============================================================================

/// Durable progress writer backed by the job store.
pub struct StoreProgressSink {
    /// Job store receiving progress and log writes.
    store: Arc<dyn JobStore>,
}

impl StoreProgressSink {
    /// Creates a sink over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }
}

impl ProgressSink for StoreProgressSink {
    fn report(
        &self,
        job_id: &JobId,
        progress: f64,
        metrics: Option<&TrainingMetrics>,
    ) -> Result<(), PlatformError> {
        Ok(self.store.update_progress(job_id, progress.clamp(0.0, 1.0), metrics, Timestamp::now())?)
    }

    fn log(&self, job_id: &JobId, level: LogLevel, message: &str) -> Result<(), PlatformError> {
        Ok(self.store.append_log(
            job_id,
            &JobLogEntry { at: Timestamp::now(), level, message: message.to_string() },
        )?)
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// One running execution task owned by the orchestrator.
struct RunningJob {
    /// Task handle, aborted on cancel and shutdown.
    handle: JoinHandle<()>,
    /// Cooperative cancellation flag shared with the executor.
    cancel: CancelFlag,
}

/// Priority-queue orchestrator over durable job state.
pub struct Orchestrator {
    /// Durable job store.
    store: Arc<dyn JobStore>,
    /// Injected executor (the concrete pipeline at composition time).
    executor: Arc<dyn Executor>,
    /// Orchestrator configuration.
    config: OrchestratorConfig,
    /// Observability sink.
    events: Arc<dyn EventSink>,
    /// Free execution slots.
    slots: Arc<Semaphore>,
    /// Owned execution tasks keyed by job id.
    running: Mutex<HashMap<JobId, RunningJob>>,
    /// Handle of the dispatch loop once spawned.
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Creates an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn Executor>,
        config: OrchestratorConfig,
        events: Arc<dyn EventSink>,
    ) -> Arc<Self> {
        let slots =
            Arc::new(Semaphore::new(usize::try_from(config.max_concurrent_jobs).unwrap_or(1)));
        Arc::new(Self {
            store,
            executor,
            config,
            events,
            slots,
            running: Mutex::new(HashMap::new()),
            dispatcher: Mutex::new(None),
        })
    }

    /// Accepts a submission, persisting the job as queued.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for invalid configurations.
    pub fn submit(&self, request: SubmitJob) -> Result<SubmissionReceipt, PlatformError> {
        request.config.validate()?;
        let now = Timestamp::now();
        let job = TrainingJob {
            job_id: JobId::generate(),
            tenant_id: request.tenant_id,
            model_kind: request.model_kind,
            model_name: request.model_name,
            priority: request.priority,
            status: JobStatus::Queued,
            progress: 0.0,
            metrics: None,
            model_id: None,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            schedule: request.schedule,
            tags: request.tags,
            config: request.config,
        };
        self.store.insert_job(&job)?;
        let estimated_duration_seconds = estimate_duration_seconds(&job.config);
        self.emit(LogLevel::Info, "job queued", &job.job_id);
        Ok(SubmissionReceipt { job, estimated_duration_seconds })
    }

    /// Loads one job.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] for unknown ids.
    pub fn get_job(&self, job_id: &JobId) -> Result<TrainingJob, PlatformError> {
        self.store
            .get_job(job_id)?
            .ok_or_else(|| PlatformError::NotFound(format!("job not found: {job_id}")))
    }

    /// Lists jobs with the server-side page-size cap applied.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store query fails.
    pub fn list_jobs(
        &self,
        filters: &JobFilters,
        page: u32,
        page_size: u32,
    ) -> Result<JobPage, PlatformError> {
        let capped = page_size.clamp(1, self.config.max_page_size);
        Ok(self.store.list_jobs(filters, page.max(1), capped)?)
    }

    /// Returns the last `tail` log entries of a job.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] for unknown ids.
    pub fn tail_logs(
        &self,
        job_id: &JobId,
        tail: u32,
        level: Option<LogLevel>,
    ) -> Result<Vec<JobLogEntry>, PlatformError> {
        let _ = self.get_job(job_id)?;
        Ok(self.store.tail_logs(job_id, tail, level)?)
    }

    /// Cancels a queued or running job.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] for unknown ids and
    /// [`PlatformError::Precondition`] for terminal jobs.
    pub fn cancel(&self, job_id: &JobId) -> Result<(), PlatformError> {
        let job = self.get_job(job_id)?;
        if job.status.is_terminal() {
            return Err(PlatformError::Precondition(format!(
                "job already {}: {job_id}",
                job.status
            )));
        }
        // The cancel path and the dispatch loop share this lock, so the two
        // never race on one job id.
        {
            let mut running = self
                .running
                .lock()
                .map_err(|_| PlatformError::Internal("task map poisoned".to_string()))?;
            if let Some(task) = running.remove(job_id) {
                task.cancel.cancel();
                task.handle.abort();
            }
        }
        if !self.store.mark_cancelled(job_id, Timestamp::now())? {
            return Err(PlatformError::Precondition(format!(
                "job reached a terminal state first: {job_id}"
            )));
        }
        self.emit(LogLevel::Info, "job cancelled", job_id);
        Ok(())
    }

    /// Retries a job by deep-copying its configuration and tags into a new
    /// submission tagged `retry_of`; the original is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the original is absent.
    pub fn retry(&self, job_id: &JobId) -> Result<SubmissionReceipt, PlatformError> {
        let original = self.get_job(job_id)?;
        let mut tags = original.tags.clone();
        tags.insert("retry_of".to_string(), original.job_id.to_string());
        self.submit(SubmitJob {
            tenant_id: original.tenant_id,
            model_kind: original.model_kind,
            model_name: original.model_name,
            config: original.config,
            priority: original.priority,
            schedule: original.schedule,
            tags,
        })
    }

    /// Returns aggregate queue statistics.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store query fails.
    pub fn stats(&self) -> Result<JobStats, PlatformError> {
        let counts = self.store.count_by_status()?;
        let running = counts.get(&JobStatus::Running).copied().unwrap_or(0);
        let capacity = self.config.max_concurrent_jobs;
        Ok(JobStats {
            counts: counts
                .into_iter()
                .map(|(status, count)| (status.as_str().to_string(), count))
                .collect(),
            capacity,
            running,
            utilization: running as f64 / f64::from(capacity.max(1)),
        })
    }

    /// Spawns the dispatch loop; idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut dispatcher = match self.dispatcher.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if dispatcher.is_some() {
            return;
        }
        let orchestrator = Arc::clone(self);
        *dispatcher = Some(tokio::spawn(async move {
            orchestrator.dispatch_loop().await;
        }));
    }

    /// Aborts the dispatch loop and every owned execution task.
    pub fn shutdown(&self) {
        if let Ok(mut dispatcher) = self.dispatcher.lock() {
            if let Some(handle) = dispatcher.take() {
                handle.abort();
            }
        }
        if let Ok(mut running) = self.running.lock() {
            for (_, task) in running.drain() {
                task.cancel.cancel();
                task.handle.abort();
            }
        }
    }

    /// Dispatch loop: claim queued work whenever a slot frees up.
    async fn dispatch_loop(self: Arc<Self>) {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
                return;
            };
            match self.store.claim_next_queued(Timestamp::now()) {
                Ok(Some(job)) => {
                    self.spawn_execution(job, permit);
                }
                Ok(None) => {
                    drop(permit);
                    tokio::time::sleep(poll_interval).await;
                }
                Err(err) => {
                    self.emit_message(LogLevel::Error, &format!("claim failed: {err}"));
                    drop(permit);
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    /// Spawns one owned execution task for a claimed job.
    fn spawn_execution(
        self: &Arc<Self>,
        job: TrainingJob,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) {
        let cancel = CancelFlag::new();
        let context = ExecutionContext {
            progress: Arc::new(StoreProgressSink::new(Arc::clone(&self.store))),
            cancel: cancel.clone(),
        };
        let orchestrator = Arc::clone(self);
        let job_id = job.job_id;
        // Hold the map lock across the spawn so the task's own removal
        // cannot run before its entry exists.
        let Ok(mut running) = self.running.lock() else { return };
        let handle = tokio::spawn(async move {
            let _permit = permit;
            orchestrator.execute_claimed(job, &context).await;
            if let Ok(mut running) = orchestrator.running.lock() {
                running.remove(&job_id);
            }
        });
        running.insert(job_id, RunningJob { handle, cancel });
    }

    /// Executes one claimed job and records its terminal state. The soft
    /// execution budget is the per-stage timeout across all five stages;
    /// exceeding it fails the job with a timeout error.
    async fn execute_claimed(&self, job: TrainingJob, context: &ExecutionContext) {
        let job_id = job.job_id;
        self.emit(LogLevel::Info, "job started", &job_id);
        let budget = Duration::from_secs(self.config.stage_timeout_seconds.saturating_mul(5));
        let outcome = match tokio::time::timeout(budget, self.executor.execute(&job, context))
            .await
        {
            Ok(outcome) => outcome,
            // The expired future is dropped; no further stage can run.
            Err(_) => Err(PlatformError::Timeout(format!(
                "stage budget exceeded after {}s",
                budget.as_secs()
            ))),
        };
        match outcome {
            Ok(outcome) => {
                if let Err(err) = self.store.mark_completed(
                    &job_id,
                    &outcome.model_id,
                    &outcome.metrics,
                    Timestamp::now(),
                ) {
                    self.emit_message(
                        LogLevel::Error,
                        &format!("completion write failed for {job_id}: {err}"),
                    );
                } else {
                    self.emit(LogLevel::Info, "job completed", &job_id);
                }
            }
            Err(err) => {
                if context.cancel.is_cancelled() {
                    // The cancel path already owns the terminal transition.
                    return;
                }
                match self.store.mark_failed(&job_id, err.message(), Timestamp::now()) {
                    Ok(()) => self.emit(LogLevel::Warning, "job failed", &job_id),
                    Err(write_err) => self.emit_message(
                        LogLevel::Error,
                        &format!("failure write lost for {job_id}: {write_err}"),
                    ),
                }
            }
        }
    }

    /// Emits a job-scoped event.
    fn emit(&self, level: LogLevel, message: &str, job_id: &JobId) {
        let mut correlation = BTreeMap::new();
        correlation.insert("job_id".to_string(), job_id.to_string());
        self.events.emit(&Event {
            at: Timestamp::now(),
            level,
            component: "orchestrator".to_string(),
            message: message.to_string(),
            correlation,
        });
    }

    /// Emits an orchestrator-scoped event.
    fn emit_message(&self, level: LogLevel, message: &str) {
        self.events.emit(&Event {
            at: Timestamp::now(),
            level,
            component: "orchestrator".to_string(),
            message: message.to_string(),
            correlation: BTreeMap::new(),
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
