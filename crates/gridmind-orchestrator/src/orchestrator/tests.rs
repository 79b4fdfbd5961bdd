#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use gridmind_core::ExecutionOutcome;
use gridmind_store_sqlite::SqliteStore;

use super::*;

/// Event sink discarding everything.
struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &Event) {}
}

/// Scripted executor driving the stage milestones.
struct ScriptedExecutor {
    /// Job ids that actually executed.
    executed: Mutex<Vec<JobId>>,
    /// Per-stage delay.
    stage_delay: Duration,
    /// True to fail after the second milestone.
    fail: AtomicBool,
}

impl ScriptedExecutor {
    fn new(stage_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            executed: Mutex::new(Vec::new()),
            stage_delay,
            fail: AtomicBool::new(false),
        })
    }

    fn executed_ids(&self) -> Vec<JobId> {
        self.executed.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(
        &self,
        job: &TrainingJob,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionOutcome, PlatformError> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(job.job_id);
        }
        for milestone in [0.20, 0.40, 0.70, 0.85] {
            if ctx.cancel.is_cancelled() {
                return Err(PlatformError::Conflict("cancelled".to_string()));
            }
            ctx.progress.report(&job.job_id, milestone, None)?;
            if milestone > 0.4 && self.fail.load(Ordering::SeqCst) {
                return Err(PlatformError::Internal("scripted failure".to_string()));
            }
            tokio::time::sleep(self.stage_delay).await;
        }
        let mut metrics = TrainingMetrics::new();
        metrics.set("mae", 12.0);
        ctx.progress.report(&job.job_id, 1.0, Some(&metrics))?;
        Ok(ExecutionOutcome {
            model_id: format!("{}:{}:v1", job.tenant_id, job.model_name),
            metrics,
        })
    }
}

fn sample_config() -> TrainingConfig {
    TrainingConfig {
        start_date: Timestamp::from_unix_millis(1_735_689_600_000),
        end_date: Timestamp::from_unix_millis(1_740_787_200_000),
        feature_set: "forecast_basic".to_string(),
        target_column: "load_kw".to_string(),
        horizon: 24,
        validation_split: 0.15,
        test_split: 0.15,
        enable_hpo: false,
        n_trials: 20,
        hyperparameters: BTreeMap::new(),
        early_stopping: false,
        random_seed: 42,
        n_workers: 1,
        register_model: true,
    }
}

fn submission(priority: i32) -> SubmitJob {
    SubmitJob {
        tenant_id: TenantId::from("tenant-a"),
        model_kind: ModelKind::Forecast,
        model_name: ModelName::from("load_forecast"),
        config: sample_config(),
        priority,
        schedule: None,
        tags: BTreeMap::new(),
    }
}

fn orchestrator_fixture(
    max_concurrent: u32,
    executor: Arc<ScriptedExecutor>,
) -> Arc<Orchestrator> {
    let store = Arc::new(SqliteStore::open_in_memory().expect("open"));
    let config = OrchestratorConfig {
        max_concurrent_jobs: max_concurrent,
        poll_interval_ms: 10,
        ..OrchestratorConfig::default()
    };
    Orchestrator::new(store, executor, config, Arc::new(NoopSink))
}

async fn wait_for_terminal(orchestrator: &Orchestrator, job_id: &JobId) -> TrainingJob {
    for _ in 0 .. 1_000 {
        let job = orchestrator.get_job(job_id).expect("job");
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never reached a terminal state");
}

// ============================================================================
// SECTION: Submission / Estimates
// ============================================================================

#[test]
fn estimate_follows_the_published_formula() {
    let base = sample_config();
    assert_eq!(estimate_duration_seconds(&base), 180);
    let mut hpo = sample_config();
    hpo.enable_hpo = true;
    assert_eq!(estimate_duration_seconds(&hpo), 180 + 600);
    let mut wide = sample_config();
    wide.end_date =
        Timestamp::from_unix_millis(wide.start_date.unix_millis() + 400 * 86_400_000);
    assert_eq!(estimate_duration_seconds(&wide), 360);
    let mut workers = sample_config();
    workers.n_workers = 2;
    assert_eq!(estimate_duration_seconds(&workers), 90);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_queues_with_estimate() {
    let orchestrator = orchestrator_fixture(1, ScriptedExecutor::new(Duration::from_millis(1)));
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    assert_eq!(receipt.job.status, JobStatus::Queued);
    assert!((receipt.job.progress - 0.0).abs() < f64::EPSILON);
    assert_eq!(receipt.estimated_duration_seconds, 180);
    let loaded = orchestrator.get_job(&receipt.job.job_id).expect("get");
    assert_eq!(loaded.status, JobStatus::Queued);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_submissions_are_rejected() {
    let orchestrator = orchestrator_fixture(1, ScriptedExecutor::new(Duration::from_millis(1)));
    let mut bad = submission(0);
    bad.config.test_split = 0.9;
    bad.config.validation_split = 0.5;
    assert!(matches!(orchestrator.submit(bad), Err(PlatformError::Validation(_))));
}

// ============================================================================
// SECTION: Dispatch / Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn dispatched_job_completes_with_full_progress() {
    let executor = ScriptedExecutor::new(Duration::from_millis(5));
    let orchestrator = orchestrator_fixture(1, executor.clone());
    orchestrator.start();
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    let job = wait_for_terminal(&orchestrator, &receipt.job.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!((job.progress - 1.0).abs() < f64::EPSILON);
    assert!(job.completed_at.is_some());
    assert!(job.model_id.expect("model id").starts_with("tenant-a:load_forecast:"));
    assert_eq!(executor.executed_ids().len(), 1);
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn progress_is_monotone_while_running() {
    let executor = ScriptedExecutor::new(Duration::from_millis(20));
    let orchestrator = orchestrator_fixture(1, executor);
    orchestrator.start();
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    let mut observed = Vec::new();
    loop {
        let job = orchestrator.get_job(&receipt.job.job_id).expect("job");
        observed.push(job.progress);
        if job.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    for pair in observed.windows(2) {
        assert!(pair[1] >= pair[0], "progress regressed: {observed:?}");
    }
    assert!((observed.last().copied().unwrap_or_default() - 1.0).abs() < f64::EPSILON);
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_queued_job_before_dispatch() {
    // Scenario: with one slot, the second submission waits queued; a
    // prompt cancel must terminate it without ever spawning execution.
    let executor = ScriptedExecutor::new(Duration::from_millis(50));
    let orchestrator = orchestrator_fixture(1, executor.clone());
    orchestrator.start();
    let first = orchestrator.submit(submission(0)).expect("submit");
    let second = orchestrator.submit(submission(0)).expect("submit");
    orchestrator.cancel(&second.job.job_id).expect("cancel");
    let cancelled = orchestrator.get_job(&second.job.job_id).expect("job");
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    let completed = wait_for_terminal(&orchestrator, &first.job.job_id).await;
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(executor.executed_ids(), vec![first.job.job_id]);
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_running_job_aborts_execution() {
    let executor = ScriptedExecutor::new(Duration::from_millis(200));
    let orchestrator = orchestrator_fixture(1, executor);
    orchestrator.start();
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    // Wait until the dispatch loop claims it.
    for _ in 0 .. 200 {
        if orchestrator.get_job(&receipt.job.job_id).expect("job").status
            == JobStatus::Running
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    orchestrator.cancel(&receipt.job.job_id).expect("cancel");
    let job = wait_for_terminal(&orchestrator, &receipt.job.job_id).await;
    assert_eq!(job.status, JobStatus::Cancelled);
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_terminal_job_is_a_precondition_error() {
    let executor = ScriptedExecutor::new(Duration::from_millis(1));
    let orchestrator = orchestrator_fixture(1, executor);
    orchestrator.start();
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    wait_for_terminal(&orchestrator, &receipt.job.job_id).await;
    assert!(matches!(
        orchestrator.cancel(&receipt.job.job_id),
        Err(PlatformError::Precondition(_))
    ));
    assert!(matches!(
        orchestrator.cancel(&JobId::generate()),
        Err(PlatformError::NotFound(_))
    ));
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_execution_records_the_error() {
    let executor = ScriptedExecutor::new(Duration::from_millis(1));
    executor.fail.store(true, Ordering::SeqCst);
    let orchestrator = orchestrator_fixture(1, executor);
    orchestrator.start();
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    let job = wait_for_terminal(&orchestrator, &receipt.job.job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("scripted failure"));
    assert!(job.progress < 1.0);
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_stage_budget_fails_with_a_timeout() {
    let executor = ScriptedExecutor::new(Duration::from_secs(30));
    let store = Arc::new(SqliteStore::open_in_memory().expect("open"));
    let config = OrchestratorConfig {
        max_concurrent_jobs: 1,
        stage_timeout_seconds: 1,
        poll_interval_ms: 10,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(store, executor, config, Arc::new(NoopSink));
    orchestrator.start();
    let receipt = orchestrator.submit(submission(0)).expect("submit");
    let job = wait_for_terminal(&orchestrator, &receipt.job.job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.expect("error").contains("stage budget exceeded"));
    orchestrator.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_copies_config_and_tags_the_origin() {
    let executor = ScriptedExecutor::new(Duration::from_millis(1));
    let orchestrator = orchestrator_fixture(1, executor);
    let receipt = orchestrator.submit(submission(2)).expect("submit");
    let retry = orchestrator.retry(&receipt.job.job_id).expect("retry");
    assert_ne!(retry.job.job_id, receipt.job.job_id);
    assert_eq!(retry.job.config, receipt.job.config);
    assert_eq!(retry.job.priority, 2);
    assert_eq!(
        retry.job.tags.get("retry_of"),
        Some(&receipt.job.job_id.to_string())
    );
    // The original is untouched.
    let original = orchestrator.get_job(&receipt.job.job_id).expect("job");
    assert!(original.tags.is_empty());
}

// ============================================================================
// SECTION: Listing / Stats
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn listing_caps_the_page_size() {
    let executor = ScriptedExecutor::new(Duration::from_millis(1));
    let orchestrator = orchestrator_fixture(1, executor);
    for _ in 0 .. 5 {
        orchestrator.submit(submission(0)).expect("submit");
    }
    let page = orchestrator
        .list_jobs(&JobFilters::default(), 1, 100_000)
        .expect("list");
    assert_eq!(page.page_size, 100);
    assert_eq!(page.total, 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn stats_report_capacity_and_utilization() {
    let executor = ScriptedExecutor::new(Duration::from_millis(100));
    let orchestrator = orchestrator_fixture(2, executor);
    orchestrator.start();
    let first = orchestrator.submit(submission(0)).expect("submit");
    let _second = orchestrator.submit(submission(0)).expect("submit");
    // Wait until at least one job runs.
    for _ in 0 .. 200 {
        let stats = orchestrator.stats().expect("stats");
        if stats.running > 0 {
            assert_eq!(stats.capacity, 2);
            assert!(stats.utilization > 0.0);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    wait_for_terminal(&orchestrator, &first.job.job_id).await;
    orchestrator.shutdown();
}
