// gridmind-api/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: Thin axum handlers over the platform vocabulary.
// Purpose: Parse requests, delegate to the core, and serialize responses.
// Dependencies: gridmind-core, axum, serde
// ============================================================================

//! ## Overview
//! Handlers add no behavior: every request parses into typed inputs, calls
//! one core operation, and serializes its result. Submissions and retries
//! answer 201; exports answer 202 with the durable export record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use base64::Engine;
use gridmind_core::AssetId;
use gridmind_core::ExportStatus;
use gridmind_core::JobFilters;
use gridmind_core::JobId;
use gridmind_core::JobLogEntry;
use gridmind_core::JobStats;
use gridmind_core::LogLevel;
use gridmind_core::ModelKind;
use gridmind_core::ModelName;
use gridmind_core::ModelStage;
use gridmind_core::ModelVersionRef;
use gridmind_core::PlatformError;
use gridmind_core::RunId;
use gridmind_core::RunStatus;
use gridmind_core::StudyName;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::TrainingConfig;
use gridmind_core::TrainingJob;
use gridmind_core::best_trial;
use gridmind_core::feature_set_names;
use gridmind_orchestrator::SubmitJob;
use gridmind_registry::RegisterRequest;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;
use crate::platform::Platform;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the full API router over a platform.
#[must_use]
pub fn router(platform: Arc<Platform>) -> Router {
    Router::new()
        .route("/training/jobs/start", post(start_job))
        .route("/training/jobs", get(list_jobs))
        .route("/training/jobs/{id}", get(get_job).delete(cancel_job))
        .route("/training/jobs/{id}/retry", post(retry_job))
        .route("/training/jobs/{id}/logs", get(job_logs))
        .route("/training/stats", get(training_stats))
        .route("/hpo/studies", post(create_study))
        .route("/hpo/studies/{name}", get(get_study).delete(delete_study))
        .route("/hpo/studies/{name}/trials", get(study_trials))
        .route("/hpo/studies/{name}/importances", get(study_importances))
        .route("/models", post(register_model).get(list_models))
        .route("/models/{id}", get(get_model).delete(delete_model))
        .route("/models/{id}/promote", put(promote_model))
        .route("/features/get", post(get_features))
        .route("/features/export", post(export_features))
        .route("/features/exports", get(list_exports))
        .route("/features/sets", get(list_feature_sets))
        .route("/experiments/runs", post(create_run))
        .route("/experiments/runs/{id}", get(get_run))
        .route("/experiments/runs/{id}/params", post(log_params))
        .route("/experiments/runs/{id}/metrics", post(log_metrics))
        .route("/experiments/runs/{id}/end", post(end_run))
        .route("/experiments/compare", post(compare_runs))
        .route("/experiments/{name}/best", get(best_run))
        .route("/experiments/{name}/stats", get(experiment_stats))
        .with_state(platform)
}

/// Binds and serves the router until the task is aborted.
///
/// # Errors
///
/// Returns [`PlatformError::Unavailable`] when the listener cannot bind.
pub async fn serve(platform: Arc<Platform>) -> Result<(), PlatformError> {
    let addr = platform.config.api.bind_addr;
    let app = router(platform);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|err| PlatformError::Internal(err.to_string()))
}

// ============================================================================
// SECTION: Training DTOs
// ============================================================================

/// Body of `POST /training/jobs/start`.
#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model to train.
    pub model_type: ModelKind,
    /// Logical model name.
    pub model_name: ModelName,
    /// Training configuration.
    pub config: TrainingConfig,
    /// Priority; higher dispatches sooner.
    #[serde(default)]
    pub priority: i32,
    /// Optional schedule expression.
    #[serde(default)]
    pub schedule: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Body answered by submissions and retries.
#[derive(Debug, Serialize)]
pub struct JobCreatedResponse {
    /// New job identifier.
    pub job_id: JobId,
    /// Initial status.
    pub status: gridmind_core::JobStatus,
    /// Submission time.
    pub created_at: Timestamp,
    /// Informational duration estimate.
    pub estimated_duration_seconds: u64,
    /// Human-facing confirmation.
    pub message: String,
}

/// Full job detail including the derived duration.
#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    /// The job record.
    #[serde(flatten)]
    pub job: TrainingJob,
    /// Wall-clock duration in seconds once started.
    pub duration_seconds: Option<f64>,
}

/// Query accepted by the job listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    /// Tenant filter.
    pub tenant_id: Option<String>,
    /// Model kind filter.
    pub model_type: Option<String>,
    /// Model name filter.
    pub model_name: Option<String>,
    /// Status filter.
    pub status: Option<String>,
    /// Created-at-or-after filter (unix millis).
    pub created_after: Option<i64>,
    /// Created-at-or-before filter (unix millis).
    pub created_before: Option<i64>,
    /// One-based page index.
    pub page: Option<u32>,
    /// Requested page size (capped server-side).
    pub page_size: Option<u32>,
}

/// Body answered by the job listing.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    /// Page slice.
    pub items: Vec<JobDetailResponse>,
    /// Total matching jobs.
    pub total: u64,
    /// One-based page index.
    pub page: u32,
    /// Applied page size.
    pub page_size: u32,
    /// Total page count.
    pub pages: u64,
}

/// Query accepted by the log tail endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    /// Number of trailing entries (default 100).
    pub tail: Option<u32>,
    /// Minimum-severity label filter.
    pub level: Option<String>,
}

// ============================================================================
// SECTION: Training Handlers
// ============================================================================

/// `POST /training/jobs/start`.
async fn start_job(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<StartJobRequest>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
    let receipt = platform.orchestrator.submit(SubmitJob {
        tenant_id: request.tenant_id,
        model_kind: request.model_type,
        model_name: request.model_name,
        config: request.config,
        priority: request.priority,
        schedule: request.schedule,
        tags: request.tags,
    })?;
    Ok((
        StatusCode::CREATED,
        Json(JobCreatedResponse {
            job_id: receipt.job.job_id,
            status: receipt.job.status,
            created_at: receipt.job.created_at,
            estimated_duration_seconds: receipt.estimated_duration_seconds,
            message: "training job queued".to_string(),
        }),
    ))
}

/// `GET /training/jobs/{id}`.
async fn get_job(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
) -> Result<Json<JobDetailResponse>, ApiError> {
    let job_id = parse_job_id(&id)?;
    let job = platform.orchestrator.get_job(&job_id)?;
    let duration_seconds = job.duration_seconds(Timestamp::now());
    Ok(Json(JobDetailResponse { job, duration_seconds }))
}

/// `GET /training/jobs`.
async fn list_jobs(
    State(platform): State<Arc<Platform>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let filters = JobFilters {
        tenant_id: query.tenant_id.map(TenantId::from),
        model_kind: query.model_type.as_deref().map(ModelKind::parse).transpose()?,
        model_name: query.model_name.map(ModelName::from),
        status: query.status.as_deref().map(gridmind_core::JobStatus::parse).transpose()?,
        created_after: query.created_after.map(Timestamp::from_unix_millis),
        created_before: query.created_before.map(Timestamp::from_unix_millis),
    };
    let page = platform.orchestrator.list_jobs(
        &filters,
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(20),
    )?;
    let now = Timestamp::now();
    let pages = page.pages();
    Ok(Json(JobListResponse {
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        pages,
        items: page
            .items
            .into_iter()
            .map(|job| {
                let duration_seconds = job.duration_seconds(now);
                JobDetailResponse { job, duration_seconds }
            })
            .collect(),
    }))
}

/// `DELETE /training/jobs/{id}`.
async fn cancel_job(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job_id = parse_job_id(&id)?;
    platform.orchestrator.cancel(&job_id)?;
    Ok(Json(serde_json::json!({
        "job_id": job_id,
        "status": "cancelled",
        "message": "training job cancelled",
    })))
}

/// `POST /training/jobs/{id}/retry`.
async fn retry_job(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
    let job_id = parse_job_id(&id)?;
    let receipt = platform.orchestrator.retry(&job_id)?;
    Ok((
        StatusCode::CREATED,
        Json(JobCreatedResponse {
            job_id: receipt.job.job_id,
            status: receipt.job.status,
            created_at: receipt.job.created_at,
            estimated_duration_seconds: receipt.estimated_duration_seconds,
            message: format!("retry of {job_id} queued"),
        }),
    ))
}

/// `GET /training/jobs/{id}/logs`.
async fn job_logs(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<JobLogEntry>>, ApiError> {
    let job_id = parse_job_id(&id)?;
    let level = query.level.as_deref().map(LogLevel::parse).transpose()?;
    let entries =
        platform.orchestrator.tail_logs(&job_id, query.tail.unwrap_or(100), level)?;
    Ok(Json(entries))
}

/// `GET /training/stats`.
async fn training_stats(
    State(platform): State<Arc<Platform>>,
) -> Result<Json<JobStats>, ApiError> {
    Ok(Json(platform.orchestrator.stats()?))
}

// ============================================================================
// SECTION: HPO DTOs / Handlers
// ============================================================================

/// Body of `POST /hpo/studies`.
#[derive(Debug, Deserialize)]
pub struct CreateStudyRequest {
    /// Unique study name.
    pub study_name: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model optimized.
    pub model_type: ModelKind,
    /// Optimization direction label.
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Sampler label.
    #[serde(default = "default_sampler")]
    pub sampler: String,
    /// Pruner label.
    #[serde(default = "default_pruner")]
    pub pruner: String,
    /// Trial budget.
    #[serde(default = "default_study_trials")]
    pub n_trials: u32,
    /// Optional wall-clock budget in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Default direction label.
fn default_direction() -> String {
    "minimize".to_string()
}

/// Default sampler label.
fn default_sampler() -> String {
    "tpe".to_string()
}

/// Default pruner label.
fn default_pruner() -> String {
    "median".to_string()
}

/// Default trial budget.
const fn default_study_trials() -> u32 {
    20
}

/// Study detail with trial counts and the current best.
#[derive(Debug, Serialize)]
pub struct StudyDetailResponse {
    /// The study record.
    #[serde(flatten)]
    pub study: gridmind_core::Study,
    /// Total recorded trials.
    pub total_trials: u64,
    /// Complete trials.
    pub completed_trials: u64,
    /// Pruned trials.
    pub pruned_trials: u64,
    /// Failed trials.
    pub failed_trials: u64,
    /// Best objective value, when any trial completed.
    pub best_value: Option<f64>,
    /// Best trial number.
    pub best_trial_number: Option<u32>,
}

/// `POST /hpo/studies`.
async fn create_study(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<CreateStudyRequest>,
) -> Result<(StatusCode, Json<gridmind_core::Study>), ApiError> {
    let study = platform.hpo.create_study(
        &StudyName::from(request.study_name),
        &request.tenant_id,
        request.model_type,
        &request.direction,
        &request.sampler,
        &request.pruner,
        request.n_trials,
        request.timeout_seconds,
    )?;
    Ok((StatusCode::CREATED, Json(study)))
}

/// `GET /hpo/studies/{name}`.
async fn get_study(
    State(platform): State<Arc<Platform>>,
    Path(name): Path<String>,
) -> Result<Json<StudyDetailResponse>, ApiError> {
    let name = StudyName::from(name);
    let study = platform.hpo.get_study(&name)?;
    let trials = platform.hpo.list_trials(&name)?;
    let count = |state: gridmind_core::TrialState| -> u64 {
        trials.iter().filter(|trial| trial.state == state).count() as u64
    };
    let best = best_trial(&trials, study.direction);
    Ok(Json(StudyDetailResponse {
        total_trials: trials.len() as u64,
        completed_trials: count(gridmind_core::TrialState::Complete),
        pruned_trials: count(gridmind_core::TrialState::Pruned),
        failed_trials: count(gridmind_core::TrialState::Failed),
        best_value: best.and_then(|trial| trial.value),
        best_trial_number: best.map(|trial| trial.number),
        study,
    }))
}

/// `GET /hpo/studies/{name}/trials`.
async fn study_trials(
    State(platform): State<Arc<Platform>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<gridmind_core::Trial>>, ApiError> {
    Ok(Json(platform.hpo.list_trials(&StudyName::from(name))?))
}

/// `GET /hpo/studies/{name}/importances`.
async fn study_importances(
    State(platform): State<Arc<Platform>>,
    Path(name): Path<String>,
) -> Result<Json<BTreeMap<String, f64>>, ApiError> {
    Ok(Json(platform.hpo.get_param_importances(&StudyName::from(name))?))
}

/// `DELETE /hpo/studies/{name}`.
async fn delete_study(
    State(platform): State<Arc<Platform>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    platform.hpo.delete_study(&StudyName::from(name.clone()))?;
    Ok(Json(serde_json::json!({ "study": name, "status": "deleted" })))
}

// ============================================================================
// SECTION: Registry DTOs / Handlers
// ============================================================================

/// Body of `POST /models`.
#[derive(Debug, Deserialize)]
pub struct RegisterModelRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Logical model name.
    pub model_name: ModelName,
    /// Version string.
    pub version: String,
    /// Hint naming the trained-model kind.
    pub model_type: String,
    /// Base64-encoded artifact bytes.
    pub artifact_base64: String,
    /// Free-form metadata fields.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Optional metrics document.
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, f64>>,
}

/// Query accepted by the model listing.
#[derive(Debug, Deserialize)]
pub struct ListModelsQuery {
    /// Owning tenant.
    pub tenant_id: String,
    /// Logical model name.
    pub model_name: String,
    /// Optional stage filter label.
    pub stage: Option<String>,
}

/// Body of `PUT /models/{id}/promote`.
#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    /// Target stage label.
    pub stage: String,
    /// Optional reason recorded in metadata.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Query accepted by the model delete.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteModelQuery {
    /// True to allow deleting a production version.
    #[serde(default)]
    pub force: bool,
}

/// `POST /models`.
async fn register_model(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<RegisterModelRequest>,
) -> Result<(StatusCode, Json<gridmind_registry::ModelMetadata>), ApiError> {
    let artifact = base64::engine::general_purpose::STANDARD
        .decode(request.artifact_base64.as_bytes())
        .map_err(|err| PlatformError::Validation(format!("invalid artifact encoding: {err}")))?;
    let metadata = platform.registry.register(RegisterRequest {
        reference: ModelVersionRef::new(
            request.tenant_id,
            request.model_name,
            request.version.into(),
        ),
        artifact,
        model_type: request.model_type,
        metadata: request.metadata,
        metrics: request.metrics,
    })?;
    Ok((StatusCode::CREATED, Json(metadata)))
}

/// `GET /models/{id}`.
async fn get_model(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reference = ModelVersionRef::parse(&id)?;
    let Some(record) = platform.registry.get(&reference)? else {
        return Err(PlatformError::NotFound(format!("model version not found: {id}")).into());
    };
    Ok(Json(serde_json::json!({
        "metadata": record.metadata,
        "metrics": record.metrics,
    })))
}

/// `GET /models`.
async fn list_models(
    State(platform): State<Arc<Platform>>,
    Query(query): Query<ListModelsQuery>,
) -> Result<Json<Vec<gridmind_registry::ModelMetadata>>, ApiError> {
    let stage = query.stage.as_deref().map(ModelStage::parse).transpose()?;
    let mut versions = platform.registry.list_versions(&query.tenant_id, &query.model_name)?;
    if let Some(stage) = stage {
        versions.retain(|metadata| metadata.stage == stage);
    }
    Ok(Json(versions))
}

/// `PUT /models/{id}/promote`.
async fn promote_model(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
    Json(request): Json<PromoteRequest>,
) -> Result<Json<gridmind_registry::ModelMetadata>, ApiError> {
    let reference = ModelVersionRef::parse(&id)?;
    let stage = ModelStage::parse(&request.stage)?;
    Ok(Json(platform.registry.promote(&reference, stage, request.reason)?))
}

/// `DELETE /models/{id}`.
async fn delete_model(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteModelQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reference = ModelVersionRef::parse(&id)?;
    let deleted = platform.registry.delete(&reference, query.force)?;
    Ok(Json(serde_json::json!({
        "model_id": id,
        "deleted_keys": deleted,
    })))
}

// ============================================================================
// SECTION: Feature DTOs / Handlers
// ============================================================================

/// Body of `POST /features/get`.
#[derive(Debug, Deserialize)]
pub struct GetFeaturesRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Optional point-in-time (unix millis; defaults to now).
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Optional explicit feature names.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Optional named feature set.
    #[serde(default)]
    pub feature_set: Option<String>,
}

/// Body of `POST /features/export`.
#[derive(Debug, Deserialize)]
pub struct ExportFeaturesRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Feature set to export.
    pub feature_set: String,
    /// Window start (unix millis).
    pub start_time: i64,
    /// Window end (unix millis).
    pub end_time: i64,
    /// Optional asset filter.
    #[serde(default)]
    pub asset_ids: Vec<AssetId>,
}

/// Query accepted by the export listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListExportsQuery {
    /// Tenant filter.
    pub tenant_id: Option<String>,
    /// Feature-set filter.
    pub feature_set: Option<String>,
    /// Status filter label.
    pub status: Option<String>,
}

/// `POST /features/get`.
async fn get_features(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<GetFeaturesRequest>,
) -> Result<Json<gridmind_core::FeatureVector>, ApiError> {
    let at = request.timestamp.map(Timestamp::from_unix_millis);
    let vector = if let Some(feature_set) = &request.feature_set {
        platform.features.get_feature_set(&request.tenant_id, &request.asset_id, feature_set, at)?
    } else {
        let names: Option<Vec<&str>> = request
            .feature_names
            .as_ref()
            .map(|names| names.iter().map(String::as_str).collect());
        platform.features.get_features(
            &request.tenant_id,
            &request.asset_id,
            at,
            names.as_deref(),
        )?
    };
    Ok(Json(vector))
}

/// `POST /features/export`.
async fn export_features(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<ExportFeaturesRequest>,
) -> Result<(StatusCode, Json<gridmind_core::FeatureExport>), ApiError> {
    let export = platform.features.export_to_parquet(
        &request.tenant_id,
        &request.feature_set,
        Timestamp::from_unix_millis(request.start_time),
        Timestamp::from_unix_millis(request.end_time),
        &request.asset_ids,
    )?;
    Ok((StatusCode::ACCEPTED, Json(export)))
}

/// `GET /features/exports`.
async fn list_exports(
    State(platform): State<Arc<Platform>>,
    Query(query): Query<ListExportsQuery>,
) -> Result<Json<Vec<gridmind_core::FeatureExport>>, ApiError> {
    let status = query.status.as_deref().map(ExportStatus::parse).transpose()?;
    let tenant = query.tenant_id.map(TenantId::from);
    Ok(Json(platform.features.list_exports(
        tenant.as_ref(),
        query.feature_set.as_deref(),
        status,
    )?))
}

/// `GET /features/sets`.
async fn list_feature_sets() -> Json<Vec<&'static str>> {
    Json(feature_set_names().to_vec())
}

// ============================================================================
// SECTION: Experiment DTOs / Handlers
// ============================================================================

/// Body of `POST /experiments/runs`.
#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    /// Experiment name (created when absent).
    pub experiment: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model trained.
    pub model_type: ModelKind,
    /// Run display name.
    pub run_name: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Body of `POST /experiments/runs/{id}/params`.
#[derive(Debug, Deserialize)]
pub struct LogParamsRequest {
    /// Parameters to record (values coerce to strings).
    pub params: BTreeMap<String, serde_json::Value>,
}

/// Body of `POST /experiments/runs/{id}/metrics`.
#[derive(Debug, Deserialize)]
pub struct LogMetricsRequest {
    /// Metrics to append.
    pub metrics: BTreeMap<String, f64>,
    /// Optional step index shared by this batch.
    #[serde(default)]
    pub step: Option<u32>,
}

/// Body of `POST /experiments/runs/{id}/end`.
#[derive(Debug, Deserialize)]
pub struct EndRunRequest {
    /// Terminal status label.
    pub status: String,
}

/// Body of `POST /experiments/compare`.
#[derive(Debug, Deserialize)]
pub struct CompareRunsRequest {
    /// Runs to compare.
    pub run_ids: Vec<String>,
    /// Optional metric projection.
    #[serde(default)]
    pub metric_keys: Option<Vec<String>>,
}

/// Query accepted by the best-run endpoint.
#[derive(Debug, Deserialize)]
pub struct BestRunQuery {
    /// Metric to optimize.
    pub metric: String,
    /// True to maximize.
    #[serde(default)]
    pub maximize: bool,
}

/// `POST /experiments/runs`.
async fn create_run(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let run_id = platform.tracker.create_run(
        &request.experiment,
        &request.tenant_id,
        request.model_type,
        &request.run_name,
        request.tags,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "run_id": run_id, "status": "running" })),
    ))
}

/// `GET /experiments/runs/{id}`.
async fn get_run(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
) -> Result<Json<gridmind_core::Run>, ApiError> {
    let run_id = RunId::from(id.clone());
    let Some(run) = platform.tracker.get_run(&run_id)? else {
        return Err(PlatformError::NotFound(format!("run not found: {id}")).into());
    };
    Ok(Json(run))
}

/// `POST /experiments/runs/{id}/params`.
async fn log_params(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
    Json(request): Json<LogParamsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let run_id = RunId::from(id);
    for (key, value) in &request.params {
        platform.tracker.log_param(&run_id, key, value)?;
    }
    Ok(Json(serde_json::json!({ "logged": request.params.len() })))
}

/// `POST /experiments/runs/{id}/metrics`.
async fn log_metrics(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
    Json(request): Json<LogMetricsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let run_id = RunId::from(id);
    for (key, value) in &request.metrics {
        platform.tracker.log_metric(&run_id, key, *value, request.step, None)?;
    }
    Ok(Json(serde_json::json!({ "logged": request.metrics.len() })))
}

/// `POST /experiments/runs/{id}/end`.
async fn end_run(
    State(platform): State<Arc<Platform>>,
    Path(id): Path<String>,
    Json(request): Json<EndRunRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = RunStatus::parse(&request.status)?;
    platform.tracker.end_run(&RunId::from(id.clone()), status)?;
    Ok(Json(serde_json::json!({ "run_id": id, "status": request.status })))
}

/// `POST /experiments/compare`.
async fn compare_runs(
    State(platform): State<Arc<Platform>>,
    Json(request): Json<CompareRunsRequest>,
) -> Result<Json<Vec<gridmind_tracking::RunComparison>>, ApiError> {
    let run_ids: Vec<RunId> = request.run_ids.into_iter().map(RunId::from).collect();
    let keys: Option<Vec<&str>> = request
        .metric_keys
        .as_ref()
        .map(|keys| keys.iter().map(String::as_str).collect());
    Ok(Json(platform.tracker.compare_runs(&run_ids, keys.as_deref())?))
}

/// `GET /experiments/{name}/best`.
async fn best_run(
    State(platform): State<Arc<Platform>>,
    Path(name): Path<String>,
    Query(query): Query<BestRunQuery>,
) -> Result<Json<Option<gridmind_core::Run>>, ApiError> {
    Ok(Json(platform.tracker.get_best_run(&name, &query.metric, query.maximize)?))
}

/// `GET /experiments/{name}/stats`.
async fn experiment_stats(
    State(platform): State<Arc<Platform>>,
    Path(name): Path<String>,
) -> Result<Json<gridmind_core::ExperimentStats>, ApiError> {
    Ok(Json(platform.tracker.get_experiment_stats(&name)?))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a job id path segment.
fn parse_job_id(raw: &str) -> Result<JobId, PlatformError> {
    JobId::parse(raw).map_err(|_| PlatformError::Validation(format!("invalid job id: {raw}")))
}
