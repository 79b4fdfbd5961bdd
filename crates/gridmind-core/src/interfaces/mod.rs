// gridmind-core/src/interfaces/mod.rs
// ============================================================================
// Module: Gridmind Interfaces
// Description: Backend-agnostic interfaces for storage, caching, and execution.
// Purpose: Define the contract surfaces the Gridmind crates implement.
// Dependencies: crate::core, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the training core integrates with durable storage,
//! the object store, the hot cache, and the pipeline executor without
//! embedding backend details. The orchestrator depends only on [`Executor`];
//! a concrete pipeline is injected at composition time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::error::PlatformError;
use crate::core::experiment::MetricPoint;
use crate::core::experiment::Run;
use crate::core::experiment::RunStatus;
use crate::core::features::DailyAggregate;
use crate::core::features::FeatureExport;
use crate::core::features::FeatureRow;
use crate::core::features::HourlyAggregate;
use crate::core::features::LagFeature;
use crate::core::features::RollingWindow;
use crate::core::features::WeatherObservation;
use crate::core::identifiers::AssetId;
use crate::core::identifiers::ExperimentId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::StudyName;
use crate::core::identifiers::TenantId;
use crate::core::job::JobFilters;
use crate::core::job::JobLogEntry;
use crate::core::job::JobPage;
use crate::core::job::JobStatus;
use crate::core::job::LogLevel;
use crate::core::job::ModelKind;
use crate::core::job::TrainingJob;
use crate::core::job::TrainingMetrics;
use crate::core::study::Study;
use crate::core::study::Trial;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Object store errors.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Requested object is absent.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Key already exists where it must not.
    #[error("object conflict: {0}")]
    Conflict(String),
    /// Invalid key or configuration input.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Local I/O failure.
    #[error("object store io error: {0}")]
    Io(String),
    /// Backend returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
}

impl From<ObjectStoreError> for PlatformError {
    fn from(error: ObjectStoreError) -> Self {
        match error {
            ObjectStoreError::NotFound(message) => Self::NotFound(message),
            ObjectStoreError::Conflict(message) => Self::Conflict(message),
            ObjectStoreError::Invalid(message) => Self::Validation(message),
            ObjectStoreError::Io(message) | ObjectStoreError::Backend(message) => {
                Self::Unavailable(message)
            }
        }
    }
}

/// Listing result: object keys plus delimiter-grouped common prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectListing {
    /// Keys below the prefix.
    pub keys: Vec<String>,
    /// Common prefixes when a delimiter was supplied.
    pub common_prefixes: Vec<String>,
}

/// Bucketed object storage over a structured key space.
pub trait ObjectStore: Send + Sync {
    /// Writes a single object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the key is invalid or the backend
    /// write fails.
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>)
    -> Result<(), ObjectStoreError>;

    /// Reads a single object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NotFound`] for absent keys and other
    /// variants for backend failures.
    fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Lists keys below a prefix, optionally grouping by a delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the backend listing fails.
    fn list(&self, prefix: &str, delimiter: Option<char>)
    -> Result<ObjectListing, ObjectStoreError>;

    /// Copies an object to a new key.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the source is absent or the copy
    /// fails.
    fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError>;

    /// Deletes every object below a prefix, returning the deleted keys.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the backend delete fails.
    fn delete_prefix(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;

    /// Creates the backing bucket when absent; existing buckets succeed.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when bucket creation fails for a reason
    /// other than prior existence.
    fn ensure_bucket(&self) -> Result<(), ObjectStoreError>;
}

// ============================================================================
// SECTION: Feature Cache
// ============================================================================

/// Hot-cache errors. Callers log and bypass; these never fail a request.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connection or transport failure.
    #[error("cache connection error: {0}")]
    Connection(String),
    /// Command failure.
    #[error("cache command error: {0}")]
    Command(String),
}

/// Hot feature cache with per-entry TTL.
pub trait FeatureCache: Send + Sync {
    /// Returns the cached payload for a key, if present and unexpired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on transport failures.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Writes a payload with a TTL in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on transport failures.
    fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Removes a key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on transport failures.
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

// ============================================================================
// SECTION: Relational Store Errors
// ============================================================================

/// Durable store errors shared by all relational interfaces.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Database engine failure.
    #[error("store db error: {0}")]
    Db(String),
    /// Invalid stored or supplied data.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Uniqueness or state-machine violation.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Referenced row is absent.
    #[error("store row not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for PlatformError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Io(message) | StoreError::Db(message) => Self::Unavailable(message),
            StoreError::Invalid(message) => Self::Validation(message),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::NotFound(message) => Self::NotFound(message),
        }
    }
}

// ============================================================================
// SECTION: Job Store
// ============================================================================

/// Durable job state owned by the orchestrator.
///
/// The job row is the single synchronization point for a job's state; every
/// mutation is a single statement scoped by id (and, for claims and terminal
/// transitions, by prior status).
pub trait JobStore: Send + Sync {
    /// Inserts a freshly submitted job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the id already exists.
    fn insert_job(&self, job: &TrainingJob) -> Result<(), StoreError>;

    /// Loads a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the load fails.
    fn get_job(&self, job_id: &JobId) -> Result<Option<TrainingJob>, StoreError>;

    /// Lists jobs matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list_jobs(&self, filters: &JobFilters, page: u32, page_size: u32)
    -> Result<JobPage, StoreError>;

    /// Atomically claims the next queued job by (priority desc, created
    /// asc), marking it running and stamping `started_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the claim statement fails.
    fn claim_next_queued(&self, now: Timestamp) -> Result<Option<TrainingJob>, StoreError>;

    /// Writes progress (and optionally metrics) without touching status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn update_progress(
        &self,
        job_id: &JobId,
        progress: f64,
        metrics: Option<&TrainingMetrics>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Transitions a running job to completed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the job is not running.
    fn mark_completed(
        &self,
        job_id: &JobId,
        model_id: &str,
        metrics: &TrainingMetrics,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Transitions a running job to failed with an error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the job is not running.
    fn mark_failed(&self, job_id: &JobId, error_message: &str, now: Timestamp)
    -> Result<(), StoreError>;

    /// Transitions a queued or running job to cancelled; returns false when
    /// the job was already terminal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn mark_cancelled(&self, job_id: &JobId, now: Timestamp) -> Result<bool, StoreError>;

    /// Appends one log entry for a job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn append_log(&self, job_id: &JobId, entry: &JobLogEntry) -> Result<(), StoreError>;

    /// Returns the last `tail` log entries, oldest first, optionally
    /// filtered by level.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn tail_logs(&self, job_id: &JobId, tail: u32, level: Option<LogLevel>)
    -> Result<Vec<JobLogEntry>, StoreError>;

    /// Returns job counts keyed by status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_by_status(&self) -> Result<BTreeMap<JobStatus, u64>, StoreError>;
}

// ============================================================================
// SECTION: Study Store
// ============================================================================

/// Durable study and trial state owned by the HPO engine.
pub trait StudyStore: Send + Sync {
    /// Inserts a new study.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the name already exists.
    fn insert_study(&self, study: &Study) -> Result<(), StoreError>;

    /// Loads a study by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the load fails.
    fn get_study(&self, name: &StudyName) -> Result<Option<Study>, StoreError>;

    /// Deletes a study and its trials; returns false when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn delete_study(&self, name: &StudyName) -> Result<bool, StoreError>;

    /// Returns the next monotone trial number for a study.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn next_trial_number(&self, name: &StudyName) -> Result<u32, StoreError>;

    /// Inserts a trial row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_trial(&self, trial: &Trial) -> Result<(), StoreError>;

    /// Replaces a trial row after completion, pruning, or failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn update_trial(&self, trial: &Trial) -> Result<(), StoreError>;

    /// Lists all trials of a study ordered by trial number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list_trials(&self, name: &StudyName) -> Result<Vec<Trial>, StoreError>;
}

// ============================================================================
// SECTION: Experiment Store
// ============================================================================

/// Durable experiment and run state owned by the tracker.
pub trait ExperimentStore: Send + Sync {
    /// Creates an experiment when absent; returns the id either way.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the upsert fails.
    fn ensure_experiment(
        &self,
        name: &str,
        tenant_id: &TenantId,
        model_kind: ModelKind,
        now: Timestamp,
    ) -> Result<ExperimentId, StoreError>;

    /// Loads an experiment by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the load fails.
    fn get_experiment(&self, name: &str)
    -> Result<Option<crate::core::experiment::Experiment>, StoreError>;

    /// Inserts a new run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_run(&self, run: &Run) -> Result<(), StoreError>;

    /// Loads a run with its params, tags, and metric series.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the load fails.
    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError>;

    /// Updates a run's status and end time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the run is absent.
    fn update_run_status(&self, run_id: &RunId, status: RunStatus, now: Timestamp)
    -> Result<(), StoreError>;

    /// Writes one string-coerced parameter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn put_param(&self, run_id: &RunId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Writes one tag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn put_tag(&self, run_id: &RunId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Appends one metric observation in call order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn append_metric(&self, run_id: &RunId, key: &str, point: &MetricPoint)
    -> Result<(), StoreError>;

    /// Lists all runs of an experiment with their series, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn runs_for_experiment(&self, experiment_id: &ExperimentId) -> Result<Vec<Run>, StoreError>;
}

// ============================================================================
// SECTION: Feature Repository
// ============================================================================

/// Cold relational feature access owned by the feature store.
pub trait FeatureRepository: Send + Sync {
    /// Returns the hourly aggregate for the bucket containing `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn hourly_aggregate(&self, tenant_id: &TenantId, asset_id: &AssetId, at: Timestamp)
    -> Result<Option<HourlyAggregate>, StoreError>;

    /// Returns the daily aggregate for the bucket containing `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn daily_aggregate(&self, tenant_id: &TenantId, asset_id: &AssetId, at: Timestamp)
    -> Result<Option<DailyAggregate>, StoreError>;

    /// Returns lagged observations for the requested lag distances.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn lag_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        lags_hours: &[u32],
    ) -> Result<Vec<LagFeature>, StoreError>;

    /// Returns rolling-window statistics over the trailing window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn rolling_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        window_hours: u32,
    ) -> Result<Option<RollingWindow>, StoreError>;

    /// Returns the most recent weather row at or before `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn latest_weather(&self, tenant_id: &TenantId, at: Timestamp)
    -> Result<Option<WeatherObservation>, StoreError>;

    /// Returns materialized feature rows for a set over a window, ordered by
    /// (asset, timestamp).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn feature_rows(
        &self,
        view: &str,
        tenant_id: &TenantId,
        start: Timestamp,
        end: Timestamp,
        asset_ids: &[AssetId],
    ) -> Result<Vec<FeatureRow>, StoreError>;

    /// Records one export row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_export(&self, export: &FeatureExport) -> Result<(), StoreError>;

    /// Lists export rows, optionally filtered, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list_exports(
        &self,
        tenant_id: Option<&TenantId>,
        feature_set: Option<&str>,
        status: Option<crate::core::features::ExportStatus>,
    ) -> Result<Vec<FeatureExport>, StoreError>;
}

// ============================================================================
// SECTION: Model Capability
// ============================================================================

/// Model serialization errors.
#[derive(Debug, Error)]
pub enum ModelCodecError {
    /// Envelope payload failed to encode.
    #[error("model encode error: {0}")]
    Encode(String),
    /// Envelope payload failed to decode.
    #[error("model decode error: {0}")]
    Decode(String),
    /// Envelope header is malformed or unsupported.
    #[error("model envelope invalid: {0}")]
    Envelope(String),
}

/// Capability interface for trained models.
///
/// One concrete implementation exists per trained model kind; callers never
/// downcast.
pub trait Model: Send + Sync {
    /// Returns the model kind.
    fn kind(&self) -> ModelKind;

    /// Returns the number of input features the model expects.
    fn feature_count(&self) -> usize;

    /// Predicts one output per input row.
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64>;

    /// Returns the coefficient of determination against targets when the
    /// model kind supports it.
    fn score(&self, rows: &[Vec<f64>], targets: &[f64]) -> Option<f64>;

    /// Serializes the model into a tagged envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ModelCodecError`] when payload encoding fails.
    fn to_envelope(&self) -> Result<ModelEnvelope, ModelCodecError>;
}

/// Tagged binary envelope carrying a serialized model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEnvelope {
    /// Model kind tag.
    pub kind: ModelKind,
    /// Envelope format version.
    pub format_version: u32,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

/// Magic prefix identifying Gridmind model envelopes.
const ENVELOPE_MAGIC: &[u8; 4] = b"GMME";

impl ModelEnvelope {
    /// Encodes the envelope into its binary wire form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + 1 + 4 + 8 + self.payload.len());
        bytes.extend_from_slice(ENVELOPE_MAGIC);
        bytes.push(match self.kind {
            ModelKind::Forecast => 1,
            ModelKind::Anomaly => 2,
        });
        bytes.extend_from_slice(&self.format_version.to_be_bytes());
        bytes.extend_from_slice(&(self.payload.len() as u64).to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Decodes an envelope from its binary wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ModelCodecError::Envelope`] for truncated or unrecognized
    /// input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelCodecError> {
        if bytes.len() < 17 || &bytes[.. 4] != ENVELOPE_MAGIC {
            return Err(ModelCodecError::Envelope("missing envelope header".to_string()));
        }
        let kind = match bytes[4] {
            1 => ModelKind::Forecast,
            2 => ModelKind::Anomaly,
            other => {
                return Err(ModelCodecError::Envelope(format!("unknown model kind tag: {other}")));
            }
        };
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&bytes[5 .. 9]);
        let mut length_bytes = [0u8; 8];
        length_bytes.copy_from_slice(&bytes[9 .. 17]);
        let length = usize::try_from(u64::from_be_bytes(length_bytes))
            .map_err(|_| ModelCodecError::Envelope("payload length overflow".to_string()))?;
        let payload = bytes
            .get(17 ..)
            .filter(|payload| payload.len() == length)
            .ok_or_else(|| ModelCodecError::Envelope("payload length mismatch".to_string()))?
            .to_vec();
        Ok(Self { kind, format_version: u32::from_be_bytes(version_bytes), payload })
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Cooperative cancellation flag shared between the orchestrator and the
/// executing task.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Durable progress writer handed to executors.
pub trait ProgressSink: Send + Sync {
    /// Writes (progress, metrics) for a job without touching status.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the durable write fails.
    fn report(
        &self,
        job_id: &JobId,
        progress: f64,
        metrics: Option<&TrainingMetrics>,
    ) -> Result<(), PlatformError>;

    /// Appends a log line for a job.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the durable write fails.
    fn log(&self, job_id: &JobId, level: LogLevel, message: &str) -> Result<(), PlatformError>;
}

/// Per-execution context owned by the orchestrator.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Durable progress and log writer.
    pub progress: Arc<dyn ProgressSink>,
    /// Cooperative cancellation flag.
    pub cancel: CancelFlag,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Registered (or synthesized) model identifier.
    pub model_id: String,
    /// Final metrics snapshot.
    pub metrics: TrainingMetrics,
}

/// Abstract job executor the orchestrator dispatches to.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Executes one claimed job to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when a stage fails; the orchestrator
    /// records the message and transitions the job to failed.
    async fn execute(&self, job: &TrainingJob, ctx: &ExecutionContext)
    -> Result<ExecutionOutcome, PlatformError>;
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// One operational event emitted by a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Emission time.
    pub at: Timestamp,
    /// Severity.
    pub level: LogLevel,
    /// Component label.
    pub component: String,
    /// Event message.
    pub message: String,
    /// Correlation identifiers (job_id, run_id, study).
    pub correlation: BTreeMap<String, String>,
}

/// Observability hook; deployments plug in their own pipeline.
pub trait EventSink: Send + Sync {
    /// Records one event. Implementations must never fail the caller.
    fn emit(&self, event: &Event);
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
