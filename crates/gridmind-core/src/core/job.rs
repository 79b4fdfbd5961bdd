// gridmind-core/src/core/job.rs
// ============================================================================
// Module: Gridmind Training Jobs
// Description: Training job records, configuration, and lifecycle status.
// Purpose: Capture the durable job model owned by the orchestrator.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A training job is the unit of work admitted by the orchestrator. Its
//! configuration snapshot is immutable after submission; status moves only
//! along the lifecycle state machine encoded in [`JobStatus`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::PlatformError;
use crate::core::identifiers::JobId;
use crate::core::identifiers::ModelName;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Model Kind
// ============================================================================

/// Kind of model a job trains.
///
/// # Invariants
/// - Variants are stable for serialization and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Load/generation forecasting regressor.
    Forecast,
    /// Anomaly detection scorer.
    Anomaly,
}

impl ModelKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forecast => "forecast",
            Self::Anomaly => "anomaly",
        }
    }

    /// Parses a stable label back into a kind.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "forecast" => Ok(Self::Forecast),
            "anomaly" => Ok(Self::Anomaly),
            other => Err(PlatformError::Validation(format!("unknown model kind: {other}"))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Job Status
// ============================================================================

/// Training job lifecycle status.
///
/// # Invariants
/// - Transitions only follow the lifecycle state machine; terminal states
///   (`Completed`, `Failed`, `Cancelled`) are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and waiting for a free slot.
    Queued,
    /// Claimed by the dispatch loop and executing.
    Running,
    /// Finished successfully; progress is 1.0.
    Completed,
    /// Finished with an error recorded in `error_message`.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl JobStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a stable label back into a status.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(PlatformError::Validation(format!("unknown job status: {other}"))),
        }
    }

    /// Returns true when the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true when `next` is a permitted successor of `self`.
    #[must_use]
    pub const fn permits(self, next: Self) -> bool {
        match self {
            Self::Queued => matches!(next, Self::Running | Self::Cancelled),
            Self::Running => matches!(next, Self::Completed | Self::Failed | Self::Cancelled),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Hyperparameters
// ============================================================================

/// Search-space descriptor for one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HyperparameterSpec {
    /// Integer range with an optional step.
    Int {
        /// Inclusive lower bound.
        low: i64,
        /// Inclusive upper bound.
        high: i64,
        /// Optional step size (defaults to 1).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<i64>,
    },
    /// Floating range, optionally sampled in log space.
    Float {
        /// Inclusive lower bound.
        low: f64,
        /// Inclusive upper bound.
        high: f64,
        /// True for log-space sampling.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        log: bool,
    },
    /// Finite choice set.
    Categorical {
        /// Candidate values.
        choices: Vec<serde_json::Value>,
    },
    /// Log-uniform floating range.
    Loguniform {
        /// Inclusive lower bound (> 0).
        low: f64,
        /// Inclusive upper bound.
        high: f64,
    },
}

/// One configured hyperparameter: a concrete scalar or a search descriptor.
///
/// # Invariants
/// - Maps deserialize as search descriptors; any other JSON value is a
///   concrete scalar that overrides the model default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperparameterValue {
    /// Search-space descriptor, ignored by single-run fits.
    Search(HyperparameterSpec),
    /// Concrete scalar override.
    Scalar(serde_json::Value),
}

impl HyperparameterValue {
    /// Returns the scalar value when this entry is concrete.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Search(_) => None,
        }
    }

    /// Returns the search descriptor when this entry is a space.
    #[must_use]
    pub const fn as_search(&self) -> Option<&HyperparameterSpec> {
        match self {
            Self::Search(spec) => Some(spec),
            Self::Scalar(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Training Configuration
// ============================================================================

/// Immutable training configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Start of the training data window.
    pub start_date: Timestamp,
    /// End of the training data window.
    pub end_date: Timestamp,
    /// Feature set consumed by the Load stage.
    pub feature_set: String,
    /// Target column name.
    pub target_column: String,
    /// Forecast horizon in hours.
    #[serde(default = "default_horizon")]
    pub horizon: u32,
    /// Validation split fraction.
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,
    /// Test split fraction.
    #[serde(default = "default_test_split")]
    pub test_split: f64,
    /// True to run hyper-parameter optimization before the final fit.
    #[serde(default)]
    pub enable_hpo: bool,
    /// Trial budget when HPO is enabled.
    #[serde(default = "default_n_trials")]
    pub n_trials: u32,
    /// Hyperparameters: concrete scalars or search descriptors.
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, HyperparameterValue>,
    /// True to allow early stopping against the validation split.
    #[serde(default)]
    pub early_stopping: bool,
    /// Seed for all derived randomness.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    /// Requested worker count.
    #[serde(default = "default_n_workers")]
    pub n_workers: u32,
    /// True to register the trained model on success.
    #[serde(default = "default_register_model")]
    pub register_model: bool,
}

/// Default forecast horizon in hours.
const fn default_horizon() -> u32 {
    24
}

/// Default validation split fraction.
const fn default_validation_split() -> f64 {
    0.15
}

/// Default test split fraction.
const fn default_test_split() -> f64 {
    0.15
}

/// Default HPO trial budget.
const fn default_n_trials() -> u32 {
    20
}

/// Default random seed.
const fn default_random_seed() -> u64 {
    42
}

/// Default worker count.
const fn default_n_workers() -> u32 {
    1
}

/// Default for the register-on-success flag.
const fn default_register_model() -> bool {
    true
}

impl TrainingConfig {
    /// Validates the configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] when the window, splits, or
    /// worker count are out of range.
    pub fn validate(&self) -> Result<(), PlatformError> {
        if self.end_date <= self.start_date {
            return Err(PlatformError::Validation(
                "end_date must be after start_date".to_string(),
            ));
        }
        if self.feature_set.trim().is_empty() {
            return Err(PlatformError::Validation("feature_set must be set".to_string()));
        }
        if self.target_column.trim().is_empty() {
            return Err(PlatformError::Validation("target_column must be set".to_string()));
        }
        if !(0.0 .. 1.0).contains(&self.validation_split)
            || !(0.0 .. 1.0).contains(&self.test_split)
        {
            return Err(PlatformError::Validation(
                "split fractions must lie in [0, 1)".to_string(),
            ));
        }
        if self.validation_split + self.test_split >= 1.0 {
            return Err(PlatformError::Validation(
                "validation_split + test_split must be below 1.0".to_string(),
            ));
        }
        if self.n_workers == 0 {
            return Err(PlatformError::Validation("n_workers must be at least 1".to_string()));
        }
        if self.enable_hpo && self.n_trials == 0 {
            return Err(PlatformError::Validation(
                "n_trials must be at least 1 when HPO is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Training Metrics
// ============================================================================

/// Flat metric snapshot attached to jobs and runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingMetrics {
    /// Metric name to value.
    values: BTreeMap<String, f64>,
}

impl TrainingMetrics {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: BTreeMap::new() }
    }

    /// Inserts or replaces a metric value.
    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Returns a metric value when present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Iterates over (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Returns the number of recorded metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no metrics are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for TrainingMetrics {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

// ============================================================================
// SECTION: Job Record
// ============================================================================

/// Durable training job record.
///
/// # Invariants
/// - `started_at` is set iff the status has passed `Running`.
/// - `completed_at` is set iff the status is terminal.
/// - `progress` is 1.0 iff the status is `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    /// Job identifier.
    pub job_id: JobId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model trained.
    pub model_kind: ModelKind,
    /// Logical model name.
    pub model_name: ModelName,
    /// Immutable configuration snapshot.
    pub config: TrainingConfig,
    /// Priority; higher dispatches sooner.
    pub priority: i32,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Progress fraction in [0, 1].
    pub progress: f64,
    /// Latest metrics snapshot, if any.
    pub metrics: Option<TrainingMetrics>,
    /// Registered model identifier on success.
    pub model_id: Option<String>,
    /// Error message for failed jobs.
    pub error_message: Option<String>,
    /// Submission time.
    pub created_at: Timestamp,
    /// Claim time, set when the job starts running.
    pub started_at: Option<Timestamp>,
    /// Terminal time.
    pub completed_at: Option<Timestamp>,
    /// Last mutation time.
    pub updated_at: Timestamp,
    /// Optional schedule expression for recurring submissions.
    pub schedule: Option<String>,
    /// Free-form tags.
    pub tags: BTreeMap<String, String>,
}

impl TrainingJob {
    /// Returns the wall-clock duration in seconds when the job has started.
    #[must_use]
    pub fn duration_seconds(&self, now: Timestamp) -> Option<f64> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or(now);
        Some((end.unix_millis().saturating_sub(started.unix_millis())) as f64 / 1_000.0)
    }
}

// ============================================================================
// SECTION: Logs
// ============================================================================

/// Severity of a job log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine progress.
    Info,
    /// Degraded but continuing.
    Warning,
    /// Failure detail.
    Error,
}

impl LogLevel {
    /// Returns the stable label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Parses a stable label back into a level.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(PlatformError::Validation(format!("unknown log level: {other}"))),
        }
    }
}

/// One append-only job log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLogEntry {
    /// Entry timestamp.
    pub at: Timestamp,
    /// Entry severity.
    pub level: LogLevel,
    /// Entry message.
    pub message: String,
}

// ============================================================================
// SECTION: Listing
// ============================================================================

/// Filters accepted by the job listing query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilters {
    /// Restrict to one tenant.
    pub tenant_id: Option<TenantId>,
    /// Restrict to one model kind.
    pub model_kind: Option<ModelKind>,
    /// Restrict to one model name.
    pub model_name: Option<ModelName>,
    /// Restrict to one status.
    pub status: Option<JobStatus>,
    /// Only jobs created at or after this time.
    pub created_after: Option<Timestamp>,
    /// Only jobs created at or before this time.
    pub created_before: Option<Timestamp>,
}

/// One page of a filtered job listing, ordered by `created_at` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPage {
    /// Page slice.
    pub items: Vec<TrainingJob>,
    /// Total matching rows.
    pub total: u64,
    /// One-based page index.
    pub page: u32,
    /// Page size after server-side capping.
    pub page_size: u32,
}

impl JobPage {
    /// Returns the total page count for this listing.
    #[must_use]
    pub const fn pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size as u64)
        }
    }
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// Aggregate orchestrator statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    /// Job counts keyed by status label.
    pub counts: BTreeMap<String, u64>,
    /// Configured concurrency cap.
    pub capacity: u32,
    /// Currently running jobs.
    pub running: u64,
    /// Running jobs divided by capacity.
    pub utilization: f64,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
