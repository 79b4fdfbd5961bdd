// gridmind-core/src/core/experiment.rs
// ============================================================================
// Module: Gridmind Experiments
// Description: Experiment and run records for the tracker.
// Purpose: Capture the durable experiment model owned by the tracker.
// Dependencies: crate::core::{error, identifiers, job, time}, serde
// ============================================================================

//! ## Overview
//! An experiment groups runs for one tenant and model kind. Runs carry
//! string parameters, ordered metric timeseries, tags, and an artifact root.
//! The tracker never reorders a metric sequence; step order reflects call
//! order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::PlatformError;
use crate::core::identifiers::ExperimentId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TenantId;
use crate::core::job::ModelKind;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Experiment Record
// ============================================================================

/// Named grouping of runs for one tenant and model kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Experiment identifier.
    pub experiment_id: ExperimentId,
    /// Unique experiment name.
    pub name: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model the experiment trains.
    pub model_kind: ModelKind,
    /// Optional description.
    pub description: Option<String>,
    /// Free-form tags.
    pub tags: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// Run lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is executing.
    Running,
    /// Run ended successfully.
    Finished,
    /// Run ended with an error.
    Failed,
    /// Run was terminated externally.
    Killed,
}

impl RunStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Killed => "killed",
        }
    }

    /// Parses a stable label back into a status.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            "killed" => Ok(Self::Killed),
            other => Err(PlatformError::Validation(format!("unknown run status: {other}"))),
        }
    }
}

/// One recorded metric observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Step index supplied by the caller (0 when omitted).
    pub step: u32,
    /// Observation time.
    pub at: Timestamp,
    /// Observed value.
    pub value: f64,
}

/// One training execution recorded by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier.
    pub run_id: RunId,
    /// Owning experiment.
    pub experiment_id: ExperimentId,
    /// Run display name.
    pub name: String,
    /// Lifecycle status.
    pub status: RunStatus,
    /// String-coerced parameters.
    pub params: BTreeMap<String, String>,
    /// Metric timeseries in call order.
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    /// Free-form tags.
    pub tags: BTreeMap<String, String>,
    /// Artifact root for this run.
    pub artifact_uri: String,
    /// Start time.
    pub started_at: Timestamp,
    /// End time for finished runs.
    pub ended_at: Option<Timestamp>,
}

impl Run {
    /// Returns the latest observation of a metric, if recorded.
    #[must_use]
    pub fn latest_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(|points| points.last()).map(|point| point.value)
    }
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Summary statistics for one metric across runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of runs reporting the metric.
    pub count: u64,
    /// Mean of the latest observations.
    pub mean: f64,
    /// Population standard deviation of the latest observations.
    pub std: f64,
    /// Minimum observation.
    pub min: f64,
    /// Maximum observation.
    pub max: f64,
}

/// Aggregate statistics for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentStats {
    /// Experiment identifier.
    pub experiment_id: ExperimentId,
    /// Total run count.
    pub total_runs: u64,
    /// Run counts keyed by status label.
    pub status_counts: BTreeMap<String, u64>,
    /// Per-metric summary over all runs.
    pub metric_stats: BTreeMap<String, MetricSummary>,
}
