// gridmind-tracking/src/tracker.rs
// ============================================================================
// Module: Experiment Tracker
// Description: Run lifecycle, metric logging, artifacts, and queries.
// Purpose: Own the experiment/run records through the ExperimentStore.
// Dependencies: gridmind-core, serde_json, uuid
// ============================================================================

//! ## Overview
//! Experiments are create-if-absent by name. Runs log string-coerced
//! parameters and ordered metric observations; per-call failures in bulk
//! logging paths are isolated so one bad key never aborts a run. The best
//! run is selected on the latest observation of the requested metric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gridmind_core::ExperimentStats;
use gridmind_core::ExperimentStore;
use gridmind_core::MetricPoint;
use gridmind_core::MetricSummary;
use gridmind_core::ModelKind;
use gridmind_core::PlatformError;
use gridmind_core::Run;
use gridmind_core::RunId;
use gridmind_core::RunStatus;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::TrainingConfig;

// ============================================================================
// SECTION: Query Types
// ============================================================================

/// Filter applied by `search_runs`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunFilter {
    /// Keep runs whose latest metric observation is at most the bound.
    MetricAtMost(String, f64),
    /// Keep runs whose latest metric observation is at least the bound.
    MetricAtLeast(String, f64),
    /// Keep runs with the given status.
    StatusIs(RunStatus),
}

impl RunFilter {
    /// Returns true when the run passes the filter.
    fn matches(&self, run: &Run) -> bool {
        match self {
            Self::MetricAtMost(key, bound) => {
                run.latest_metric(key).is_some_and(|value| value <= *bound)
            }
            Self::MetricAtLeast(key, bound) => {
                run.latest_metric(key).is_some_and(|value| value >= *bound)
            }
            Self::StatusIs(status) => run.status == *status,
        }
    }
}

/// Ordering applied by `search_runs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOrder {
    /// Metric key to order on (latest observation).
    pub metric: String,
    /// True for ascending order.
    pub ascending: bool,
}

/// One run inside a comparison result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunComparison {
    /// Run identifier.
    pub run_id: RunId,
    /// Run display name.
    pub name: String,
    /// String-coerced parameters.
    pub params: BTreeMap<String, String>,
    /// Latest observation per compared metric.
    pub metrics: BTreeMap<String, f64>,
}

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Store-backed experiment tracker.
pub struct ExperimentTracker {
    /// Durable experiment/run store.
    store: Arc<dyn ExperimentStore>,
    /// Root directory receiving run artifacts.
    artifact_root: std::path::PathBuf,
}

impl ExperimentTracker {
    /// Creates a tracker writing artifacts under the given root.
    #[must_use]
    pub fn new(store: Arc<dyn ExperimentStore>, artifact_root: impl Into<std::path::PathBuf>) -> Self {
        Self { store, artifact_root: artifact_root.into() }
    }

    /// Creates the experiment when absent and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store upsert fails.
    pub fn create_experiment(
        &self,
        name: &str,
        tenant_id: &TenantId,
        model_kind: ModelKind,
    ) -> Result<gridmind_core::ExperimentId, PlatformError> {
        Ok(self.store.ensure_experiment(name, tenant_id, model_kind, Timestamp::now())?)
    }

    /// Starts a new run under an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the experiment cannot be ensured or
    /// the run insert fails.
    pub fn create_run(
        &self,
        experiment_name: &str,
        tenant_id: &TenantId,
        model_kind: ModelKind,
        run_name: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<RunId, PlatformError> {
        let experiment_id =
            self.store.ensure_experiment(experiment_name, tenant_id, model_kind, Timestamp::now())?;
        let run_id = RunId::from(format!("run-{}", uuid::Uuid::new_v4()));
        let artifact_uri =
            self.artifact_root.join(run_id.as_str()).to_string_lossy().into_owned();
        let run = Run {
            run_id: run_id.clone(),
            experiment_id,
            name: run_name.to_string(),
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            tags,
            artifact_uri,
            started_at: Timestamp::now(),
            ended_at: None,
        };
        self.store.insert_run(&run)?;
        Ok(run_id)
    }

    /// Logs one parameter, coercing the value to a string.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store write fails.
    pub fn log_param(
        &self,
        run_id: &RunId,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PlatformError> {
        let coerced = match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Ok(self.store.put_param(run_id, key, &coerced)?)
    }

    /// Appends one metric observation.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store write fails.
    pub fn log_metric(
        &self,
        run_id: &RunId,
        key: &str,
        value: f64,
        step: Option<u32>,
        at: Option<Timestamp>,
    ) -> Result<(), PlatformError> {
        let point = MetricPoint {
            step: step.unwrap_or(0),
            at: at.unwrap_or_else(Timestamp::now),
            value,
        };
        Ok(self.store.append_metric(run_id, key, &point)?)
    }

    /// Copies a local file into the run's artifact root.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the run is absent and
    /// [`PlatformError::Unavailable`] on filesystem failures.
    pub fn log_artifact(
        &self,
        run_id: &RunId,
        local_path: &Path,
        subdir: Option<&str>,
    ) -> Result<String, PlatformError> {
        let Some(run) = self.store.get_run(run_id)? else {
            return Err(PlatformError::NotFound(format!("run not found: {run_id}")));
        };
        let file_name = local_path
            .file_name()
            .ok_or_else(|| PlatformError::Validation("artifact path has no file name".to_string()))?;
        let mut target_dir = std::path::PathBuf::from(&run.artifact_uri);
        if let Some(subdir) = subdir {
            target_dir = target_dir.join(subdir);
        }
        fs::create_dir_all(&target_dir)
            .map_err(|err| PlatformError::Unavailable(err.to_string()))?;
        let target = target_dir.join(file_name);
        fs::copy(local_path, &target)
            .map_err(|err| PlatformError::Unavailable(err.to_string()))?;
        Ok(target.to_string_lossy().into_owned())
    }

    /// Sets one tag on a run.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store write fails.
    pub fn set_tag(&self, run_id: &RunId, key: &str, value: &str) -> Result<(), PlatformError> {
        Ok(self.store.put_tag(run_id, key, value)?)
    }

    /// Ends a run with a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store write fails.
    pub fn end_run(&self, run_id: &RunId, status: RunStatus) -> Result<(), PlatformError> {
        Ok(self.store.update_run_status(run_id, status, Timestamp::now())?)
    }

    /// Loads one run.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the load fails.
    pub fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, PlatformError> {
        Ok(self.store.get_run(run_id)?)
    }

    /// Searches runs across experiments with an optional filter and order.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when a store query fails.
    pub fn search_runs(
        &self,
        experiment_names: &[&str],
        filter: Option<&RunFilter>,
        order_by: Option<&RunOrder>,
        max_results: usize,
    ) -> Result<Vec<Run>, PlatformError> {
        let mut runs = Vec::new();
        for name in experiment_names {
            let Some(experiment) = self.store.get_experiment(name)? else { continue };
            runs.extend(self.store.runs_for_experiment(&experiment.experiment_id)?);
        }
        if let Some(filter) = filter {
            runs.retain(|run| filter.matches(run));
        }
        if let Some(order) = order_by {
            runs.sort_by(|a, b| {
                let left = a.latest_metric(&order.metric);
                let right = b.latest_metric(&order.metric);
                let ordering = match (left, right) {
                    (Some(left), Some(right)) => left.total_cmp(&right),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }
        runs.truncate(max_results);
        Ok(runs)
    }

    /// Compares runs on their latest metric observations.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when a store query fails; absent runs are
    /// skipped rather than failing the comparison.
    pub fn compare_runs(
        &self,
        run_ids: &[RunId],
        metric_keys: Option<&[&str]>,
    ) -> Result<Vec<RunComparison>, PlatformError> {
        let mut comparisons = Vec::with_capacity(run_ids.len());
        for run_id in run_ids {
            let Some(run) = self.store.get_run(run_id)? else { continue };
            let mut metrics = BTreeMap::new();
            for key in run.metrics.keys() {
                if metric_keys.is_some_and(|keys| !keys.contains(&key.as_str())) {
                    continue;
                }
                if let Some(value) = run.latest_metric(key) {
                    metrics.insert(key.clone(), value);
                }
            }
            comparisons.push(RunComparison {
                run_id: run.run_id.clone(),
                name: run.name.clone(),
                params: run.params.clone(),
                metrics,
            });
        }
        Ok(comparisons)
    }

    /// Returns the best run of an experiment under a metric, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when a store query fails.
    pub fn get_best_run(
        &self,
        experiment_name: &str,
        metric: &str,
        maximize: bool,
    ) -> Result<Option<Run>, PlatformError> {
        let Some(experiment) = self.store.get_experiment(experiment_name)? else {
            return Ok(None);
        };
        let runs = self.store.runs_for_experiment(&experiment.experiment_id)?;
        let mut best: Option<(f64, Run)> = None;
        for run in runs {
            let Some(value) = run.latest_metric(metric) else { continue };
            let improves = best.as_ref().is_none_or(|(incumbent, _)| {
                if maximize { value > *incumbent } else { value < *incumbent }
            });
            if improves {
                best = Some((value, run));
            }
        }
        Ok(best.map(|(_, run)| run))
    }

    /// Aggregates per-metric statistics over every run of an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the experiment is absent.
    pub fn get_experiment_stats(
        &self,
        experiment_name: &str,
    ) -> Result<ExperimentStats, PlatformError> {
        let Some(experiment) = self.store.get_experiment(experiment_name)? else {
            return Err(PlatformError::NotFound(format!(
                "experiment not found: {experiment_name}"
            )));
        };
        let runs = self.store.runs_for_experiment(&experiment.experiment_id)?;
        let mut status_counts: BTreeMap<String, u64> = BTreeMap::new();
        for run in &runs {
            *status_counts.entry(run.status.as_str().to_string()).or_insert(0) += 1;
        }
        let metric_keys: BTreeSet<String> =
            runs.iter().flat_map(|run| run.metrics.keys().cloned()).collect();
        let mut metric_stats = BTreeMap::new();
        for key in metric_keys {
            let values: Vec<f64> =
                runs.iter().filter_map(|run| run.latest_metric(&key)).collect();
            if values.is_empty() {
                continue;
            }
            let count = values.len() as u64;
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>()
                / values.len() as f64;
            metric_stats.insert(key, MetricSummary {
                count,
                mean,
                std: variance.sqrt(),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            });
        }
        Ok(ExperimentStats {
            experiment_id: experiment.experiment_id,
            total_runs: runs.len() as u64,
            status_counts,
            metric_stats,
        })
    }

    /// Logs a training configuration: each flattened leaf as a parameter
    /// plus the whole document as a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when serialization or store writes fail;
    /// the artifact write is best-effort and never fails the call.
    pub fn log_training_config(
        &self,
        run_id: &RunId,
        config: &TrainingConfig,
    ) -> Result<(), PlatformError> {
        let document = serde_json::to_value(config)
            .map_err(|err| PlatformError::Internal(err.to_string()))?;
        for (key, value) in flatten_json(&document) {
            self.log_param(run_id, &key, &value)?;
        }
        if let Some(run) = self.store.get_run(run_id)? {
            let target_dir = std::path::PathBuf::from(&run.artifact_uri).join("config");
            let write_result = fs::create_dir_all(&target_dir).and_then(|()| {
                fs::write(
                    target_dir.join("training_config.json"),
                    serde_json::to_vec_pretty(&document).unwrap_or_default(),
                )
            });
            let _ = write_result;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Flattening
// ============================================================================

/// Flattens a JSON document by dot-joining nested object keys.
#[must_use]
pub fn flatten_json(document: &serde_json::Value) -> Vec<(String, serde_json::Value)> {
    let mut leaves = Vec::new();
    flatten_into(document, String::new(), &mut leaves);
    leaves
}

/// Recursive worker for [`flatten_json`].
fn flatten_into(
    value: &serde_json::Value,
    prefix: String,
    leaves: &mut Vec<(String, serde_json::Value)>,
) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let joined =
                    if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                flatten_into(child, joined, leaves);
            }
        }
        other => leaves.push((prefix, other.clone())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
