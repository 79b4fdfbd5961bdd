// gridmind-pipeline/src/pipeline.rs
// ============================================================================
// Module: Training Pipeline
// Description: Five-stage executor from feature load to registration.
// Purpose: Execute one claimed training job deterministically.
// Dependencies: gridmind-core, gridmind-hpo, gridmind-registry, gridmind-tracking
// ============================================================================

//! ## Overview
//! Stages run in strict order with durable progress milestones: load
//! (0.20), preprocess (0.40), fit (0.70), evaluate (0.85), register
//! (1.00). Cancellation is checked between stages; the register stage is
//! additionally guarded so a cancelled job never produces registry writes.
//! The fit stage consults the single-node/distributed policy but always
//! executes single-node in this process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use gridmind_core::ExecutionContext;
use gridmind_core::ExecutionOutcome;
use gridmind_core::Executor;
use gridmind_core::FeatureRepository;
use gridmind_core::HyperparameterValue;
use gridmind_core::JobId;
use gridmind_core::LogLevel;
use gridmind_core::Model;
use gridmind_core::ModelKind;
use gridmind_core::ModelVersionRef;
use gridmind_core::PlatformError;
use gridmind_core::StudyName;
use gridmind_core::TrainingJob;
use gridmind_core::TrainingMetrics;
use gridmind_hpo::ObjectiveStatus;
use gridmind_hpo::OptimizeOptions;
use gridmind_hpo::StudyEngine;
use gridmind_registry::ModelRegistry;
use gridmind_registry::RegisterRequest;
use gridmind_tracking::ExperimentTracker;

use crate::dataset::SplitDataset;
use crate::loader::load_training_frame;
use crate::models::ANOMALY_Z_THRESHOLD;
use crate::models::AnomalyDetector;
use crate::models::GbtParams;
use crate::models::GbtRegressor;
use crate::models::extract_hyperparameters;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Progress milestone after the load stage.
const PROGRESS_LOADED: f64 = 0.20;
/// Progress milestone after the preprocess stage.
const PROGRESS_PREPROCESSED: f64 = 0.40;
/// Progress milestone after the fit stage.
const PROGRESS_FITTED: f64 = 0.70;
/// Progress milestone after the evaluate stage.
const PROGRESS_EVALUATED: f64 = 0.85;
/// Progress milestone after the register stage.
const PROGRESS_REGISTERED: f64 = 1.00;
/// Training rows above which distributed execution becomes eligible.
pub const DISTRIBUTED_ROW_THRESHOLD: usize = 10_000;

// ============================================================================
// SECTION: Distribution Policy
// ============================================================================

/// Single-node/distributed fit policy: distributed requires an available
/// runtime, more than one worker, and a training set above the threshold.
#[must_use]
pub const fn use_distributed(runtime_available: bool, n_workers: u32, train_rows: usize) -> bool {
    runtime_available && n_workers > 1 && train_rows > DISTRIBUTED_ROW_THRESHOLD
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Concrete five-stage pipeline injected into the orchestrator.
pub struct TrainingPipeline {
    /// Cold feature access for the load stage.
    features: Arc<dyn FeatureRepository>,
    /// Registry receiving trained artifacts.
    registry: Arc<ModelRegistry>,
    /// Tracker recording one run per execution.
    tracker: Arc<ExperimentTracker>,
    /// Study engine used when HPO is enabled.
    hpo: Arc<StudyEngine>,
}

impl TrainingPipeline {
    /// Creates a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        features: Arc<dyn FeatureRepository>,
        registry: Arc<ModelRegistry>,
        tracker: Arc<ExperimentTracker>,
        hpo: Arc<StudyEngine>,
    ) -> Self {
        Self { features, registry, tracker, hpo }
    }

    /// Fits the configured model kind, optionally searching with HPO first.
    fn fit_model(
        &self,
        job: &TrainingJob,
        split: &SplitDataset,
        ctx: &ExecutionContext,
    ) -> Result<(Box<dyn Model>, GbtParams), PlatformError> {
        let mut params = extract_hyperparameters(&job.config.hyperparameters);
        if job.config.enable_hpo && job.model_kind == ModelKind::Forecast {
            params = self.search_hyperparameters(job, split, ctx)?;
        }
        let model: Box<dyn Model> = match job.model_kind {
            ModelKind::Forecast => Box::new(GbtRegressor::fit(
                &split.train.rows,
                &split.train.targets,
                &params,
                job.config.random_seed,
            )),
            ModelKind::Anomaly => Box::new(AnomalyDetector::fit(&split.train.rows)),
        };
        Ok((model, params))
    }

    /// Runs an HPO study over the validation loss and returns the winning
    /// concrete parameters merged over the defaults.
    fn search_hyperparameters(
        &self,
        job: &TrainingJob,
        split: &SplitDataset,
        ctx: &ExecutionContext,
    ) -> Result<GbtParams, PlatformError> {
        let study_name = StudyName::from(format!("job-{}", job.job_id));
        self.hpo.create_study(
            &study_name,
            &job.tenant_id,
            job.model_kind,
            "minimize",
            "tpe",
            "median",
            job.config.n_trials,
            None,
        )?;
        let search_space: gridmind_hpo::sampler::SearchSpace = job
            .config
            .hyperparameters
            .iter()
            .filter_map(|(key, value)| {
                value.as_search().map(|spec| (key.clone(), spec.clone()))
            })
            .collect();
        let search_space = if search_space.is_empty() {
            gridmind_hpo::suggest_search_space(job.model_kind)
        } else {
            search_space
        };
        let seed = job.config.random_seed;
        let train_rows = &split.train.rows;
        let train_targets = &split.train.targets;
        let validation_rows = &split.validation.rows;
        let validation_targets = &split.validation.targets;
        let report = self.hpo.optimize(
            &study_name,
            |assignment, _context| {
                let mut candidate = extract_hyperparameters(
                    &assignment
                        .iter()
                        .map(|(key, value)| {
                            (key.clone(), HyperparameterValue::Scalar(value.clone()))
                        })
                        .collect(),
                );
                // Keep search fits cheap; the final fit uses the full budget.
                candidate.n_estimators = candidate.n_estimators.min(50);
                let model = GbtRegressor::fit(train_rows, train_targets, &candidate, seed);
                let predictions = model.predict(validation_rows);
                let metrics = evaluate_forecast(validation_targets, &predictions);
                Ok(ObjectiveStatus::Complete(
                    metrics.get("mae").copied().unwrap_or(f64::INFINITY),
                ))
            },
            &search_space,
            &OptimizeOptions::default(),
            None,
        )?;
        let _ = ctx.progress.log(
            &job.job_id,
            LogLevel::Info,
            &format!(
                "hyperparameter search finished: {} complete, {} pruned, {} failed",
                report.completed_trials, report.pruned_trials, report.failed_trials
            ),
        );
        let mut params = extract_hyperparameters(&job.config.hyperparameters);
        if let Some(best) = report.best_params {
            let merged: BTreeMap<String, HyperparameterValue> = best
                .into_iter()
                .map(|(key, value)| (key, HyperparameterValue::Scalar(value)))
                .collect();
            params = extract_hyperparameters(&merged);
        }
        Ok(params)
    }

    /// Registers the trained model and returns its model id.
    fn register_model(
        &self,
        job: &TrainingJob,
        model: &dyn Model,
        params: &GbtParams,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<String, PlatformError> {
        let version = version_string();
        let reference = ModelVersionRef::new(
            job.tenant_id.clone(),
            job.model_name.clone(),
            version.into(),
        );
        let envelope =
            model.to_envelope().map_err(|err| PlatformError::Internal(err.to_string()))?;
        let mut metadata = BTreeMap::new();
        metadata.insert("feature_set".to_string(), serde_json::json!(job.config.feature_set));
        metadata
            .insert("target_column".to_string(), serde_json::json!(job.config.target_column));
        metadata.insert("horizon".to_string(), serde_json::json!(job.config.horizon));
        metadata.insert("n_features".to_string(), serde_json::json!(model.feature_count()));
        metadata.insert(
            "hyperparameters".to_string(),
            serde_json::to_value(params).unwrap_or_default(),
        );
        metadata.insert(
            "training_window".to_string(),
            serde_json::json!({
                "start": job.config.start_date.unix_millis(),
                "end": job.config.end_date.unix_millis(),
            }),
        );
        let registered = self.registry.register(RegisterRequest {
            reference,
            artifact: envelope.to_bytes(),
            model_type: match job.model_kind {
                ModelKind::Forecast => "gbt_regressor".to_string(),
                ModelKind::Anomaly => "zscore_detector".to_string(),
            },
            metadata,
            metrics: Some(metrics.clone()),
        })?;
        Ok(registered.reference().model_id())
    }
}

// ============================================================================
// SECTION: Executor Implementation
// ============================================================================

#[async_trait::async_trait]
impl Executor for TrainingPipeline {
    async fn execute(
        &self,
        job: &TrainingJob,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionOutcome, PlatformError> {
        let started = Instant::now();
        let job_id = job.job_id;
        let run_id = self.tracker.create_run(
            &format!("{}:{}", job.tenant_id, job.model_kind),
            &job.tenant_id,
            job.model_kind,
            &format!("job-{job_id}"),
            job.tags.clone(),
        )?;
        let _ = self.tracker.log_training_config(&run_id, &job.config);
        let result = self.run_stages(job, ctx, started).await;
        match &result {
            Ok(outcome) => {
                for (name, value) in outcome.metrics.iter() {
                    let _ = self.tracker.log_metric(&run_id, name, value, None, None);
                }
                let _ = self.tracker.end_run(&run_id, gridmind_core::RunStatus::Finished);
            }
            Err(_) => {
                let status = if ctx.cancel.is_cancelled() {
                    gridmind_core::RunStatus::Killed
                } else {
                    gridmind_core::RunStatus::Failed
                };
                let _ = self.tracker.end_run(&run_id, status);
            }
        }
        result
    }
}

impl TrainingPipeline {
    /// Executes the five stages in order with cancellation checks between.
    async fn run_stages(
        &self,
        job: &TrainingJob,
        ctx: &ExecutionContext,
        started: Instant,
    ) -> Result<ExecutionOutcome, PlatformError> {
        let job_id = job.job_id;

        // Stage 1: load.
        check_cancelled(&job_id, ctx)?;
        let frame = load_training_frame(self.features.as_ref(), &job.tenant_id, &job.config)?;
        let _ = ctx.progress.log(
            &job_id,
            LogLevel::Info,
            &format!("loaded {} rows with {} features", frame.len(), frame.feature_names.len()),
        );
        ctx.progress.report(&job_id, PROGRESS_LOADED, None)?;

        // Stage 2: preprocess.
        check_cancelled(&job_id, ctx)?;
        let split = frame
            .split_and_scale(job.config.validation_split, job.config.test_split)?;
        let _ = ctx.progress.log(
            &job_id,
            LogLevel::Info,
            &format!(
                "split rows: train={}, validation={}, test={}",
                split.train.len(),
                split.validation.len(),
                split.test.len()
            ),
        );
        ctx.progress.report(&job_id, PROGRESS_PREPROCESSED, None)?;

        // Stage 3: fit.
        check_cancelled(&job_id, ctx)?;
        if use_distributed(false, job.config.n_workers, split.train.len()) {
            let _ = ctx.progress.log(
                &job_id,
                LogLevel::Info,
                "distributed fit eligible; executing single-node",
            );
        }
        let (model, params) = self.fit_model(job, &split, ctx)?;
        ctx.progress.report(&job_id, PROGRESS_FITTED, None)?;

        // Stage 4: evaluate.
        check_cancelled(&job_id, ctx)?;
        let predictions = model.predict(&split.test.rows);
        let mut metric_map = match job.model_kind {
            ModelKind::Forecast => evaluate_forecast(&split.test.targets, &predictions),
            ModelKind::Anomaly => {
                evaluate_anomaly(&split.test.targets, &predictions, ANOMALY_Z_THRESHOLD)
            }
        };
        if let Some(r2) = model.score(&split.test.rows, &split.test.targets) {
            metric_map.insert("r2_score".to_string(), r2);
        }
        let mut metrics: TrainingMetrics =
            metric_map.iter().map(|(name, value)| (name.clone(), *value)).collect();
        ctx.progress.report(&job_id, PROGRESS_EVALUATED, Some(&metrics))?;

        // Stage 5: register, guarded against cancellation.
        check_cancelled(&job_id, ctx)?;
        let model_id = if job.config.register_model {
            self.register_model(job, model.as_ref(), &params, &metric_map)?
        } else {
            format!("{}:{}:unregistered", job.tenant_id, job.model_name)
        };
        metrics.set("training_time_seconds", started.elapsed().as_secs_f64());
        ctx.progress.report(&job_id, PROGRESS_REGISTERED, Some(&metrics))?;
        Ok(ExecutionOutcome { model_id, metrics })
    }
}

/// Fails fast when the job was cancelled between stages.
fn check_cancelled(job_id: &JobId, ctx: &ExecutionContext) -> Result<(), PlatformError> {
    if ctx.cancel.is_cancelled() {
        return Err(PlatformError::Conflict(format!("job cancelled: {job_id}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Forecast regression metrics: mae, rmse, mape, and r2.
#[must_use]
pub fn evaluate_forecast(targets: &[f64], predictions: &[f64]) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    let n = targets.len().min(predictions.len());
    if n == 0 {
        return metrics;
    }
    let mut abs_sum = 0.0;
    let mut square_sum = 0.0;
    let mut mape_sum = 0.0;
    let mut mape_count = 0_usize;
    for (target, prediction) in targets.iter().zip(predictions).take(n) {
        let error = prediction - target;
        abs_sum += error.abs();
        square_sum += error * error;
        if target.abs() > f64::EPSILON {
            mape_sum += (error / target).abs();
            mape_count += 1;
        }
    }
    metrics.insert("mae".to_string(), abs_sum / n as f64);
    metrics.insert("rmse".to_string(), (square_sum / n as f64).sqrt());
    if mape_count > 0 {
        metrics.insert("mape".to_string(), mape_sum / mape_count as f64 * 100.0);
    }
    let mean = targets.iter().take(n).sum::<f64>() / n as f64;
    let total: f64 = targets.iter().take(n).map(|target| (target - mean).powi(2)).sum();
    if total > 0.0 {
        metrics.insert("r2_score".to_string(), 1.0 - square_sum / total);
    }
    metrics
}

/// Anomaly classification metrics from continuous scores: precision,
/// recall, f1, and AUC. Targets binarize at 0.5; scores at `threshold`.
#[must_use]
pub fn evaluate_anomaly(
    targets: &[f64],
    scores: &[f64],
    threshold: f64,
) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    let n = targets.len().min(scores.len());
    if n == 0 {
        return metrics;
    }
    let mut true_positive = 0_usize;
    let mut false_positive = 0_usize;
    let mut false_negative = 0_usize;
    for (target, score) in targets.iter().zip(scores).take(n) {
        let actual = *target > 0.5;
        let predicted = *score > threshold;
        match (actual, predicted) {
            (true, true) => true_positive += 1,
            (false, true) => false_positive += 1,
            (true, false) => false_negative += 1,
            (false, false) => {}
        }
    }
    let precision = if true_positive + false_positive == 0 {
        0.0
    } else {
        true_positive as f64 / (true_positive + false_positive) as f64
    };
    let recall = if true_positive + false_negative == 0 {
        0.0
    } else {
        true_positive as f64 / (true_positive + false_negative) as f64
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    metrics.insert("precision".to_string(), precision);
    metrics.insert("recall".to_string(), recall);
    metrics.insert("f1_score".to_string(), f1);
    metrics.insert("auc_roc".to_string(), rank_auc(targets, scores, n));
    metrics
}

/// Mann–Whitney rank AUC over continuous scores.
fn rank_auc(targets: &[f64], scores: &[f64], n: usize) -> f64 {
    let mut positives = 0_usize;
    let mut pairs: Vec<(f64, bool)> = targets
        .iter()
        .zip(scores)
        .take(n)
        .map(|(target, score)| {
            let positive = *target > 0.5;
            if positive {
                positives += 1;
            }
            (*score, positive)
        })
        .collect();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    // Rank sum with midpoint ranks for ties.
    let mut rank_sum = 0.0;
    let mut index = 0_usize;
    while index < pairs.len() {
        let mut tie_end = index;
        while tie_end + 1 < pairs.len() && pairs[tie_end + 1].0 == pairs[index].0 {
            tie_end += 1;
        }
        let midpoint_rank = (index + tie_end) as f64 / 2.0 + 1.0;
        for pair in &pairs[index ..= tie_end] {
            if pair.1 {
                rank_sum += midpoint_rank;
            }
        }
        index = tie_end + 1;
    }
    let u = rank_sum - positives as f64 * (positives as f64 + 1.0) / 2.0;
    u / (positives as f64 * negatives as f64)
}

// ============================================================================
// SECTION: Versioning
// ============================================================================

/// Wall-clock version string in the `YYYYMMDD.HHMMSS` form.
fn version_string() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}.{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
