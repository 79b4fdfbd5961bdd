// gridmind-hpo/src/engine.rs
// ============================================================================
// Module: HPO Study Engine
// Description: Study lifecycle and the optimize loop.
// Purpose: Run trials over a sampler/pruner pair with durable trial state.
// Dependencies: gridmind-core, crate::{pruner, sampler}
// ============================================================================

//! ## Overview
//! The optimize loop asks the sampler for an assignment, invokes the
//! objective with a context that records intermediate reports and consults
//! the pruner, and persists the trial outcome. Objective failures are
//! isolated per trial; the study always proceeds to its trial budget or
//! wall-clock timeout. Best-trial selection follows the study direction
//! with ties broken by the lower trial number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use gridmind_core::ModelKind;
use gridmind_core::OptimizationHistoryPoint;
use gridmind_core::PlatformError;
use gridmind_core::PrunerKind;
use gridmind_core::SamplerKind;
use gridmind_core::Study;
use gridmind_core::StudyDirection;
use gridmind_core::StudyName;
use gridmind_core::StudyStore;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::Trial;
use gridmind_core::TrialState;
use gridmind_core::best_trial;
use gridmind_core::HyperparameterSpec;

use crate::pruner::Pruner;
use crate::pruner::build_pruner;
use crate::sampler::ParamAssignment;
use crate::sampler::SearchSpace;
use crate::sampler::build_sampler;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Seed used by study samplers.
const SAMPLER_SEED: u64 = 42;
/// Complete trials required before importances are reported.
const MIN_TRIALS_FOR_IMPORTANCE: usize = 2;
/// Bins used when decomposing a numeric axis for importances.
const IMPORTANCE_BINS: usize = 4;

// ============================================================================
// SECTION: Trial Context
// ============================================================================

/// Verdict returned to a reporting objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialVerdict {
    /// Keep training.
    Continue,
    /// Stop cooperatively; the trial records as pruned.
    Prune,
}

/// Outcome returned by an objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectiveStatus {
    /// Objective finished with a value.
    Complete(f64),
    /// Objective stopped after a prune verdict.
    Pruned,
}

/// Per-trial context handed to the objective.
pub struct TrialContext<'a> {
    /// Study direction.
    direction: StudyDirection,
    /// Active pruner.
    pruner: &'a dyn Pruner,
    /// Trials recorded before this one.
    history: &'a [Trial],
    /// Intermediate reports recorded so far.
    intermediate: BTreeMap<u32, f64>,
    /// Latched once a prune verdict was issued.
    pruned: bool,
}

impl TrialContext<'_> {
    /// Records an intermediate value and returns the pruning verdict.
    pub fn report(&mut self, step: u32, value: f64) -> TrialVerdict {
        self.intermediate.insert(step, value);
        if self.pruner.should_prune(self.direction, step, value, self.history) {
            self.pruned = true;
            TrialVerdict::Prune
        } else {
            TrialVerdict::Continue
        }
    }

    /// Returns true once a prune verdict was issued.
    #[must_use]
    pub const fn is_pruned(&self) -> bool {
        self.pruned
    }
}

// ============================================================================
// SECTION: Options / Report
// ============================================================================

/// Options for one optimize invocation.
#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    /// Trial budget override (defaults to the study's target).
    pub n_trials: Option<u32>,
    /// Wall-clock budget override (defaults to the study's timeout).
    pub timeout: Option<Duration>,
    /// Requested objective parallelism; trials execute serially within
    /// this process regardless, matching the single-node scope.
    pub parallelism: u32,
}

/// Summary of one optimize invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeReport {
    /// Study name.
    pub study: StudyName,
    /// Best objective value among complete trials.
    pub best_value: Option<f64>,
    /// Parameters of the best trial.
    pub best_params: Option<ParamAssignment>,
    /// Number of the best trial.
    pub best_trial_number: Option<u32>,
    /// Total recorded trials.
    pub n_trials: u64,
    /// Complete trials.
    pub completed_trials: u64,
    /// Pruned trials.
    pub pruned_trials: u64,
    /// Failed trials.
    pub failed_trials: u64,
}

// ============================================================================
// SECTION: Study Engine
// ============================================================================

/// Store-backed HPO study engine.
pub struct StudyEngine {
    /// Durable study/trial store.
    store: Arc<dyn StudyStore>,
}

impl StudyEngine {
    /// Creates an engine over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn StudyStore>) -> Self {
        Self { store }
    }

    /// Creates a new study from caller-supplied labels.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown direction,
    /// sampler, or pruner labels and [`PlatformError::Conflict`] for
    /// duplicate names.
    #[allow(clippy::too_many_arguments, reason = "Mirrors the study creation surface.")]
    pub fn create_study(
        &self,
        name: &StudyName,
        tenant_id: &TenantId,
        model_kind: ModelKind,
        direction: &str,
        sampler: &str,
        pruner: &str,
        n_trials: u32,
        timeout_seconds: Option<u64>,
    ) -> Result<Study, PlatformError> {
        let study = Study {
            name: name.clone(),
            tenant_id: tenant_id.clone(),
            model_kind,
            direction: StudyDirection::parse(direction)?,
            sampler: SamplerKind::parse(sampler)?,
            pruner: PrunerKind::parse(pruner)?,
            n_trials,
            timeout_seconds,
            user_attrs: BTreeMap::new(),
            created_at: Timestamp::now(),
        };
        self.store.insert_study(&study)?;
        Ok(study)
    }

    /// Loads a study by name.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] for unknown studies.
    pub fn get_study(&self, name: &StudyName) -> Result<Study, PlatformError> {
        self.store
            .get_study(name)?
            .ok_or_else(|| PlatformError::NotFound(format!("study not found: {name}")))
    }

    /// Lists all trials of a study in trial-number order.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store query fails.
    pub fn list_trials(&self, name: &StudyName) -> Result<Vec<Trial>, PlatformError> {
        let _ = self.get_study(name)?;
        Ok(self.store.list_trials(name)?)
    }

    /// Deletes a study and its trials.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] for unknown studies.
    pub fn delete_study(&self, name: &StudyName) -> Result<(), PlatformError> {
        if !self.store.delete_study(name)? {
            return Err(PlatformError::NotFound(format!("study not found: {name}")));
        }
        Ok(())
    }

    /// Resumes a study persisted in the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the study was never
    /// persisted.
    pub fn resume_study(&self, name: &StudyName) -> Result<Study, PlatformError> {
        self.get_study(name)
    }

    /// Runs the optimize loop for a study.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] on store failures; objective failures are
    /// recorded per trial and never abort the loop.
    pub fn optimize<F>(
        &self,
        name: &StudyName,
        mut objective: F,
        space: &SearchSpace,
        options: &OptimizeOptions,
        mut progress: Option<&mut dyn FnMut(u32, u32)>,
    ) -> Result<OptimizeReport, PlatformError>
    where
        F: FnMut(&ParamAssignment, &mut TrialContext<'_>) -> Result<ObjectiveStatus, PlatformError>,
    {
        let study = self.get_study(name)?;
        let n_trials = options.n_trials.unwrap_or(study.n_trials);
        let budget = options
            .timeout
            .or_else(|| study.timeout_seconds.map(Duration::from_secs));
        let mut sampler = build_sampler(study.sampler, study.direction, SAMPLER_SEED);
        let pruner = build_pruner(study.pruner);
        let started = Instant::now();
        let mut completed: u32 = 0;
        for _ in 0 .. n_trials {
            if let Some(budget) = budget {
                if started.elapsed() >= budget {
                    break;
                }
            }
            let history = self.store.list_trials(name)?;
            let params = sampler.sample(space, &history);
            let number = self.store.next_trial_number(name)?;
            let mut trial = Trial {
                study: name.clone(),
                number,
                params: params.clone(),
                state: TrialState::Running,
                value: None,
                intermediate: BTreeMap::new(),
                started_at: Timestamp::now(),
                completed_at: None,
            };
            self.store.insert_trial(&trial)?;
            let mut context = TrialContext {
                direction: study.direction,
                pruner: pruner.as_ref(),
                history: &history,
                intermediate: BTreeMap::new(),
                pruned: false,
            };
            let outcome = objective(&params, &mut context);
            trial.intermediate = context.intermediate;
            trial.completed_at = Some(Timestamp::now());
            match outcome {
                Ok(ObjectiveStatus::Complete(value)) => {
                    trial.state = TrialState::Complete;
                    trial.value = Some(value);
                }
                Ok(ObjectiveStatus::Pruned) => {
                    trial.state = TrialState::Pruned;
                }
                Err(_) => {
                    trial.state = TrialState::Failed;
                }
            }
            self.store.update_trial(&trial)?;
            completed += 1;
            if let Some(callback) = progress.as_mut() {
                callback(completed, n_trials);
            }
        }
        self.report(name, study.direction)
    }

    /// Builds the optimize report from stored trials.
    fn report(
        &self,
        name: &StudyName,
        direction: StudyDirection,
    ) -> Result<OptimizeReport, PlatformError> {
        let trials = self.store.list_trials(name)?;
        let best = best_trial(&trials, direction);
        let count_state = |state: TrialState| -> u64 {
            trials.iter().filter(|trial| trial.state == state).count() as u64
        };
        Ok(OptimizeReport {
            study: name.clone(),
            best_value: best.and_then(|trial| trial.value),
            best_params: best.map(|trial| trial.params.clone()),
            best_trial_number: best.map(|trial| trial.number),
            n_trials: trials.len() as u64,
            completed_trials: count_state(TrialState::Complete),
            pruned_trials: count_state(TrialState::Pruned),
            failed_trials: count_state(TrialState::Failed),
        })
    }

    /// Returns ordered (trial, value, best-so-far) triples over complete
    /// trials; best-so-far is monotone under the study direction.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store query fails.
    pub fn get_optimization_history(
        &self,
        name: &StudyName,
    ) -> Result<Vec<OptimizationHistoryPoint>, PlatformError> {
        let study = self.get_study(name)?;
        let trials = self.store.list_trials(name)?;
        let mut history = Vec::new();
        let mut best: Option<f64> = None;
        for trial in trials {
            if trial.state != TrialState::Complete {
                continue;
            }
            let Some(value) = trial.value else { continue };
            let incumbent = best.map_or(value, |incumbent| {
                if study.direction.improves(value, incumbent) { value } else { incumbent }
            });
            best = Some(incumbent);
            history.push(OptimizationHistoryPoint {
                trial_number: trial.number,
                value,
                best_value: incumbent,
            });
        }
        Ok(history)
    }

    /// Computes fANOVA-style parameter importances: the share of objective
    /// variance explained by grouping trials along each axis. Requires at
    /// least two complete trials; returns an empty map otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store query fails.
    pub fn get_param_importances(
        &self,
        name: &StudyName,
    ) -> Result<BTreeMap<String, f64>, PlatformError> {
        let _ = self.get_study(name)?;
        let trials = self.store.list_trials(name)?;
        let complete: Vec<&Trial> = trials
            .iter()
            .filter(|trial| trial.state == TrialState::Complete && trial.value.is_some())
            .collect();
        if complete.len() < MIN_TRIALS_FOR_IMPORTANCE {
            return Ok(BTreeMap::new());
        }
        let values: Vec<f64> = complete.iter().filter_map(|trial| trial.value).collect();
        let total_mean = values.iter().sum::<f64>() / values.len() as f64;
        let total_variance =
            values.iter().map(|value| (value - total_mean).powi(2)).sum::<f64>()
                / values.len() as f64;
        if total_variance <= f64::EPSILON {
            return Ok(BTreeMap::new());
        }
        let mut raw = BTreeMap::new();
        let param_keys: std::collections::BTreeSet<String> =
            complete.iter().flat_map(|trial| trial.params.keys().cloned()).collect();
        for key in param_keys {
            let explained = explained_variance(&complete, &key, total_mean);
            raw.insert(key, (explained / total_variance).clamp(0.0, 1.0));
        }
        let sum: f64 = raw.values().sum();
        if sum > 0.0 {
            for value in raw.values_mut() {
                *value /= sum;
            }
        }
        Ok(raw)
    }
}

// ============================================================================
// SECTION: Importance Helpers
// ============================================================================

/// Between-group variance of the objective when trials group by one axis.
///
/// Numeric axes bin into equal-count quantile groups; categorical axes
/// group by rendered value.
fn explained_variance(trials: &[&Trial], key: &str, total_mean: f64) -> f64 {
    let mut numeric: Vec<(f64, f64)> = Vec::new();
    let mut categorical: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for trial in trials {
        let Some(param) = trial.params.get(key) else { continue };
        let Some(value) = trial.value else { continue };
        match param.as_f64() {
            Some(axis) => numeric.push((axis, value)),
            None => categorical.entry(param.to_string()).or_default().push(value),
        }
    }
    let mut groups: Vec<Vec<f64>> = categorical.into_values().collect();
    if !numeric.is_empty() {
        numeric.sort_by(|a, b| a.0.total_cmp(&b.0));
        let bin_size = numeric.len().div_ceil(IMPORTANCE_BINS).max(1);
        for chunk in numeric.chunks(bin_size) {
            groups.push(chunk.iter().map(|(_, value)| *value).collect());
        }
    }
    let population: usize = groups.iter().map(Vec::len).sum();
    if population == 0 {
        return 0.0;
    }
    groups
        .iter()
        .map(|group| {
            let group_mean = group.iter().sum::<f64>() / group.len() as f64;
            group.len() as f64 * (group_mean - total_mean).powi(2)
        })
        .sum::<f64>()
        / population as f64
}

// ============================================================================
// SECTION: Suggested Spaces
// ============================================================================

/// Default search space per model kind.
#[must_use]
pub fn suggest_search_space(kind: ModelKind) -> SearchSpace {
    let mut space = SearchSpace::new();
    match kind {
        ModelKind::Forecast => {
            space.insert(
                "n_estimators".to_string(),
                HyperparameterSpec::Int { low: 50, high: 500, step: Some(50) },
            );
            space.insert(
                "learning_rate".to_string(),
                HyperparameterSpec::Float { low: 0.01, high: 0.3, log: true },
            );
            space.insert(
                "max_depth".to_string(),
                HyperparameterSpec::Int { low: 3, high: 15, step: None },
            );
            space.insert(
                "subsample".to_string(),
                HyperparameterSpec::Float { low: 0.5, high: 1.0, log: false },
            );
        }
        ModelKind::Anomaly => {
            space.insert(
                "n_estimators".to_string(),
                HyperparameterSpec::Int { low: 50, high: 300, step: None },
            );
            space.insert(
                "contamination".to_string(),
                HyperparameterSpec::Float { low: 0.01, high: 0.3, log: false },
            );
        }
    }
    space
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
