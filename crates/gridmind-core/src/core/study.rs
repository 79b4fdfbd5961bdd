// gridmind-core/src/core/study.rs
// ============================================================================
// Module: Gridmind HPO Studies
// Description: Study and trial records for hyper-parameter optimization.
// Purpose: Capture the durable study model owned by the HPO engine.
// Dependencies: crate::core::{error, identifiers, job, time}, serde
// ============================================================================

//! ## Overview
//! A study is a named optimization over a parameter space with a sampler and
//! pruner. Trials carry monotone numbers within their study; the best trial
//! is the complete trial with the extremal objective under the study
//! direction, ties broken by the lower trial number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::PlatformError;
use crate::core::identifiers::StudyName;
use crate::core::identifiers::TenantId;
use crate::core::job::ModelKind;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Direction / Sampler / Pruner
// ============================================================================

/// Optimization direction for a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyDirection {
    /// Lower objective values are better.
    Minimize,
    /// Higher objective values are better.
    Maximize,
}

impl StudyDirection {
    /// Returns the stable label for the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimize => "minimize",
            Self::Maximize => "maximize",
        }
    }

    /// Parses a stable label back into a direction.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "minimize" => Ok(Self::Minimize),
            "maximize" => Ok(Self::Maximize),
            other => Err(PlatformError::Validation(format!("unknown direction: {other}"))),
        }
    }

    /// Returns true when `candidate` improves on `incumbent`.
    #[must_use]
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }
}

/// Sampler strategy names accepted by the study engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    /// Tree-structured Parzen estimator.
    Tpe,
    /// Seeded uniform sampling.
    Random,
    /// Cartesian grid over discretized axes.
    Grid,
}

impl SamplerKind {
    /// Returns the stable label for the sampler.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tpe => "tpe",
            Self::Random => "random",
            Self::Grid => "grid",
        }
    }

    /// Parses a stable label back into a sampler kind.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "tpe" => Ok(Self::Tpe),
            "random" => Ok(Self::Random),
            "grid" => Ok(Self::Grid),
            other => Err(PlatformError::Validation(format!("unknown sampler type: {other}"))),
        }
    }
}

/// Pruner strategy names accepted by the study engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunerKind {
    /// Median pruner with startup and warmup thresholds.
    Median,
    /// Successive-halving rung pruner.
    Hyperband,
    /// Pruning disabled.
    None,
}

impl PrunerKind {
    /// Returns the stable label for the pruner.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Hyperband => "hyperband",
            Self::None => "none",
        }
    }

    /// Parses a stable label back into a pruner kind.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "median" => Ok(Self::Median),
            "hyperband" => Ok(Self::Hyperband),
            "none" => Ok(Self::None),
            other => Err(PlatformError::Validation(format!("unknown pruner type: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Study Record
// ============================================================================

/// Durable HPO study record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    /// Unique study name.
    pub name: StudyName,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Kind of model optimized.
    pub model_kind: ModelKind,
    /// Optimization direction.
    pub direction: StudyDirection,
    /// Sampler strategy.
    pub sampler: SamplerKind,
    /// Pruner strategy.
    pub pruner: PrunerKind,
    /// Target trial count.
    pub n_trials: u32,
    /// Optional wall-clock budget in seconds.
    pub timeout_seconds: Option<u64>,
    /// Free-form user attributes.
    pub user_attrs: BTreeMap<String, String>,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Trial Record
// ============================================================================

/// Trial lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    /// Objective is executing.
    Running,
    /// Objective returned a value.
    Complete,
    /// Cooperatively stopped by the pruner.
    Pruned,
    /// Objective raised an error.
    Failed,
}

impl TrialState {
    /// Returns the stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Pruned => "pruned",
            Self::Failed => "failed",
        }
    }

    /// Parses a stable label back into a state.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "pruned" => Ok(Self::Pruned),
            "failed" => Ok(Self::Failed),
            other => Err(PlatformError::Validation(format!("unknown trial state: {other}"))),
        }
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hyper-parameter assignment and its outcome within a study.
///
/// # Invariants
/// - `number` is monotone within the study.
/// - `value` is set iff the state is `Complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Owning study name.
    pub study: StudyName,
    /// Monotone trial number within the study.
    pub number: u32,
    /// Sampled parameter assignment.
    pub params: BTreeMap<String, serde_json::Value>,
    /// Trial state.
    pub state: TrialState,
    /// Final objective value for complete trials.
    pub value: Option<f64>,
    /// Intermediate reports keyed by step.
    pub intermediate: BTreeMap<u32, f64>,
    /// Start time.
    pub started_at: Timestamp,
    /// Completion time for finished trials.
    pub completed_at: Option<Timestamp>,
}

/// Selects the best complete trial under a direction.
///
/// Ties resolve to the lower trial number; trials without values never win.
#[must_use]
pub fn best_trial<'a>(trials: &'a [Trial], direction: StudyDirection) -> Option<&'a Trial> {
    let mut best: Option<&'a Trial> = None;
    for trial in trials {
        if trial.state != TrialState::Complete {
            continue;
        }
        let Some(value) = trial.value else { continue };
        match best {
            None => best = Some(trial),
            Some(current) => {
                let Some(current_value) = current.value else {
                    best = Some(trial);
                    continue;
                };
                if direction.improves(value, current_value)
                    || (value == current_value && trial.number < current.number)
                {
                    best = Some(trial);
                }
            }
        }
    }
    best
}

// ============================================================================
// SECTION: Optimization History
// ============================================================================

/// One point of an optimization history: value and running best.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationHistoryPoint {
    /// Trial number.
    pub trial_number: u32,
    /// Objective value of the trial.
    pub value: f64,
    /// Best objective observed up to and including this trial.
    pub best_value: f64,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
