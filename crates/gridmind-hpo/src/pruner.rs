// gridmind-hpo/src/pruner.rs
// ============================================================================
// Module: HPO Pruners
// Description: Cooperative early-stop strategies for unpromising trials.
// Purpose: Provide the median, hyperband, and none pruners behind one trait.
// Dependencies: gridmind-core
// ============================================================================

//! ## Overview
//! Pruning is cooperative: the trial context consults the pruner at every
//! intermediate report and the objective stops itself when asked. Pruners
//! only ever compare against previously recorded trials; with no peers at a
//! comparable point they never prune.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gridmind_core::PrunerKind;
use gridmind_core::StudyDirection;
use gridmind_core::Trial;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Median pruner: completed trials required before pruning activates.
const MEDIAN_STARTUP_TRIALS: usize = 5;
/// Median pruner: steps within a trial before pruning activates.
const MEDIAN_WARMUP_STEPS: u32 = 5;
/// Hyperband reduction factor between rungs.
const HYPERBAND_ETA: u32 = 3;

// ============================================================================
// SECTION: Pruner Trait
// ============================================================================

/// Cooperative early-stop strategy.
pub trait Pruner: Send {
    /// Decides whether the reporting trial should stop at this step.
    fn should_prune(
        &self,
        direction: StudyDirection,
        step: u32,
        value: f64,
        history: &[Trial],
    ) -> bool;
}

/// Builds the pruner for a study.
#[must_use]
pub fn build_pruner(kind: PrunerKind) -> Box<dyn Pruner> {
    match kind {
        PrunerKind::Median => Box::new(MedianPruner),
        PrunerKind::Hyperband => Box::new(HyperbandPruner),
        PrunerKind::None => Box::new(NonePruner),
    }
}

// ============================================================================
// SECTION: Median Pruner
// ============================================================================

/// Prunes trials whose report falls on the losing side of the median of
/// peer reports at the same step.
pub struct MedianPruner;

impl Pruner for MedianPruner {
    fn should_prune(
        &self,
        direction: StudyDirection,
        step: u32,
        value: f64,
        history: &[Trial],
    ) -> bool {
        if step < MEDIAN_WARMUP_STEPS {
            return false;
        }
        let reported: Vec<f64> = history
            .iter()
            .filter_map(|trial| trial.intermediate.get(&step).copied())
            .collect();
        if reported.len() < MEDIAN_STARTUP_TRIALS {
            return false;
        }
        let median = median_of(&reported);
        match direction {
            StudyDirection::Minimize => value > median,
            StudyDirection::Maximize => value < median,
        }
    }
}

// ============================================================================
// SECTION: Hyperband Pruner
// ============================================================================

/// Successive-halving pruner comparing rung peers.
///
/// # Invariants
/// - With no peer reports at a rung (including an empty study) the pruner
///   is a no-op.
pub struct HyperbandPruner;

impl Pruner for HyperbandPruner {
    fn should_prune(
        &self,
        direction: StudyDirection,
        step: u32,
        value: f64,
        history: &[Trial],
    ) -> bool {
        if !is_rung(step) {
            return false;
        }
        let mut peers: Vec<f64> = history
            .iter()
            .filter_map(|trial| trial.intermediate.get(&step).copied())
            .collect();
        if peers.is_empty() {
            return false;
        }
        peers.sort_by(f64::total_cmp);
        let keep = (peers.len() / HYPERBAND_ETA as usize).max(1);
        let threshold = match direction {
            StudyDirection::Minimize => peers[keep - 1],
            StudyDirection::Maximize => peers[peers.len() - keep],
        };
        match direction {
            StudyDirection::Minimize => value > threshold,
            StudyDirection::Maximize => value < threshold,
        }
    }
}

/// Returns true when the step sits on a hyperband rung (powers of eta).
fn is_rung(step: u32) -> bool {
    if step == 0 {
        return false;
    }
    let mut rung = 1u32;
    while rung < step {
        match rung.checked_mul(HYPERBAND_ETA) {
            Some(next) => rung = next,
            None => return false,
        }
    }
    rung == step
}

// ============================================================================
// SECTION: None Pruner
// ============================================================================

/// Pruning disabled.
pub struct NonePruner;

impl Pruner for NonePruner {
    fn should_prune(
        &self,
        _direction: StudyDirection,
        _step: u32,
        _value: f64,
        _history: &[Trial],
    ) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Median of a non-empty slice.
fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
