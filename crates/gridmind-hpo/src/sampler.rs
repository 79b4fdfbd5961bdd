// gridmind-hpo/src/sampler.rs
// ============================================================================
// Module: HPO Samplers
// Description: Parameter-assignment strategies over a search space.
// Purpose: Provide the tpe, random, and grid samplers behind one trait.
// Dependencies: gridmind-core, rand, serde_json
// ============================================================================

//! ## Overview
//! Samplers draw one assignment per trial from the declared search space.
//! All randomness derives from a fixed seed so repeated studies with the
//! same history sample identically. The TPE sampler runs a random startup
//! phase, then ranks prior-drawn candidates by the ratio of Parzen
//! estimates built over the good and bad halves of the observed trials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::HyperparameterSpec;
use gridmind_core::StudyDirection;
use gridmind_core::Trial;
use gridmind_core::TrialState;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random trials before TPE switches to model-based sampling.
const TPE_STARTUP_TRIALS: usize = 10;
/// Candidates drawn from the prior per TPE decision.
const TPE_CANDIDATES: usize = 24;
/// Divisor selecting the "good" fraction of observed trials (one quarter).
const TPE_GAMMA_DENOM: usize = 4;
/// Grid resolution for continuous axes.
const GRID_FLOAT_POINTS: usize = 10;

// ============================================================================
// SECTION: Search Space
// ============================================================================

/// Named search space handled by the samplers.
pub type SearchSpace = BTreeMap<String, HyperparameterSpec>;

/// Sampled parameter assignment.
pub type ParamAssignment = BTreeMap<String, serde_json::Value>;

// ============================================================================
// SECTION: Sampler Trait
// ============================================================================

/// Parameter-assignment strategy.
pub trait Sampler: Send {
    /// Draws the next assignment given the trials observed so far.
    fn sample(&mut self, space: &SearchSpace, history: &[Trial]) -> ParamAssignment;
}

/// Builds the sampler for a study.
#[must_use]
pub fn build_sampler(
    kind: gridmind_core::SamplerKind,
    direction: StudyDirection,
    seed: u64,
) -> Box<dyn Sampler> {
    match kind {
        gridmind_core::SamplerKind::Random => Box::new(RandomSampler::new(seed)),
        gridmind_core::SamplerKind::Tpe => Box::new(TpeSampler::new(seed, direction)),
        gridmind_core::SamplerKind::Grid => Box::new(GridSampler::new()),
    }
}

// ============================================================================
// SECTION: Random Sampler
// ============================================================================

/// Seeded uniform sampler.
pub struct RandomSampler {
    /// Deterministic generator.
    rng: StdRng,
}

impl RandomSampler {
    /// Creates a sampler from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, space: &SearchSpace, _history: &[Trial]) -> ParamAssignment {
        space
            .iter()
            .map(|(name, spec)| (name.clone(), draw_from_prior(&mut self.rng, spec)))
            .collect()
    }
}

/// Draws one value uniformly from a spec.
fn draw_from_prior(rng: &mut StdRng, spec: &HyperparameterSpec) -> serde_json::Value {
    match spec {
        HyperparameterSpec::Int { low, high, step } => {
            let step = step.unwrap_or(1).max(1);
            let buckets = (high - low) / step;
            let draw = rng.gen_range(0 ..= buckets);
            serde_json::json!(low + draw * step)
        }
        HyperparameterSpec::Float { low, high, log } => {
            if *log {
                let value = (rng.gen_range(low.ln() ..= high.ln())).exp();
                serde_json::json!(value)
            } else {
                serde_json::json!(rng.gen_range(*low ..= *high))
            }
        }
        HyperparameterSpec::Categorical { choices } => {
            if choices.is_empty() {
                serde_json::Value::Null
            } else {
                choices[rng.gen_range(0 .. choices.len())].clone()
            }
        }
        HyperparameterSpec::Loguniform { low, high } => {
            serde_json::json!((rng.gen_range(low.ln() ..= high.ln())).exp())
        }
    }
}

// ============================================================================
// SECTION: TPE Sampler
// ============================================================================

/// Tree-structured Parzen estimator sampler.
pub struct TpeSampler {
    /// Deterministic generator for candidate draws.
    rng: StdRng,
    /// Study direction used to split good and bad observations.
    direction: StudyDirection,
}

impl TpeSampler {
    /// Creates a sampler from a seed and direction.
    #[must_use]
    pub fn new(seed: u64, direction: StudyDirection) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), direction }
    }
}

impl Sampler for TpeSampler {
    fn sample(&mut self, space: &SearchSpace, history: &[Trial]) -> ParamAssignment {
        let mut observed: Vec<&Trial> = history
            .iter()
            .filter(|trial| trial.state == TrialState::Complete && trial.value.is_some())
            .collect();
        if observed.len() < TPE_STARTUP_TRIALS {
            return space
                .iter()
                .map(|(name, spec)| (name.clone(), draw_from_prior(&mut self.rng, spec)))
                .collect();
        }
        observed.sort_by(|a, b| {
            let left = a.value.unwrap_or(f64::INFINITY);
            let right = b.value.unwrap_or(f64::INFINITY);
            match self.direction {
                StudyDirection::Minimize => left.total_cmp(&right),
                StudyDirection::Maximize => right.total_cmp(&left),
            }
        });
        let split = observed.len().div_ceil(TPE_GAMMA_DENOM).max(1);
        let (good, bad) = observed.split_at(split);
        let mut assignment = ParamAssignment::new();
        for (name, spec) in space {
            let candidates: Vec<serde_json::Value> =
                (0 .. TPE_CANDIDATES).map(|_| draw_from_prior(&mut self.rng, spec)).collect();
            let best = candidates
                .into_iter()
                .map(|candidate| {
                    let score = parzen_score(&candidate, name, spec, good)
                        / parzen_score(&candidate, name, spec, bad).max(1e-12);
                    (candidate, score)
                })
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(candidate, _)| candidate)
                .unwrap_or(serde_json::Value::Null);
            assignment.insert(name.clone(), best);
        }
        assignment
    }
}

/// Parzen-style density estimate of a candidate under observed trials.
fn parzen_score(
    candidate: &serde_json::Value,
    name: &str,
    spec: &HyperparameterSpec,
    observed: &[&Trial],
) -> f64 {
    match spec {
        HyperparameterSpec::Categorical { choices } => {
            let total = observed.len() as f64 + choices.len().max(1) as f64;
            let matches = observed
                .iter()
                .filter(|trial| trial.params.get(name) == Some(candidate))
                .count() as f64;
            (matches + 1.0) / total
        }
        _ => {
            let candidate = candidate.as_f64().unwrap_or(0.0);
            let values: Vec<f64> =
                observed.iter().filter_map(|trial| trial.params.get(name)?.as_f64()).collect();
            if values.is_empty() {
                return 1e-12;
            }
            let bandwidth = numeric_bandwidth(spec, values.len());
            values
                .iter()
                .map(|center| gaussian_kernel(candidate, *center, bandwidth))
                .sum::<f64>()
                / values.len() as f64
        }
    }
}

/// Kernel bandwidth derived from the axis span and observation count.
fn numeric_bandwidth(spec: &HyperparameterSpec, n: usize) -> f64 {
    let span = match spec {
        HyperparameterSpec::Int { low, high, .. } => (high - low) as f64,
        HyperparameterSpec::Float { low, high, .. }
        | HyperparameterSpec::Loguniform { low, high } => high - low,
        HyperparameterSpec::Categorical { .. } => 1.0,
    };
    (span / (n as f64).sqrt()).max(1e-6)
}

/// Unnormalized Gaussian kernel.
fn gaussian_kernel(x: f64, center: f64, bandwidth: f64) -> f64 {
    let z = (x - center) / bandwidth;
    (-0.5 * z * z).exp()
}

// ============================================================================
// SECTION: Grid Sampler
// ============================================================================

/// Cartesian grid sampler over discretized axes.
pub struct GridSampler {
    /// Next flat grid index.
    cursor: usize,
}

impl GridSampler {
    /// Creates a grid sampler starting at the origin.
    #[must_use]
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }
}

impl Default for GridSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for GridSampler {
    fn sample(&mut self, space: &SearchSpace, _history: &[Trial]) -> ParamAssignment {
        let axes: Vec<(String, Vec<serde_json::Value>)> = space
            .iter()
            .map(|(name, spec)| (name.clone(), discretize(spec)))
            .collect();
        let total: usize = axes.iter().map(|(_, axis)| axis.len().max(1)).product();
        let mut index = if total == 0 { 0 } else { self.cursor % total };
        self.cursor = self.cursor.wrapping_add(1);
        let mut assignment = ParamAssignment::new();
        for (name, axis) in axes {
            if axis.is_empty() {
                assignment.insert(name, serde_json::Value::Null);
                continue;
            }
            assignment.insert(name, axis[index % axis.len()].clone());
            index /= axis.len();
        }
        assignment
    }
}

/// Discretizes one axis for grid traversal.
fn discretize(spec: &HyperparameterSpec) -> Vec<serde_json::Value> {
    match spec {
        HyperparameterSpec::Int { low, high, step } => {
            let step = step.unwrap_or(1).max(1);
            let mut values = Vec::new();
            let mut current = *low;
            while current <= *high {
                values.push(serde_json::json!(current));
                current += step;
            }
            values
        }
        HyperparameterSpec::Float { low, high, log } => {
            linspace(*low, *high, *log, GRID_FLOAT_POINTS)
        }
        HyperparameterSpec::Categorical { choices } => choices.clone(),
        HyperparameterSpec::Loguniform { low, high } => {
            linspace(*low, *high, true, GRID_FLOAT_POINTS)
        }
    }
}

/// Evenly spaced points in linear or log space.
fn linspace(low: f64, high: f64, log: bool, points: usize) -> Vec<serde_json::Value> {
    let points = points.max(2);
    (0 .. points)
        .map(|index| {
            let fraction = index as f64 / (points - 1) as f64;
            let value = if log {
                (low.ln() + fraction * (high.ln() - low.ln())).exp()
            } else {
                low + fraction * (high - low)
            };
            serde_json::json!(value)
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
