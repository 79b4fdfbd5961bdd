// gridmind-pipeline/src/validate.rs
// ============================================================================
// Module: Model Validator
// Description: Threshold, baseline, drift, stability, and range checks.
// Purpose: Grade a trained model before promotion with a pass/fail report.
// Dependencies: gridmind-core, serde
// ============================================================================

//! ## Overview
//! Five independent checks grade a model against a validation frame:
//! performance thresholds per model kind, baseline degradation with a 5%
//! tolerance, a two-sided Z-test for feature mean drift, prediction
//! stability (coefficient of variation), and prediction range. The report
//! passes exactly when no check recorded a failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::Model;
use gridmind_core::ModelKind;
use serde::Deserialize;
use serde::Serialize;

use crate::models::ANOMALY_Z_THRESHOLD;
use crate::pipeline::evaluate_anomaly;
use crate::pipeline::evaluate_forecast;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default baseline degradation tolerance.
const BASELINE_TOLERANCE: f64 = 0.05;
/// P-value threshold for the drift Z-test.
const DRIFT_P_THRESHOLD: f64 = 0.05;
/// Maximum acceptable coefficient of variation for predictions.
const STABILITY_CV_THRESHOLD: f64 = 0.5;
/// Residual z-score marking an outlier.
const RANGE_OUTLIER_SIGMA: f64 = 3.0;
/// Maximum acceptable outlier share in percent.
const RANGE_OUTLIER_PCT: f64 = 5.0;
/// Metrics where higher values are better.
const HIGHER_BETTER: &[&str] = &["r2_score", "precision", "recall", "f1_score", "auc_roc"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// One metric threshold bound.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdBound {
    /// Minimum acceptable value.
    pub min: Option<f64>,
    /// Maximum acceptable value.
    pub max: Option<f64>,
}

/// Per-feature training statistics used by the drift check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    /// Training mean.
    pub mean: f64,
    /// Training standard deviation.
    pub std: f64,
}

/// One check's outcome inside a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// True when the check recorded no failures.
    pub passed: bool,
    /// Failure descriptions contributed by the check.
    pub failures: Vec<String>,
    /// Check-specific observations.
    pub details: BTreeMap<String, f64>,
}

/// Structured validation report.
///
/// # Invariants
/// - `passed` is true exactly when `failures` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Model kind validated.
    pub model_kind: ModelKind,
    /// Validation frame size.
    pub validation_rows: u64,
    /// Conjunction of all checks.
    pub passed: bool,
    /// Ordered failure descriptions across checks.
    pub failures: Vec<String>,
    /// Per-check outcomes.
    pub checks: BTreeMap<String, CheckResult>,
    /// Metrics computed by the performance check.
    pub metrics: BTreeMap<String, f64>,
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Five-check model validator.
pub struct ModelValidator {
    /// Model kind under validation.
    kind: ModelKind,
    /// Metric thresholds (defaults per kind unless overridden).
    thresholds: BTreeMap<String, ThresholdBound>,
}

impl ModelValidator {
    /// Creates a validator with the default thresholds for a kind.
    #[must_use]
    pub fn new(kind: ModelKind) -> Self {
        Self { kind, thresholds: default_thresholds(kind) }
    }

    /// Replaces the default thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: BTreeMap<String, ThresholdBound>) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Runs the full validation suite.
    #[must_use]
    pub fn validate(
        &self,
        model: &dyn Model,
        rows: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
        baseline: Option<&BTreeMap<String, f64>>,
        training_stats: Option<&BTreeMap<String, FeatureStats>>,
    ) -> ValidationReport {
        let predictions = model.predict(rows);
        let metrics = match self.kind {
            ModelKind::Forecast => evaluate_forecast(targets, &predictions),
            ModelKind::Anomaly => evaluate_anomaly(targets, &predictions, ANOMALY_Z_THRESHOLD),
        };
        let mut checks = BTreeMap::new();
        checks.insert("performance".to_string(), self.check_performance(&metrics));
        if let Some(baseline) = baseline {
            checks.insert(
                "baseline_comparison".to_string(),
                check_baseline(&metrics, baseline, BASELINE_TOLERANCE),
            );
        }
        if let Some(stats) = training_stats {
            checks.insert(
                "data_drift".to_string(),
                check_drift(rows, feature_names, stats),
            );
        }
        checks.insert("prediction_stability".to_string(), check_stability(&predictions));
        checks.insert(
            "prediction_range".to_string(),
            check_range(targets, &predictions),
        );
        let failures: Vec<String> =
            checks.values().flat_map(|check| check.failures.iter().cloned()).collect();
        ValidationReport {
            model_kind: self.kind,
            validation_rows: rows.len() as u64,
            passed: failures.is_empty(),
            failures,
            checks,
            metrics,
        }
    }

    /// Check 1: metric thresholds.
    fn check_performance(&self, metrics: &BTreeMap<String, f64>) -> CheckResult {
        let mut failures = Vec::new();
        for (name, bound) in &self.thresholds {
            let Some(value) = metrics.get(name) else { continue };
            if let Some(max) = bound.max {
                if *value > max {
                    failures.push(format!("{name}={value:.4} exceeds max threshold {max}"));
                }
            }
            if let Some(min) = bound.min {
                if *value < min {
                    failures.push(format!("{name}={value:.4} below min threshold {min}"));
                }
            }
        }
        CheckResult { passed: failures.is_empty(), failures, details: metrics.clone() }
    }
}

// ============================================================================
// SECTION: Default Thresholds
// ============================================================================

/// Default performance thresholds per model kind.
fn default_thresholds(kind: ModelKind) -> BTreeMap<String, ThresholdBound> {
    let mut thresholds = BTreeMap::new();
    match kind {
        ModelKind::Forecast => {
            thresholds.insert("mae".to_string(), ThresholdBound { min: None, max: Some(50.0) });
            thresholds.insert("rmse".to_string(), ThresholdBound { min: None, max: Some(75.0) });
            thresholds.insert("mape".to_string(), ThresholdBound { min: None, max: Some(10.0) });
            thresholds
                .insert("r2_score".to_string(), ThresholdBound { min: Some(0.7), max: None });
        }
        ModelKind::Anomaly => {
            thresholds
                .insert("precision".to_string(), ThresholdBound { min: Some(0.8), max: None });
            thresholds.insert("recall".to_string(), ThresholdBound { min: Some(0.75), max: None });
            thresholds
                .insert("f1_score".to_string(), ThresholdBound { min: Some(0.77), max: None });
            thresholds
                .insert("auc_roc".to_string(), ThresholdBound { min: Some(0.85), max: None });
        }
    }
    thresholds
}

// ============================================================================
// SECTION: Baseline Check
// ============================================================================

/// Check 2: degradation against a baseline metrics map.
fn check_baseline(
    current: &BTreeMap<String, f64>,
    baseline: &BTreeMap<String, f64>,
    tolerance: f64,
) -> CheckResult {
    let mut failures = Vec::new();
    let mut details = BTreeMap::new();
    for (name, baseline_value) in baseline {
        let Some(current_value) = current.get(name) else { continue };
        let higher_better = HIGHER_BETTER.contains(&name.as_str());
        let (acceptable, degradation_pct) = if higher_better {
            (
                *current_value >= baseline_value * (1.0 - tolerance),
                (baseline_value - current_value) / baseline_value * 100.0,
            )
        } else {
            (
                *current_value <= baseline_value * (1.0 + tolerance),
                (current_value - baseline_value) / baseline_value * 100.0,
            )
        };
        details.insert(format!("{name}_degradation_pct"), degradation_pct);
        if !acceptable {
            failures.push(format!(
                "{name}: {degradation_pct:.2}% degradation (current={current_value:.4}, \
                 baseline={baseline_value:.4})"
            ));
        }
    }
    CheckResult { passed: failures.is_empty(), failures, details }
}

// ============================================================================
// SECTION: Drift Check
// ============================================================================

/// Check 3: two-sided Z-test for feature mean shift.
fn check_drift(
    rows: &[Vec<f64>],
    feature_names: &[String],
    training_stats: &BTreeMap<String, FeatureStats>,
) -> CheckResult {
    let mut failures = Vec::new();
    let mut details = BTreeMap::new();
    let n = rows.len();
    if n == 0 {
        return CheckResult { passed: true, failures, details };
    }
    for (index, name) in feature_names.iter().enumerate() {
        let Some(stats) = training_stats.get(name) else { continue };
        if stats.std <= 0.0 {
            continue;
        }
        let column_mean =
            rows.iter().map(|row| row.get(index).copied().unwrap_or(0.0)).sum::<f64>()
                / n as f64;
        let z = (column_mean - stats.mean) / (stats.std / (n as f64).sqrt());
        let p = 2.0 * (1.0 - standard_normal_cdf(z.abs()));
        details.insert(format!("{name}_p_value"), p);
        if p < DRIFT_P_THRESHOLD {
            failures.push(format!(
                "{name}: significant drift detected (p-value={p:.4}, z-score={z:.4})"
            ));
        }
    }
    CheckResult { passed: failures.is_empty(), failures, details }
}

// ============================================================================
// SECTION: Stability / Range Checks
// ============================================================================

/// Check 4: coefficient of variation of the predictions.
fn check_stability(predictions: &[f64]) -> CheckResult {
    let mut failures = Vec::new();
    let mut details = BTreeMap::new();
    if predictions.is_empty() {
        return CheckResult { passed: true, failures, details };
    }
    let mean = predictions.iter().sum::<f64>() / predictions.len() as f64;
    let std = (predictions.iter().map(|value| (value - mean).powi(2)).sum::<f64>()
        / predictions.len() as f64)
        .sqrt();
    let cv = if mean == 0.0 { f64::INFINITY } else { (std / mean).abs() };
    details.insert("coefficient_of_variation".to_string(), cv);
    if cv > STABILITY_CV_THRESHOLD {
        failures.push(format!(
            "high prediction variability: CV={cv:.4} exceeds threshold \
             {STABILITY_CV_THRESHOLD}"
        ));
    }
    CheckResult { passed: failures.is_empty(), failures, details }
}

/// Check 5: residual outliers plus the prediction range envelope.
fn check_range(targets: &[f64], predictions: &[f64]) -> CheckResult {
    let mut failures = Vec::new();
    let mut details = BTreeMap::new();
    if targets.is_empty() || predictions.is_empty() {
        return CheckResult { passed: true, failures, details };
    }
    let residuals: Vec<f64> = predictions
        .iter()
        .zip(targets)
        .map(|(prediction, target)| prediction - target)
        .collect();
    let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
    let std = (residuals.iter().map(|value| (value - mean).powi(2)).sum::<f64>()
        / residuals.len() as f64)
        .sqrt();
    let outliers = if std > 0.0 {
        residuals
            .iter()
            .filter(|value| ((*value - mean) / std).abs() > RANGE_OUTLIER_SIGMA)
            .count()
    } else {
        0
    };
    let outlier_pct = outliers as f64 / residuals.len() as f64 * 100.0;
    details.insert("outlier_percentage".to_string(), outlier_pct);
    if outlier_pct >= RANGE_OUTLIER_PCT {
        failures.push(format!("too many outliers: {outlier_pct:.2}%"));
    }
    let min_true = targets.iter().copied().fold(f64::INFINITY, f64::min);
    let max_true = targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_pred = predictions.iter().copied().fold(f64::INFINITY, f64::min);
    let max_pred = predictions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    details.insert("min_prediction".to_string(), min_pred);
    details.insert("max_prediction".to_string(), max_pred);
    if min_pred < min_true * 0.5 {
        failures.push(format!("predictions too low: min={min_pred:.2}"));
    }
    if max_pred > max_true * 1.5 {
        failures.push(format!("predictions too high: max={max_pred:.2}"));
    }
    CheckResult { passed: failures.is_empty(), failures, details }
}

// ============================================================================
// SECTION: Normal CDF
// ============================================================================

/// Standard normal CDF via the Abramowitz–Stegun erf approximation.
fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error-function approximation (maximum error 1.5e-7).
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / 0.327_591_1_f64.mul_add(x, 1.0);
    let polynomial = t
        * 1.061_405_429_f64.mul_add(t, -1.453_152_027)
            .mul_add(t, 1.421_413_741)
            .mul_add(t, -0.284_496_736)
            .mul_add(t, 0.254_829_592);
    sign * (1.0 - polynomial * (-x * x).exp())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
