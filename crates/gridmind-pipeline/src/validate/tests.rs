#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use proptest::prelude::*;

use gridmind_core::ModelEnvelope;
use gridmind_core::ModelCodecError;

use super::*;

/// Fixed-output stand-in model for check-level tests.
struct ConstantModel {
    /// Predictions returned for any input.
    outputs: Vec<f64>,
}

impl Model for ConstantModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Forecast
    }

    fn feature_count(&self) -> usize {
        1
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter()
            .enumerate()
            .map(|(index, _)| self.outputs[index % self.outputs.len()])
            .collect()
    }

    fn score(&self, _rows: &[Vec<f64>], _targets: &[f64]) -> Option<f64> {
        None
    }

    fn to_envelope(&self) -> Result<ModelEnvelope, ModelCodecError> {
        Err(ModelCodecError::Encode("stand-in model".to_string()))
    }
}

fn near_perfect_inputs() -> (Vec<Vec<f64>>, Vec<f64>, ConstantModel) {
    let targets: Vec<f64> = (0 .. 100).map(|index| 100.0 + (index % 10) as f64).collect();
    let rows: Vec<Vec<f64>> = targets.iter().map(|target| vec![*target]).collect();
    let outputs = targets.iter().map(|target| target + 0.5).collect();
    (rows, targets, ConstantModel { outputs })
}

#[test]
fn accurate_model_passes_all_checks() {
    let (rows, targets, model) = near_perfect_inputs();
    let validator = ModelValidator::new(ModelKind::Forecast);
    let report = validator.validate(
        &model,
        &rows,
        &targets,
        &["x".to_string()],
        None,
        None,
    );
    assert!(report.passed, "failures: {:?}", report.failures);
    assert!(report.failures.is_empty());
    assert!(report.metrics.get("mae").copied().expect("mae") < 1.0);
}

#[test]
fn threshold_violations_fail_performance() {
    let targets: Vec<f64> = (0 .. 50).map(|index| 100.0 + (index % 10) as f64).collect();
    let rows: Vec<Vec<f64>> = targets.iter().map(|target| vec![*target]).collect();
    // Constant prediction far from the targets breaches mae/rmse/r2.
    let model = ConstantModel { outputs: vec![100.0 + 80.0] };
    let validator = ModelValidator::new(ModelKind::Forecast);
    let report = validator.validate(&model, &rows, &targets, &["x".to_string()], None, None);
    assert!(!report.passed);
    assert!(report.failures.iter().any(|failure| failure.contains("mae")));
}

#[test]
fn baseline_degradation_beyond_tolerance_fails() {
    let (rows, targets, model) = near_perfect_inputs();
    let validator = ModelValidator::new(ModelKind::Forecast);
    let mut baseline = BTreeMap::new();
    // The model's mae is ~0.5; a baseline of 0.1 means >5x degradation.
    baseline.insert("mae".to_string(), 0.1);
    let report = validator.validate(
        &model,
        &rows,
        &targets,
        &["x".to_string()],
        Some(&baseline),
        None,
    );
    assert!(!report.passed);
    assert!(report.failures.iter().any(|failure| failure.contains("degradation")));
    // A matching baseline within tolerance passes.
    let mut matching = BTreeMap::new();
    matching.insert("mae".to_string(), 0.5);
    let report = validator.validate(
        &model,
        &rows,
        &targets,
        &["x".to_string()],
        Some(&matching),
        None,
    );
    assert!(report.checks["baseline_comparison"].passed);
}

#[test]
fn mean_shift_triggers_the_drift_check() {
    let (rows, targets, model) = near_perfect_inputs();
    let validator = ModelValidator::new(ModelKind::Forecast);
    let mut stats = BTreeMap::new();
    // Training saw a mean far from the validation column mean.
    stats.insert("x".to_string(), FeatureStats { mean: 0.0, std: 1.0 });
    let report = validator.validate(
        &model,
        &rows,
        &targets,
        &["x".to_string()],
        None,
        Some(&stats),
    );
    assert!(!report.passed);
    assert!(report.failures.iter().any(|failure| failure.contains("drift")));
    // Matching statistics pass.
    let column_mean = rows.iter().map(|row| row[0]).sum::<f64>() / rows.len() as f64;
    let mut matching = BTreeMap::new();
    matching.insert("x".to_string(), FeatureStats { mean: column_mean, std: 100.0 });
    let report = validator.validate(
        &model,
        &rows,
        &targets,
        &["x".to_string()],
        None,
        Some(&matching),
    );
    assert!(report.checks["data_drift"].passed);
}

#[test]
fn unstable_predictions_fail_the_cv_check() {
    let targets: Vec<f64> = (0 .. 60).map(|index| 100.0 + (index % 5) as f64).collect();
    let rows: Vec<Vec<f64>> = targets.iter().map(|target| vec![*target]).collect();
    // Alternating extreme outputs produce a large coefficient of variation.
    let model = ConstantModel { outputs: vec![1.0, 200.0] };
    let validator = ModelValidator::new(ModelKind::Forecast);
    let report = validator.validate(&model, &rows, &targets, &["x".to_string()], None, None);
    assert!(
        report
            .failures
            .iter()
            .any(|failure| failure.contains("variability"))
    );
}

#[test]
fn out_of_range_predictions_fail_the_range_check() {
    let targets: Vec<f64> = (0 .. 40).map(|index| 100.0 + (index % 5) as f64).collect();
    let rows: Vec<Vec<f64>> = targets.iter().map(|target| vec![*target]).collect();
    let model = ConstantModel { outputs: vec![300.0] };
    let validator = ModelValidator::new(ModelKind::Forecast);
    let report = validator.validate(&model, &rows, &targets, &["x".to_string()], None, None);
    assert!(
        report
            .failures
            .iter()
            .any(|failure| failure.contains("predictions too high"))
    );
}

proptest! {
    /// Report totality: `passed` is exactly the absence of failures.
    #[test]
    fn report_passed_equals_empty_failures(offset in -100.0_f64 .. 100.0, spread in 0.1_f64 .. 50.0) {
        let targets: Vec<f64> = (0 .. 50).map(|index| 100.0 + (index % 7) as f64).collect();
        let rows: Vec<Vec<f64>> = targets.iter().map(|target| vec![*target]).collect();
        let outputs: Vec<f64> = targets
            .iter()
            .enumerate()
            .map(|(index, target)| target + offset + if index % 2 == 0 { spread } else { -spread })
            .collect();
        let model = ConstantModel { outputs };
        let validator = ModelValidator::new(ModelKind::Forecast);
        let report = validator.validate(&model, &rows, &targets, &["x".to_string()], None, None);
        prop_assert_eq!(report.passed, report.failures.is_empty());
        for check in report.checks.values() {
            prop_assert_eq!(check.passed, check.failures.is_empty());
        }
    }
}
