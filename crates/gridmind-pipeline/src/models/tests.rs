#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

/// Deterministic nonlinear frame: y = 10·x0 + step(x1).
fn training_frame(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let rows: Vec<Vec<f64>> = (0 .. n)
        .map(|index| {
            let x0 = (index % 50) as f64 / 50.0;
            let x1 = ((index * 7) % 100) as f64 / 100.0;
            vec![x0, x1]
        })
        .collect();
    let targets: Vec<f64> = rows
        .iter()
        .map(|row| 10.0_f64.mul_add(row[0], if row[1] > 0.5 { 5.0 } else { 0.0 }))
        .collect();
    (rows, targets)
}

#[test]
fn gbt_learns_a_nonlinear_signal() {
    let (rows, targets) = training_frame(400);
    let model = GbtRegressor::fit(&rows, &targets, &GbtParams::default(), 42);
    let r2 = model.score(&rows, &targets).expect("r2");
    assert!(r2 > 0.9, "r2 was {r2}");
    assert_eq!(model.feature_count(), 2);
    assert_eq!(model.kind(), ModelKind::Forecast);
}

#[test]
fn gbt_fit_is_bit_identical_per_seed() {
    let (rows, targets) = training_frame(300);
    let first = GbtRegressor::fit(&rows, &targets, &GbtParams::default(), 42);
    let second = GbtRegressor::fit(&rows, &targets, &GbtParams::default(), 42);
    let probe: Vec<Vec<f64>> = (0 .. 20).map(|index| vec![index as f64 / 20.0, 0.3]).collect();
    assert_eq!(first.predict(&probe), second.predict(&probe));
    // A different seed changes the subsampled fit.
    let third = GbtRegressor::fit(&rows, &targets, &GbtParams::default(), 7);
    assert_ne!(first.predict(&probe), third.predict(&probe));
}

#[test]
fn gbt_envelope_round_trips_through_the_codec() {
    let (rows, targets) = training_frame(200);
    let model = GbtRegressor::fit(&rows, &targets, &GbtParams::default(), 42);
    let envelope = model.to_envelope().expect("envelope");
    let decoded = decode_model(&envelope).expect("decode");
    let probe: Vec<Vec<f64>> = vec![vec![0.2, 0.9], vec![0.8, 0.1]];
    assert_eq!(decoded.predict(&probe), model.predict(&probe));
    assert_eq!(decoded.kind(), ModelKind::Forecast);
}

#[test]
fn anomaly_detector_flags_far_outliers() {
    let rows: Vec<Vec<f64>> = (0 .. 200).map(|index| vec![(index % 10) as f64, 50.0]).collect();
    let detector = AnomalyDetector::fit(&rows);
    let scores = detector.predict(&[vec![4.5, 50.0], vec![400.0, 50.0]]);
    assert!(scores[0] < ANOMALY_Z_THRESHOLD);
    assert!(scores[1] > ANOMALY_Z_THRESHOLD);
    assert!(detector.score(&rows, &[]).is_none());
}

#[test]
fn anomaly_envelope_round_trips_through_the_codec() {
    let rows: Vec<Vec<f64>> = (0 .. 50).map(|index| vec![index as f64]).collect();
    let detector = AnomalyDetector::fit(&rows);
    let envelope = detector.to_envelope().expect("envelope");
    let decoded = decode_model(&envelope).expect("decode");
    assert_eq!(decoded.kind(), ModelKind::Anomaly);
    assert_eq!(decoded.predict(&[vec![25.0]]), detector.predict(&[vec![25.0]]));
}

#[test]
fn codec_rejects_unknown_versions() {
    let (rows, targets) = training_frame(100);
    let model = GbtRegressor::fit(&rows, &targets, &GbtParams::default(), 42);
    let mut envelope = model.to_envelope().expect("envelope");
    envelope.format_version = 99;
    assert!(decode_model(&envelope).is_err());
}

#[test]
fn hyperparameter_extraction_ignores_search_spaces() {
    let mut configured = BTreeMap::new();
    configured.insert(
        "n_estimators".to_string(),
        HyperparameterValue::Scalar(serde_json::json!(250)),
    );
    configured.insert(
        "learning_rate".to_string(),
        HyperparameterValue::Search(gridmind_core::HyperparameterSpec::Float {
            low: 0.01,
            high: 0.3,
            log: true,
        }),
    );
    configured.insert(
        "num_leaves".to_string(),
        HyperparameterValue::Scalar(serde_json::json!(31)),
    );
    let params = extract_hyperparameters(&configured);
    assert_eq!(params.n_estimators, 250);
    // The search descriptor leaves the default in place.
    assert!((params.learning_rate - 0.1).abs() < f64::EPSILON);
    // Unknown keys are ignored.
    assert!((params.subsample - 0.8).abs() < f64::EPSILON);
}
