#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use proptest::prelude::*;

use super::*;

fn frame(n: usize) -> Dataset {
    Dataset {
        feature_names: vec!["a".to_string(), "b".to_string()],
        timestamps: (0 .. n)
            .map(|index| Timestamp::from_unix_millis(i64::try_from(index).expect("index") * 1_000))
            .collect(),
        rows: (0 .. n).map(|index| vec![index as f64, index as f64 * 2.0]).collect(),
        targets: (0 .. n).map(|index| index as f64 * 3.0).collect(),
    }
}

#[test]
fn split_is_time_ordered_with_tail_test() {
    let split = frame(100).split_and_scale(0.15, 0.15).expect("split");
    // Tail 15% test, then 0.15 / 0.85 of the 85-row remainder as validation.
    assert_eq!(split.test.len(), 15);
    assert_eq!(split.validation.len(), 15);
    assert_eq!(split.train.len(), 70);
    let train_max = split.train.timestamps.last().expect("train");
    let val_min = split.validation.timestamps.first().expect("val");
    let val_max = split.validation.timestamps.last().expect("val");
    let test_min = split.test.timestamps.first().expect("test");
    assert!(train_max < val_min);
    assert!(val_max < test_min);
}

#[test]
fn scaler_is_fit_on_train_only() {
    let dataset = frame(100);
    let split = dataset.split_and_scale(0.15, 0.15).expect("split");
    let train_len = split.train.len();
    // The fitted mean must equal the raw mean of the training slice alone.
    let expected: f64 =
        dataset.rows[.. train_len].iter().map(|row| row[0]).sum::<f64>() / train_len as f64;
    assert!((split.scaler.means[0] - expected).abs() < 1e-9);
    // Scaled training columns are centered; test columns are not.
    let train_scaled_mean: f64 =
        split.train.rows.iter().map(|row| row[0]).sum::<f64>() / train_len as f64;
    assert!(train_scaled_mean.abs() < 1e-9);
    let test_scaled_mean: f64 =
        split.test.rows.iter().map(|row| row[0]).sum::<f64>() / split.test.len() as f64;
    assert!(test_scaled_mean > 1.0);
}

#[test]
fn tiny_frames_fail_validation() {
    assert!(frame(1).split_and_scale(0.5, 0.4).is_err());
}

#[test]
fn zero_variance_columns_scale_to_zero() {
    let dataset = Dataset {
        feature_names: vec!["constant".to_string()],
        timestamps: (0 .. 10).map(|index| Timestamp::from_unix_millis(index)).collect(),
        rows: (0 .. 10).map(|_| vec![7.0]).collect(),
        targets: (0 .. 10).map(|index| index as f64).collect(),
    };
    let split = dataset.split_and_scale(0.0, 0.0).expect("split");
    assert!(split.train.rows.iter().all(|row| row[0].abs() < f64::EPSILON));
}

proptest! {
    /// Split sizes always partition the frame and keep time order.
    #[test]
    fn split_partitions_any_frame(
        n in 20_usize .. 200,
        validation in 0.05_f64 .. 0.4,
        test in 0.05_f64 .. 0.4,
    ) {
        prop_assume!(validation + test < 0.9);
        let split = frame(n).split_and_scale(validation, test).expect("split");
        prop_assert_eq!(split.train.len() + split.validation.len() + split.test.len(), n);
        if let (Some(train_max), Some(test_min)) =
            (split.train.timestamps.last(), split.test.timestamps.first())
        {
            prop_assert!(train_max < test_min);
        }
    }
}
