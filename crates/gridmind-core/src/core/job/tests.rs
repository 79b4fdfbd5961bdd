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

fn sample_config() -> TrainingConfig {
    TrainingConfig {
        start_date: Timestamp::from_unix_millis(1_735_689_600_000),
        end_date: Timestamp::from_unix_millis(1_740_787_200_000),
        feature_set: "forecast_basic".to_string(),
        target_column: "load_kw".to_string(),
        horizon: 24,
        validation_split: 0.15,
        test_split: 0.15,
        enable_hpo: false,
        n_trials: 20,
        hyperparameters: BTreeMap::new(),
        early_stopping: false,
        random_seed: 42,
        n_workers: 1,
        register_model: true,
    }
}

// ============================================================================
// SECTION: Status Machine
// ============================================================================

#[test]
fn queued_permits_running_and_cancelled_only() {
    assert!(JobStatus::Queued.permits(JobStatus::Running));
    assert!(JobStatus::Queued.permits(JobStatus::Cancelled));
    assert!(!JobStatus::Queued.permits(JobStatus::Completed));
    assert!(!JobStatus::Queued.permits(JobStatus::Failed));
}

#[test]
fn running_permits_all_terminal_states() {
    assert!(JobStatus::Running.permits(JobStatus::Completed));
    assert!(JobStatus::Running.permits(JobStatus::Failed));
    assert!(JobStatus::Running.permits(JobStatus::Cancelled));
    assert!(!JobStatus::Running.permits(JobStatus::Queued));
}

proptest! {
    /// No terminal status ever permits a successor.
    #[test]
    fn terminal_states_permit_nothing(next in prop_oneof![
        Just(JobStatus::Queued),
        Just(JobStatus::Running),
        Just(JobStatus::Completed),
        Just(JobStatus::Failed),
        Just(JobStatus::Cancelled),
    ]) {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            prop_assert!(terminal.is_terminal());
            prop_assert!(!terminal.permits(next));
        }
    }
}

#[test]
fn status_labels_round_trip() {
    for status in [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ] {
        assert_eq!(JobStatus::parse(status.as_str()).expect("parse"), status);
    }
    assert!(JobStatus::parse("paused").is_err());
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

#[test]
fn config_validates_window_and_splits() {
    assert!(sample_config().validate().is_ok());

    let mut reversed = sample_config();
    reversed.end_date = reversed.start_date;
    assert!(reversed.validate().is_err());

    let mut oversplit = sample_config();
    oversplit.validation_split = 0.6;
    oversplit.test_split = 0.5;
    assert!(oversplit.validate().is_err());

    let mut no_workers = sample_config();
    no_workers.n_workers = 0;
    assert!(no_workers.validate().is_err());
}

#[test]
fn hpo_requires_trial_budget() {
    let mut config = sample_config();
    config.enable_hpo = true;
    config.n_trials = 0;
    assert!(config.validate().is_err());
}

#[test]
fn hyperparameter_maps_deserialize_as_search_spaces() {
    let json = r#"{
        "n_estimators": 200,
        "learning_rate": {"type": "float", "low": 0.01, "high": 0.3, "log": true},
        "max_depth": {"type": "int", "low": 3, "high": 15}
    }"#;
    let parsed: BTreeMap<String, HyperparameterValue> =
        serde_json::from_str(json).expect("parse");
    assert!(parsed["n_estimators"].as_scalar().is_some());
    assert!(parsed["learning_rate"].as_search().is_some());
    match parsed["max_depth"].as_search() {
        Some(HyperparameterSpec::Int { low: 3, high: 15, step: None }) => {}
        other => panic!("unexpected spec: {other:?}"),
    }
}

// ============================================================================
// SECTION: Listing
// ============================================================================

#[test]
fn job_page_counts_pages() {
    let page = JobPage { items: Vec::new(), total: 101, page: 1, page_size: 20 };
    assert_eq!(page.pages(), 6);
    let empty = JobPage { items: Vec::new(), total: 0, page: 1, page_size: 20 };
    assert_eq!(empty.pages(), 0);
}
