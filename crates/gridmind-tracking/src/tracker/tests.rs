#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use gridmind_store_sqlite::SqliteStore;

use super::*;

fn tracker() -> (ExperimentTracker, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SqliteStore::open_in_memory().expect("open"));
    (ExperimentTracker::new(store, dir.path()), dir)
}

fn tenant() -> TenantId {
    TenantId::from("tenant-a")
}

#[test]
fn run_lifecycle_records_params_metrics_and_status() {
    let (tracker, _dir) = tracker();
    let run_id = tracker
        .create_run("forecast-exp", &tenant(), ModelKind::Forecast, "baseline", BTreeMap::new())
        .expect("run");
    tracker
        .log_param(&run_id, "n_estimators", &serde_json::json!(100))
        .expect("param");
    tracker
        .log_param(&run_id, "feature_set", &serde_json::json!("forecast_basic"))
        .expect("param");
    for (step, value) in [(1_u32, 20.0), (2, 15.0), (3, 12.5)] {
        tracker.log_metric(&run_id, "mae", value, Some(step), None).expect("metric");
    }
    tracker.set_tag(&run_id, "source", "unit-test").expect("tag");
    tracker.end_run(&run_id, RunStatus::Finished).expect("end");
    let run = tracker.get_run(&run_id).expect("get").expect("present");
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.params["n_estimators"], "100");
    // String params coerce without surrounding quotes.
    assert_eq!(run.params["feature_set"], "forecast_basic");
    assert_eq!(run.latest_metric("mae"), Some(12.5));
    assert_eq!(run.metrics["mae"].len(), 3);
    assert_eq!(run.tags["source"], "unit-test");
}

#[test]
fn best_run_honors_direction() {
    let (tracker, _dir) = tracker();
    for (name, mae) in [("run-a", 20.0), ("run-b", 10.0), ("run-c", 15.0)] {
        let run_id = tracker
            .create_run("forecast-exp", &tenant(), ModelKind::Forecast, name, BTreeMap::new())
            .expect("run");
        tracker.log_metric(&run_id, "mae", mae, None, None).expect("metric");
        tracker.end_run(&run_id, RunStatus::Finished).expect("end");
    }
    let best = tracker
        .get_best_run("forecast-exp", "mae", false)
        .expect("query")
        .expect("present");
    assert_eq!(best.name, "run-b");
    let worst = tracker
        .get_best_run("forecast-exp", "mae", true)
        .expect("query")
        .expect("present");
    assert_eq!(worst.name, "run-a");
    assert!(
        tracker
            .get_best_run("missing-exp", "mae", false)
            .expect("query")
            .is_none()
    );
}

#[test]
fn search_filters_and_orders_runs() {
    let (tracker, _dir) = tracker();
    for (name, mae) in [("run-a", 20.0), ("run-b", 10.0), ("run-c", 15.0)] {
        let run_id = tracker
            .create_run("forecast-exp", &tenant(), ModelKind::Forecast, name, BTreeMap::new())
            .expect("run");
        tracker.log_metric(&run_id, "mae", mae, None, None).expect("metric");
    }
    let filtered = tracker
        .search_runs(
            &["forecast-exp"],
            Some(&RunFilter::MetricAtMost("mae".to_string(), 16.0)),
            Some(&RunOrder { metric: "mae".to_string(), ascending: true }),
            10,
        )
        .expect("search");
    let names: Vec<&str> = filtered.iter().map(|run| run.name.as_str()).collect();
    assert_eq!(names, vec!["run-b", "run-c"]);
    let capped = tracker
        .search_runs(&["forecast-exp"], None, None, 2)
        .expect("search");
    assert_eq!(capped.len(), 2);
}

#[test]
fn comparison_projects_requested_metrics() {
    let (tracker, _dir) = tracker();
    let run_id = tracker
        .create_run("forecast-exp", &tenant(), ModelKind::Forecast, "run-a", BTreeMap::new())
        .expect("run");
    tracker.log_metric(&run_id, "mae", 10.0, None, None).expect("metric");
    tracker.log_metric(&run_id, "rmse", 14.0, None, None).expect("metric");
    let comparisons = tracker
        .compare_runs(&[run_id, RunId::from("run-ghost")], Some(&["mae"]))
        .expect("compare");
    assert_eq!(comparisons.len(), 1);
    assert_eq!(comparisons[0].metrics.len(), 1);
    assert_eq!(comparisons[0].metrics.get("mae"), Some(&10.0));
}

#[test]
fn stats_aggregate_over_metric_union() {
    let (tracker, _dir) = tracker();
    let first = tracker
        .create_run("forecast-exp", &tenant(), ModelKind::Forecast, "run-a", BTreeMap::new())
        .expect("run");
    tracker.log_metric(&first, "mae", 10.0, None, None).expect("metric");
    let second = tracker
        .create_run("forecast-exp", &tenant(), ModelKind::Forecast, "run-b", BTreeMap::new())
        .expect("run");
    tracker.log_metric(&second, "mae", 20.0, None, None).expect("metric");
    // A metric present in only one run still aggregates.
    tracker.log_metric(&second, "rmse", 25.0, None, None).expect("metric");
    tracker.end_run(&second, RunStatus::Failed).expect("end");
    let stats = tracker.get_experiment_stats("forecast-exp").expect("stats");
    assert_eq!(stats.total_runs, 2);
    assert_eq!(stats.status_counts.get("running"), Some(&1));
    assert_eq!(stats.status_counts.get("failed"), Some(&1));
    let mae = stats.metric_stats.get("mae").expect("mae");
    assert_eq!(mae.count, 2);
    assert!((mae.mean - 15.0).abs() < f64::EPSILON);
    assert!((mae.min - 10.0).abs() < f64::EPSILON);
    assert!((mae.max - 20.0).abs() < f64::EPSILON);
    assert_eq!(stats.metric_stats.get("rmse").expect("rmse").count, 1);
}

#[test]
fn training_config_flattens_into_params_and_artifact() {
    let (tracker, dir) = tracker();
    let run_id = tracker
        .create_run("forecast-exp", &tenant(), ModelKind::Forecast, "run-a", BTreeMap::new())
        .expect("run");
    let mut hyperparameters = BTreeMap::new();
    hyperparameters.insert(
        "n_estimators".to_string(),
        gridmind_core::HyperparameterValue::Scalar(serde_json::json!(100)),
    );
    let config = TrainingConfig {
        start_date: Timestamp::from_unix_millis(1_735_689_600_000),
        end_date: Timestamp::from_unix_millis(1_740_787_200_000),
        feature_set: "forecast_basic".to_string(),
        target_column: "load_kw".to_string(),
        horizon: 24,
        validation_split: 0.15,
        test_split: 0.15,
        enable_hpo: false,
        n_trials: 20,
        hyperparameters,
        early_stopping: false,
        random_seed: 42,
        n_workers: 1,
        register_model: true,
    };
    tracker.log_training_config(&run_id, &config).expect("log");
    let run = tracker.get_run(&run_id).expect("get").expect("present");
    assert_eq!(run.params["feature_set"], "forecast_basic");
    assert_eq!(run.params["hyperparameters.n_estimators"], "100");
    assert_eq!(run.params["random_seed"], "42");
    let artifact = std::path::Path::new(&run.artifact_uri)
        .join("config")
        .join("training_config.json");
    assert!(artifact.exists());
    drop(dir);
}

#[test]
fn flatten_dot_joins_nested_keys() {
    let document = serde_json::json!({
        "a": {"b": {"c": 1}},
        "d": "x",
        "e": [1, 2]
    });
    let leaves = flatten_json(&document);
    let keys: Vec<&str> = leaves.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["a.b.c", "d", "e"]);
}
