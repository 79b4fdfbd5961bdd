#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;
use crate::store::SqliteStore;

fn sample_run(run_id: &str, experiment_id: &ExperimentId, started_at: i64) -> Run {
    Run {
        run_id: RunId::from(run_id),
        experiment_id: experiment_id.clone(),
        name: format!("run-{run_id}"),
        status: RunStatus::Running,
        params: BTreeMap::new(),
        metrics: BTreeMap::new(),
        tags: BTreeMap::new(),
        artifact_uri: format!("./artifacts/{run_id}"),
        started_at: Timestamp::from_unix_millis(started_at),
        ended_at: None,
    }
}

#[test]
fn ensure_experiment_is_idempotent() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let now = Timestamp::from_unix_millis(1_000);
    let first = store
        .ensure_experiment("forecast-exp", &tenant, ModelKind::Forecast, now)
        .expect("ensure");
    let second = store
        .ensure_experiment("forecast-exp", &tenant, ModelKind::Forecast, now)
        .expect("ensure");
    assert_eq!(first, second);
    let experiment = store.get_experiment("forecast-exp").expect("get").expect("present");
    assert_eq!(experiment.experiment_id, first);
}

#[test]
fn metric_series_preserve_call_order() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let now = Timestamp::from_unix_millis(1_000);
    let experiment_id = store
        .ensure_experiment("forecast-exp", &tenant, ModelKind::Forecast, now)
        .expect("ensure");
    let run = sample_run("run-1", &experiment_id, 1_000);
    store.insert_run(&run).expect("insert");
    // Deliberately log out-of-order steps; the store must not reorder.
    for (step, value) in [(3_u32, 0.3), (1, 0.1), (2, 0.2)] {
        store
            .append_metric(
                &run.run_id,
                "mae",
                &MetricPoint { step, at: now, value },
            )
            .expect("append");
    }
    let loaded = store.get_run(&run.run_id).expect("get").expect("present");
    let series = &loaded.metrics["mae"];
    assert_eq!(series.iter().map(|point| point.step).collect::<Vec<_>>(), vec![3, 1, 2]);
}

#[test]
fn params_upsert_and_tags_merge() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let now = Timestamp::from_unix_millis(1_000);
    let experiment_id = store
        .ensure_experiment("forecast-exp", &tenant, ModelKind::Forecast, now)
        .expect("ensure");
    let run = sample_run("run-1", &experiment_id, 1_000);
    store.insert_run(&run).expect("insert");
    store.put_param(&run.run_id, "learning_rate", "0.1").expect("param");
    store.put_param(&run.run_id, "learning_rate", "0.2").expect("param");
    store.put_tag(&run.run_id, "source", "pipeline").expect("tag");
    let loaded = store.get_run(&run.run_id).expect("get").expect("present");
    assert_eq!(loaded.params["learning_rate"], "0.2");
    assert_eq!(loaded.tags["source"], "pipeline");
}

#[test]
fn run_status_updates_stamp_end_time() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let now = Timestamp::from_unix_millis(1_000);
    let experiment_id = store
        .ensure_experiment("forecast-exp", &tenant, ModelKind::Forecast, now)
        .expect("ensure");
    let run = sample_run("run-1", &experiment_id, 1_000);
    store.insert_run(&run).expect("insert");
    let ended = Timestamp::from_unix_millis(2_000);
    store.update_run_status(&run.run_id, RunStatus::Finished, ended).expect("update");
    let loaded = store.get_run(&run.run_id).expect("get").expect("present");
    assert_eq!(loaded.status, RunStatus::Finished);
    assert_eq!(loaded.ended_at, Some(ended));
}

#[test]
fn runs_for_experiment_lists_newest_first() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let now = Timestamp::from_unix_millis(1_000);
    let experiment_id = store
        .ensure_experiment("forecast-exp", &tenant, ModelKind::Forecast, now)
        .expect("ensure");
    for (run_id, started_at) in [("run-1", 1_000), ("run-2", 3_000), ("run-3", 2_000)] {
        store.insert_run(&sample_run(run_id, &experiment_id, started_at)).expect("insert");
    }
    let runs = store.runs_for_experiment(&experiment_id).expect("list");
    let ids: Vec<&str> = runs.iter().map(|run| run.run_id.as_str()).collect();
    assert_eq!(ids, vec!["run-2", "run-3", "run-1"]);
}
