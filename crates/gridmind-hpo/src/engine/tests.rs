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

fn engine() -> StudyEngine {
    StudyEngine::new(Arc::new(SqliteStore::open_in_memory().expect("open")))
}

fn lr_space() -> SearchSpace {
    let mut space = SearchSpace::new();
    space.insert(
        "lr".to_string(),
        HyperparameterSpec::Float { low: 0.01, high: 0.3, log: false },
    );
    space.insert(
        "n_estimators".to_string(),
        HyperparameterSpec::Int { low: 50, high: 500, step: Some(50) },
    );
    space
}

/// Objective from the end-to-end study scenario:
/// `f(params) = lr * 10 + n_estimators * 0.001`.
fn linear_objective(
    params: &ParamAssignment,
    _context: &mut TrialContext<'_>,
) -> Result<ObjectiveStatus, PlatformError> {
    let lr = params["lr"].as_f64().unwrap_or(0.0);
    let n_estimators = params["n_estimators"].as_f64().unwrap_or(0.0);
    Ok(ObjectiveStatus::Complete(lr.mul_add(10.0, n_estimators * 0.001)))
}

fn create_default_study(engine: &StudyEngine, name: &str, pruner: &str) -> StudyName {
    let study_name = StudyName::from(name);
    engine
        .create_study(
            &study_name,
            &TenantId::from("tenant-a"),
            ModelKind::Forecast,
            "minimize",
            "tpe",
            pruner,
            10,
            None,
        )
        .expect("create");
    study_name
}

#[test]
fn unknown_sampler_or_pruner_is_a_config_error() {
    let engine = engine();
    let result = engine.create_study(
        &StudyName::from("bad"),
        &TenantId::from("tenant-a"),
        ModelKind::Forecast,
        "minimize",
        "cmaes",
        "median",
        10,
        None,
    );
    assert!(matches!(result, Err(PlatformError::Validation(_))));
    let result = engine.create_study(
        &StudyName::from("bad"),
        &TenantId::from("tenant-a"),
        ModelKind::Forecast,
        "minimize",
        "tpe",
        "threshold",
        10,
        None,
    );
    assert!(matches!(result, Err(PlatformError::Validation(_))));
}

#[test]
fn duplicate_study_names_conflict() {
    let engine = engine();
    create_default_study(&engine, "study-a", "median");
    let result = engine.create_study(
        &StudyName::from("study-a"),
        &TenantId::from("tenant-a"),
        ModelKind::Forecast,
        "minimize",
        "tpe",
        "median",
        10,
        None,
    );
    assert!(matches!(result, Err(PlatformError::Conflict(_))));
}

#[test]
fn optimize_runs_all_trials_and_finds_the_best() {
    // Scenario: TPE sampler with a median pruner over ten trials of the
    // linear objective; every trial state is accounted for.
    let engine = engine();
    let name = create_default_study(&engine, "study-a", "median");
    let mut progress_calls = Vec::new();
    let report = {
        let mut progress = |done: u32, total: u32| progress_calls.push((done, total));
        engine
            .optimize(
                &name,
                linear_objective,
                &lr_space(),
                &OptimizeOptions::default(),
                Some(&mut progress),
            )
            .expect("optimize")
    };
    assert_eq!(report.n_trials, 10);
    assert_eq!(
        report.completed_trials + report.pruned_trials + report.failed_trials,
        10
    );
    assert_eq!(progress_calls.len(), 10);
    assert_eq!(progress_calls[9], (10, 10));
    let best_value = report.best_value.expect("best value");
    let trials = engine.list_trials(&name).expect("trials");
    for trial in trials.iter().filter(|trial| trial.state == TrialState::Complete) {
        assert!(best_value <= trial.value.expect("value") + f64::EPSILON);
    }
    // The best value is bounded below by the objective at the space floor.
    assert!(best_value >= 0.01_f64.mul_add(10.0, 0.05));
}

#[test]
fn best_so_far_history_is_monotone_under_minimize() {
    let engine = engine();
    let name = create_default_study(&engine, "study-a", "none");
    engine
        .optimize(&name, linear_objective, &lr_space(), &OptimizeOptions::default(), None)
        .expect("optimize");
    let history = engine.get_optimization_history(&name).expect("history");
    assert!(!history.is_empty());
    for window in history.windows(2) {
        assert!(window[1].best_value <= window[0].best_value);
        assert!(window[1].trial_number > window[0].trial_number);
    }
}

#[test]
fn objective_failures_are_isolated_per_trial() {
    let engine = engine();
    let name = create_default_study(&engine, "study-a", "none");
    let mut calls = 0_u32;
    let report = engine
        .optimize(
            &name,
            |params, context| {
                calls += 1;
                if calls % 3 == 0 {
                    return Err(PlatformError::Internal("synthetic failure".to_string()));
                }
                linear_objective(params, context)
            },
            &lr_space(),
            &OptimizeOptions::default(),
            None,
        )
        .expect("optimize");
    assert_eq!(report.n_trials, 10);
    assert_eq!(report.failed_trials, 3);
    assert_eq!(report.completed_trials, 7);
    assert!(report.best_value.is_some());
}

#[test]
fn cooperative_pruning_records_pruned_trials() {
    let engine = engine();
    let name = create_default_study(&engine, "study-a", "median");
    let report = engine
        .optimize(
            &name,
            |params, context| {
                let lr = params["lr"].as_f64().unwrap_or(0.0);
                for step in 0 .. 12 {
                    let loss = lr.mul_add(10.0, f64::from(12 - step));
                    if context.report(step, loss) == TrialVerdict::Prune {
                        return Ok(ObjectiveStatus::Pruned);
                    }
                }
                Ok(ObjectiveStatus::Complete(lr * 10.0))
            },
            &lr_space(),
            &OptimizeOptions::default(),
            None,
        )
        .expect("optimize");
    assert_eq!(
        report.completed_trials + report.pruned_trials + report.failed_trials,
        10
    );
    let trials = engine.list_trials(&name).expect("trials");
    for trial in trials.iter().filter(|trial| trial.state == TrialState::Pruned) {
        assert!(trial.value.is_none());
        assert!(!trial.intermediate.is_empty());
    }
}

#[test]
fn importances_need_two_complete_trials() {
    let engine = engine();
    let name = create_default_study(&engine, "study-a", "none");
    assert!(engine.get_param_importances(&name).expect("importances").is_empty());
    engine
        .optimize(
            &name,
            linear_objective,
            &lr_space(),
            &OptimizeOptions { n_trials: Some(1), ..OptimizeOptions::default() },
            None,
        )
        .expect("optimize");
    assert!(engine.get_param_importances(&name).expect("importances").is_empty());
    engine
        .optimize(
            &name,
            linear_objective,
            &lr_space(),
            &OptimizeOptions { n_trials: Some(9), ..OptimizeOptions::default() },
            None,
        )
        .expect("optimize");
    let importances = engine.get_param_importances(&name).expect("importances");
    assert!(!importances.is_empty());
    let total: f64 = importances.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    // The objective is dominated by the learning rate.
    assert!(importances["lr"] > importances["n_estimators"] * 0.5);
}

#[test]
fn delete_and_resume_study() {
    let engine = engine();
    let name = create_default_study(&engine, "study-a", "none");
    assert!(engine.resume_study(&name).is_ok());
    engine.delete_study(&name).expect("delete");
    assert!(matches!(engine.resume_study(&name), Err(PlatformError::NotFound(_))));
    assert!(matches!(engine.delete_study(&name), Err(PlatformError::NotFound(_))));
}

#[test]
fn suggested_spaces_cover_both_model_kinds() {
    assert!(suggest_search_space(ModelKind::Forecast).contains_key("learning_rate"));
    assert!(suggest_search_space(ModelKind::Anomaly).contains_key("contamination"));
}
