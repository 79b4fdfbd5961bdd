#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

fn trial(number: u32, state: TrialState, value: Option<f64>) -> Trial {
    Trial {
        study: StudyName::from("study-a"),
        number,
        params: BTreeMap::new(),
        state,
        value,
        intermediate: BTreeMap::new(),
        started_at: Timestamp::from_unix_millis(0),
        completed_at: None,
    }
}

#[test]
fn best_trial_minimizes() {
    let trials = vec![
        trial(0, TrialState::Complete, Some(3.0)),
        trial(1, TrialState::Complete, Some(1.0)),
        trial(2, TrialState::Complete, Some(2.0)),
    ];
    let best = best_trial(&trials, StudyDirection::Minimize).expect("best");
    assert_eq!(best.number, 1);
}

#[test]
fn best_trial_maximizes() {
    let trials = vec![
        trial(0, TrialState::Complete, Some(0.2)),
        trial(1, TrialState::Complete, Some(0.9)),
    ];
    let best = best_trial(&trials, StudyDirection::Maximize).expect("best");
    assert_eq!(best.number, 1);
}

#[test]
fn best_trial_breaks_ties_on_lower_number() {
    let trials = vec![
        trial(3, TrialState::Complete, Some(1.0)),
        trial(1, TrialState::Complete, Some(1.0)),
        trial(2, TrialState::Complete, Some(1.0)),
    ];
    let best = best_trial(&trials, StudyDirection::Minimize).expect("best");
    assert_eq!(best.number, 1);
}

#[test]
fn best_trial_ignores_incomplete_trials() {
    let trials = vec![
        trial(0, TrialState::Pruned, Some(0.0)),
        trial(1, TrialState::Failed, None),
        trial(2, TrialState::Running, None),
    ];
    assert!(best_trial(&trials, StudyDirection::Minimize).is_none());
}

#[test]
fn sampler_and_pruner_labels_round_trip() {
    assert_eq!(SamplerKind::parse("tpe").expect("tpe"), SamplerKind::Tpe);
    assert_eq!(PrunerKind::parse("hyperband").expect("hb"), PrunerKind::Hyperband);
    assert!(SamplerKind::parse("cmaes").is_err());
    assert!(PrunerKind::parse("threshold").is_err());
}
