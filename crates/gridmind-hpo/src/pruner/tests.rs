#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::collections::BTreeMap;

use gridmind_core::StudyName;
use gridmind_core::Timestamp;
use gridmind_core::TrialState;

use super::*;

fn trial_with_reports(number: u32, reports: &[(u32, f64)]) -> Trial {
    Trial {
        study: StudyName::from("study-a"),
        number,
        params: BTreeMap::new(),
        state: TrialState::Complete,
        value: reports.last().map(|(_, value)| *value),
        intermediate: reports.iter().copied().collect(),
        started_at: Timestamp::from_unix_millis(0),
        completed_at: None,
    }
}

fn five_peers_at(step: u32, values: [f64; 5]) -> Vec<Trial> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            trial_with_reports(u32::try_from(index).expect("index"), &[(step, *value)])
        })
        .collect()
}

#[test]
fn median_pruner_waits_for_warmup_and_startup() {
    let pruner = MedianPruner;
    let history = five_peers_at(10, [1.0, 2.0, 3.0, 4.0, 5.0]);
    // Below the warmup step nothing prunes regardless of the value.
    assert!(!pruner.should_prune(StudyDirection::Minimize, 2, 100.0, &history));
    // Too few peers at the step: no pruning.
    assert!(!pruner.should_prune(StudyDirection::Minimize, 7, 100.0, &history[.. 3]));
}

#[test]
fn median_pruner_cuts_the_losing_half() {
    let pruner = MedianPruner;
    let history = five_peers_at(10, [1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(pruner.should_prune(StudyDirection::Minimize, 10, 4.5, &history));
    assert!(!pruner.should_prune(StudyDirection::Minimize, 10, 2.0, &history));
    // Under maximize the comparison flips.
    assert!(pruner.should_prune(StudyDirection::Maximize, 10, 1.5, &history));
    assert!(!pruner.should_prune(StudyDirection::Maximize, 10, 4.5, &history));
}

#[test]
fn hyperband_only_acts_on_rungs() {
    let pruner = HyperbandPruner;
    let history = five_peers_at(9, [1.0, 2.0, 3.0, 4.0, 5.0]);
    // Step 5 is not a rung (rungs are 1, 3, 9, 27, ...).
    assert!(!pruner.should_prune(StudyDirection::Minimize, 5, 100.0, &history));
    assert!(pruner.should_prune(StudyDirection::Minimize, 9, 4.5, &history));
    assert!(!pruner.should_prune(StudyDirection::Minimize, 9, 1.0, &history));
}

#[test]
fn hyperband_with_no_recorded_trials_is_a_no_op() {
    let pruner = HyperbandPruner;
    assert!(!pruner.should_prune(StudyDirection::Minimize, 9, 100.0, &[]));
}

#[test]
fn none_pruner_never_prunes() {
    let pruner = NonePruner;
    let history = five_peers_at(10, [1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(!pruner.should_prune(StudyDirection::Minimize, 10, f64::INFINITY, &history));
}
