// gridmind-store-sqlite/src/studies.rs
// ============================================================================
// Module: SQLite Study Store
// Description: Durable study and trial rows for the HPO engine.
// Purpose: Implement the StudyStore interface over the shared connection.
// Dependencies: gridmind-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Studies are keyed by name; trials by (study, number) with the number
//! assigned monotonically by the store. Deleting a study cascades into its
//! trials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::ModelKind;
use gridmind_core::PrunerKind;
use gridmind_core::SamplerKind;
use gridmind_core::StoreError;
use gridmind_core::Study;
use gridmind_core::StudyDirection;
use gridmind_core::StudyName;
use gridmind_core::StudyStore;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::Trial;
use gridmind_core::TrialState;
use rusqlite::Row;
use rusqlite::params;

use crate::store::SqliteStore;
use crate::store::db_err;
use crate::store::from_json;
use crate::store::to_json;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw trial row data loaded from SQLite.
#[derive(Debug)]
struct TrialRow {
    /// Owning study name.
    study: String,
    /// Trial number.
    number: i64,
    /// Params JSON document.
    params_json: String,
    /// State label.
    state: String,
    /// Objective value.
    value: Option<f64>,
    /// Intermediate reports JSON document.
    intermediate_json: String,
    /// Start time (unix millis).
    started_at: i64,
    /// Completion time (unix millis).
    completed_at: Option<i64>,
}

/// Maps a trial row into the raw payload.
fn map_trial(row: &Row<'_>) -> rusqlite::Result<TrialRow> {
    Ok(TrialRow {
        study: row.get(0)?,
        number: row.get(1)?,
        params_json: row.get(2)?,
        state: row.get(3)?,
        value: row.get(4)?,
        intermediate_json: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

/// Builds a validated trial from raw row data.
fn finish_trial(row: TrialRow) -> Result<Trial, StoreError> {
    let intermediate: BTreeMap<String, f64> = from_json(&row.intermediate_json)?;
    let intermediate = intermediate
        .into_iter()
        .map(|(step, value)| {
            step.parse::<u32>()
                .map(|step| (step, value))
                .map_err(|err| StoreError::Invalid(format!("bad intermediate step: {err}")))
        })
        .collect::<Result<BTreeMap<u32, f64>, StoreError>>()?;
    Ok(Trial {
        study: StudyName::from(row.study),
        number: u32::try_from(row.number)
            .map_err(|_| StoreError::Invalid("negative trial number".to_string()))?,
        params: from_json(&row.params_json)?,
        state: TrialState::parse(&row.state)
            .map_err(|err| StoreError::Invalid(err.to_string()))?,
        value: row.value,
        intermediate,
        started_at: Timestamp::from_unix_millis(row.started_at),
        completed_at: row.completed_at.map(Timestamp::from_unix_millis),
    })
}

/// Serializes intermediate reports with string keys for the JSON column.
fn intermediate_json(trial: &Trial) -> Result<String, StoreError> {
    let as_strings: BTreeMap<String, f64> =
        trial.intermediate.iter().map(|(step, value)| (step.to_string(), *value)).collect();
    to_json(&as_strings)
}

// ============================================================================
// SECTION: StudyStore Implementation
// ============================================================================

impl StudyStore for SqliteStore {
    fn insert_study(&self, study: &Study) -> Result<(), StoreError> {
        let user_attrs_json = to_json(&study.user_attrs)?;
        let guard = self.lock()?;
        let result = guard.execute(
            "INSERT INTO studies (name, tenant_id, model_kind, direction, sampler, pruner, \
             n_trials, timeout_seconds, user_attrs_json, created_at) VALUES (?1, ?2, ?3, ?4, \
             ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                study.name.as_str(),
                study.tenant_id.as_str(),
                study.model_kind.as_str(),
                study.direction.as_str(),
                study.sampler.as_str(),
                study.pruner.as_str(),
                study.n_trials,
                study.timeout_seconds.map(|value| value as i64),
                user_attrs_json,
                study.created_at.unix_millis(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!("study already exists: {}", study.name)))
            }
            Err(err) => Err(db_err(&err)),
        }
    }

    fn get_study(&self, name: &StudyName) -> Result<Option<Study>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT name, tenant_id, model_kind, direction, sampler, pruner, n_trials, \
                 timeout_seconds, user_attrs_json, created_at FROM studies WHERE name = ?1",
                params![name.as_str()],
                |row| {
                    let name: String = row.get(0)?;
                    let tenant_id: String = row.get(1)?;
                    let model_kind: String = row.get(2)?;
                    let direction: String = row.get(3)?;
                    let sampler: String = row.get(4)?;
                    let pruner: String = row.get(5)?;
                    let n_trials: i64 = row.get(6)?;
                    let timeout_seconds: Option<i64> = row.get(7)?;
                    let user_attrs_json: String = row.get(8)?;
                    let created_at: i64 = row.get(9)?;
                    Ok((
                        name,
                        tenant_id,
                        model_kind,
                        direction,
                        sampler,
                        pruner,
                        n_trials,
                        timeout_seconds,
                        user_attrs_json,
                        created_at,
                    ))
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })?;
        let Some((
            name,
            tenant_id,
            model_kind,
            direction,
            sampler,
            pruner,
            n_trials,
            timeout_seconds,
            user_attrs_json,
            created_at,
        )) = row
        else {
            return Ok(None);
        };
        Ok(Some(Study {
            name: StudyName::from(name),
            tenant_id: TenantId::from(tenant_id),
            model_kind: ModelKind::parse(&model_kind)
                .map_err(|err| StoreError::Invalid(err.to_string()))?,
            direction: StudyDirection::parse(&direction)
                .map_err(|err| StoreError::Invalid(err.to_string()))?,
            sampler: SamplerKind::parse(&sampler)
                .map_err(|err| StoreError::Invalid(err.to_string()))?,
            pruner: PrunerKind::parse(&pruner)
                .map_err(|err| StoreError::Invalid(err.to_string()))?,
            n_trials: u32::try_from(n_trials)
                .map_err(|_| StoreError::Invalid("negative n_trials".to_string()))?,
            timeout_seconds: timeout_seconds
                .map(|value| {
                    u64::try_from(value)
                        .map_err(|_| StoreError::Invalid("negative timeout".to_string()))
                })
                .transpose()?,
            user_attrs: from_json(&user_attrs_json)?,
            created_at: Timestamp::from_unix_millis(created_at),
        }))
    }

    fn delete_study(&self, name: &StudyName) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute("DELETE FROM studies WHERE name = ?1", params![name.as_str()])
            .map_err(|err| db_err(&err))?;
        Ok(changed == 1)
    }

    fn next_trial_number(&self, name: &StudyName) -> Result<u32, StoreError> {
        let guard = self.lock()?;
        let max: Option<i64> = guard
            .query_row(
                "SELECT MAX(number) FROM trials WHERE study = ?1",
                params![name.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| db_err(&err))?;
        let next = max.map_or(0, |value| value + 1);
        u32::try_from(next).map_err(|_| StoreError::Invalid("trial number overflow".to_string()))
    }

    fn insert_trial(&self, trial: &Trial) -> Result<(), StoreError> {
        let params_json = to_json(&trial.params)?;
        let intermediate = intermediate_json(trial)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO trials (study, number, params_json, state, value, \
                 intermediate_json, started_at, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, \
                 ?7, ?8)",
                params![
                    trial.study.as_str(),
                    trial.number,
                    params_json,
                    trial.state.as_str(),
                    trial.value,
                    intermediate,
                    trial.started_at.unix_millis(),
                    trial.completed_at.map(Timestamp::unix_millis),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn update_trial(&self, trial: &Trial) -> Result<(), StoreError> {
        let params_json = to_json(&trial.params)?;
        let intermediate = intermediate_json(trial)?;
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE trials SET params_json = ?1, state = ?2, value = ?3, intermediate_json \
                 = ?4, completed_at = ?5 WHERE study = ?6 AND number = ?7",
                params![
                    params_json,
                    trial.state.as_str(),
                    trial.value,
                    intermediate,
                    trial.completed_at.map(Timestamp::unix_millis),
                    trial.study.as_str(),
                    trial.number,
                ],
            )
            .map_err(|err| db_err(&err))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "trial not found: {}#{}",
                trial.study, trial.number
            )));
        }
        Ok(())
    }

    fn list_trials(&self, name: &StudyName) -> Result<Vec<Trial>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT study, number, params_json, state, value, intermediate_json, \
                 started_at, completed_at FROM trials WHERE study = ?1 ORDER BY number ASC",
            )
            .map_err(|err| db_err(&err))?;
        let rows = statement
            .query_map(params![name.as_str()], map_trial)
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        rows.into_iter().map(finish_trial).collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
