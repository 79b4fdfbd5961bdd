// gridmind-store-sqlite/src/experiments.rs
// ============================================================================
// Module: SQLite Experiment Store
// Description: Durable experiment, run, parameter, and metric rows.
// Purpose: Implement the ExperimentStore interface over the shared connection.
// Dependencies: gridmind-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Experiments are create-if-absent by name. Run metrics append into an
//! autoincrement table so each series preserves call order exactly; the
//! tracker never reorders observations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::Experiment;
use gridmind_core::ExperimentId;
use gridmind_core::ExperimentStore;
use gridmind_core::MetricPoint;
use gridmind_core::ModelKind;
use gridmind_core::Run;
use gridmind_core::RunId;
use gridmind_core::RunStatus;
use gridmind_core::StoreError;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use rusqlite::Connection;
use rusqlite::params;

use crate::store::SqliteStore;
use crate::store::db_err;
use crate::store::from_json;
use crate::store::to_json;

// ============================================================================
// SECTION: Loading Helpers
// ============================================================================

/// Loads the params map for a run.
fn load_params(
    connection: &Connection,
    run_id: &str,
) -> Result<BTreeMap<String, String>, StoreError> {
    let mut statement = connection
        .prepare("SELECT key, value FROM run_params WHERE run_id = ?1")
        .map_err(|err| db_err(&err))?;
    let rows = statement
        .query_map(params![run_id], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))
        .map_err(|err| db_err(&err))?
        .collect::<Result<Vec<(String, String)>, _>>()
        .map_err(|err| db_err(&err))?;
    Ok(rows.into_iter().collect())
}

/// Loads the metric series for a run in insertion order.
fn load_metrics(
    connection: &Connection,
    run_id: &str,
) -> Result<BTreeMap<String, Vec<MetricPoint>>, StoreError> {
    let mut statement = connection
        .prepare(
            "SELECT key, step, at, value FROM run_metrics WHERE run_id = ?1 ORDER BY metric_id \
             ASC",
        )
        .map_err(|err| db_err(&err))?;
    let rows = statement
        .query_map(params![run_id], |row| {
            let key: String = row.get(0)?;
            let step: i64 = row.get(1)?;
            let at: i64 = row.get(2)?;
            let value: f64 = row.get(3)?;
            Ok((key, step, at, value))
        })
        .map_err(|err| db_err(&err))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| db_err(&err))?;
    let mut metrics: BTreeMap<String, Vec<MetricPoint>> = BTreeMap::new();
    for (key, step, at, value) in rows {
        metrics.entry(key).or_default().push(MetricPoint {
            step: u32::try_from(step)
                .map_err(|_| StoreError::Invalid("negative metric step".to_string()))?,
            at: Timestamp::from_unix_millis(at),
            value,
        });
    }
    Ok(metrics)
}

/// Loads one run with its params, tags, and metric series.
fn load_run(connection: &Connection, run_id: &str) -> Result<Option<Run>, StoreError> {
    let row = connection
        .query_row(
            "SELECT run_id, experiment_id, name, status, artifact_uri, tags_json, started_at, \
             ended_at FROM runs WHERE run_id = ?1",
            params![run_id],
            |row| {
                let run_id: String = row.get(0)?;
                let experiment_id: String = row.get(1)?;
                let name: String = row.get(2)?;
                let status: String = row.get(3)?;
                let artifact_uri: String = row.get(4)?;
                let tags_json: String = row.get(5)?;
                let started_at: i64 = row.get(6)?;
                let ended_at: Option<i64> = row.get(7)?;
                Ok((run_id, experiment_id, name, status, artifact_uri, tags_json, started_at,
                    ended_at))
            },
        )
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(db_err(&other)),
        })?;
    let Some((run_id, experiment_id, name, status, artifact_uri, tags_json, started_at, ended_at)) =
        row
    else {
        return Ok(None);
    };
    Ok(Some(Run {
        params: load_params(connection, &run_id)?,
        metrics: load_metrics(connection, &run_id)?,
        run_id: RunId::from(run_id),
        experiment_id: ExperimentId::from(experiment_id),
        name,
        status: RunStatus::parse(&status).map_err(|err| StoreError::Invalid(err.to_string()))?,
        tags: from_json(&tags_json)?,
        artifact_uri,
        started_at: Timestamp::from_unix_millis(started_at),
        ended_at: ended_at.map(Timestamp::from_unix_millis),
    }))
}

// ============================================================================
// SECTION: ExperimentStore Implementation
// ============================================================================

impl ExperimentStore for SqliteStore {
    fn ensure_experiment(
        &self,
        name: &str,
        tenant_id: &TenantId,
        model_kind: ModelKind,
        now: Timestamp,
    ) -> Result<ExperimentId, StoreError> {
        let guard = self.lock()?;
        let existing: Option<String> = guard
            .query_row(
                "SELECT experiment_id FROM experiments WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })?;
        if let Some(experiment_id) = existing {
            return Ok(ExperimentId::from(experiment_id));
        }
        let experiment_id = format!("exp-{}", uuid::Uuid::new_v4());
        guard
            .execute(
                "INSERT INTO experiments (experiment_id, name, tenant_id, model_kind, \
                 description, tags_json, created_at) VALUES (?1, ?2, ?3, ?4, NULL, '{}', ?5)",
                params![
                    experiment_id,
                    name,
                    tenant_id.as_str(),
                    model_kind.as_str(),
                    now.unix_millis(),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(ExperimentId::from(experiment_id))
    }

    fn get_experiment(&self, name: &str) -> Result<Option<Experiment>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT experiment_id, name, tenant_id, model_kind, description, tags_json, \
                 created_at FROM experiments WHERE name = ?1",
                params![name],
                |row| {
                    let experiment_id: String = row.get(0)?;
                    let name: String = row.get(1)?;
                    let tenant_id: String = row.get(2)?;
                    let model_kind: String = row.get(3)?;
                    let description: Option<String> = row.get(4)?;
                    let tags_json: String = row.get(5)?;
                    let created_at: i64 = row.get(6)?;
                    Ok((experiment_id, name, tenant_id, model_kind, description, tags_json,
                        created_at))
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })?;
        let Some((experiment_id, name, tenant_id, model_kind, description, tags_json, created_at)) =
            row
        else {
            return Ok(None);
        };
        Ok(Some(Experiment {
            experiment_id: ExperimentId::from(experiment_id),
            name,
            tenant_id: TenantId::from(tenant_id),
            model_kind: ModelKind::parse(&model_kind)
                .map_err(|err| StoreError::Invalid(err.to_string()))?,
            description,
            tags: from_json(&tags_json)?,
            created_at: Timestamp::from_unix_millis(created_at),
        }))
    }

    fn insert_run(&self, run: &Run) -> Result<(), StoreError> {
        let tags_json = to_json(&run.tags)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO runs (run_id, experiment_id, name, status, artifact_uri, \
                 tags_json, started_at, ended_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run.run_id.as_str(),
                    run.experiment_id.as_str(),
                    run.name,
                    run.status.as_str(),
                    run.artifact_uri,
                    tags_json,
                    run.started_at.unix_millis(),
                    run.ended_at.map(Timestamp::unix_millis),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError> {
        let guard = self.lock()?;
        load_run(&guard, run_id.as_str())
    }

    fn update_run_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let ended_at = if status == RunStatus::Running { None } else { Some(now.unix_millis()) };
        let changed = guard
            .execute(
                "UPDATE runs SET status = ?1, ended_at = ?2 WHERE run_id = ?3",
                params![status.as_str(), ended_at, run_id.as_str()],
            )
            .map_err(|err| db_err(&err))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("run not found: {run_id}")));
        }
        Ok(())
    }

    fn put_param(&self, run_id: &RunId, key: &str, value: &str) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO run_params (run_id, key, value) VALUES (?1, ?2, ?3) ON \
                 CONFLICT(run_id, key) DO UPDATE SET value = excluded.value",
                params![run_id.as_str(), key, value],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn put_tag(&self, run_id: &RunId, key: &str, value: &str) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let tags_json: Option<String> = guard
            .query_row(
                "SELECT tags_json FROM runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })?;
        let Some(tags_json) = tags_json else {
            return Err(StoreError::NotFound(format!("run not found: {run_id}")));
        };
        let mut tags: BTreeMap<String, String> = from_json(&tags_json)?;
        tags.insert(key.to_string(), value.to_string());
        let updated = to_json(&tags)?;
        guard
            .execute(
                "UPDATE runs SET tags_json = ?1 WHERE run_id = ?2",
                params![updated, run_id.as_str()],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn append_metric(
        &self,
        run_id: &RunId,
        key: &str,
        point: &MetricPoint,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO run_metrics (run_id, key, step, at, value) VALUES (?1, ?2, ?3, \
                 ?4, ?5)",
                params![
                    run_id.as_str(),
                    key,
                    point.step,
                    point.at.unix_millis(),
                    point.value,
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn runs_for_experiment(&self, experiment_id: &ExperimentId) -> Result<Vec<Run>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT run_id FROM runs WHERE experiment_id = ?1 ORDER BY started_at DESC",
            )
            .map_err(|err| db_err(&err))?;
        let run_ids = statement
            .query_map(params![experiment_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        drop(statement);
        let mut runs = Vec::with_capacity(run_ids.len());
        for run_id in run_ids {
            if let Some(run) = load_run(&guard, &run_id)? {
                runs.push(run);
            }
        }
        Ok(runs)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
