// gridmind-store-sqlite/src/jobs.rs
// ============================================================================
// Module: SQLite Job Store
// Description: Durable job rows, logs, and the atomic dispatch claim.
// Purpose: Implement the JobStore interface over the shared connection.
// Dependencies: gridmind-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! The job row is the single synchronization point for a job's state. Every
//! mutation is one statement scoped by id; claims and terminal transitions
//! additionally guard on the prior status so concurrent dispatchers and the
//! cancel path cannot race a job out of the state machine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::JobFilters;
use gridmind_core::JobId;
use gridmind_core::JobLogEntry;
use gridmind_core::JobPage;
use gridmind_core::JobStatus;
use gridmind_core::JobStore;
use gridmind_core::LogLevel;
use gridmind_core::ModelKind;
use gridmind_core::ModelName;
use gridmind_core::StoreError;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::TrainingJob;
use gridmind_core::TrainingMetrics;
use rusqlite::Row;
use rusqlite::ToSql;
use rusqlite::params;

use crate::store::SqliteStore;
use crate::store::db_err;
use crate::store::from_json;
use crate::store::to_json;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every job query.
const JOB_COLUMNS: &str = "job_id, tenant_id, model_kind, model_name, status, priority, \
                           config_json, schedule, progress, metrics_json, model_id, \
                           error_message, created_at, started_at, completed_at, updated_at, \
                           tags_json";

/// Raw job row data loaded from SQLite.
#[derive(Debug)]
struct JobRow {
    /// Job identifier string.
    job_id: String,
    /// Tenant identifier string.
    tenant_id: String,
    /// Model kind label.
    model_kind: String,
    /// Model name string.
    model_name: String,
    /// Status label.
    status: String,
    /// Priority value.
    priority: i32,
    /// Config JSON document.
    config_json: String,
    /// Optional schedule expression.
    schedule: Option<String>,
    /// Progress fraction.
    progress: f64,
    /// Optional metrics JSON document.
    metrics_json: Option<String>,
    /// Optional registered model id.
    model_id: Option<String>,
    /// Optional error message.
    error_message: Option<String>,
    /// Submission time (unix millis).
    created_at: i64,
    /// Claim time (unix millis).
    started_at: Option<i64>,
    /// Terminal time (unix millis).
    completed_at: Option<i64>,
    /// Last mutation time (unix millis).
    updated_at: i64,
    /// Tags JSON document.
    tags_json: String,
}

/// Maps a job row into the raw payload.
fn map_job(row: &Row<'_>) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        job_id: row.get(0)?,
        tenant_id: row.get(1)?,
        model_kind: row.get(2)?,
        model_name: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        config_json: row.get(6)?,
        schedule: row.get(7)?,
        progress: row.get(8)?,
        metrics_json: row.get(9)?,
        model_id: row.get(10)?,
        error_message: row.get(11)?,
        created_at: row.get(12)?,
        started_at: row.get(13)?,
        completed_at: row.get(14)?,
        updated_at: row.get(15)?,
        tags_json: row.get(16)?,
    })
}

/// Builds a validated job record from raw row data.
fn finish_job(row: JobRow) -> Result<TrainingJob, StoreError> {
    let job_id = JobId::parse(&row.job_id)
        .map_err(|err| StoreError::Invalid(format!("bad job id {}: {err}", row.job_id)))?;
    let model_kind =
        ModelKind::parse(&row.model_kind).map_err(|err| StoreError::Invalid(err.to_string()))?;
    let status =
        JobStatus::parse(&row.status).map_err(|err| StoreError::Invalid(err.to_string()))?;
    let metrics = row.metrics_json.as_deref().map(from_json).transpose()?;
    Ok(TrainingJob {
        job_id,
        tenant_id: TenantId::from(row.tenant_id),
        model_kind,
        model_name: ModelName::from(row.model_name),
        config: from_json(&row.config_json)?,
        priority: row.priority,
        status,
        progress: row.progress,
        metrics,
        model_id: row.model_id,
        error_message: row.error_message,
        created_at: Timestamp::from_unix_millis(row.created_at),
        started_at: row.started_at.map(Timestamp::from_unix_millis),
        completed_at: row.completed_at.map(Timestamp::from_unix_millis),
        updated_at: Timestamp::from_unix_millis(row.updated_at),
        schedule: row.schedule,
        tags: from_json(&row.tags_json)?,
    })
}

// ============================================================================
// SECTION: JobStore Implementation
// ============================================================================

impl JobStore for SqliteStore {
    fn insert_job(&self, job: &TrainingJob) -> Result<(), StoreError> {
        let config_json = to_json(&job.config)?;
        let metrics_json = job.metrics.as_ref().map(to_json).transpose()?;
        let tags_json = to_json(&job.tags)?;
        let guard = self.lock()?;
        let result = guard.execute(
            "INSERT INTO jobs (job_id, tenant_id, model_kind, model_name, feature_set, status, \
             priority, config_json, schedule, progress, metrics_json, model_id, error_message, \
             created_at, started_at, completed_at, updated_at, tags_json) VALUES (?1, ?2, ?3, \
             ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                job.job_id.to_string(),
                job.tenant_id.as_str(),
                job.model_kind.as_str(),
                job.model_name.as_str(),
                job.config.feature_set,
                job.status.as_str(),
                job.priority,
                config_json,
                job.schedule,
                job.progress,
                metrics_json,
                job.model_id,
                job.error_message,
                job.created_at.unix_millis(),
                job.started_at.map(Timestamp::unix_millis),
                job.completed_at.map(Timestamp::unix_millis),
                job.updated_at.unix_millis(),
                tags_json,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(format!("job already exists: {}", job.job_id)))
            }
            Err(err) => Err(db_err(&err)),
        }
    }

    fn get_job(&self, job_id: &JobId) -> Result<Option<TrainingJob>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
                params![job_id.to_string()],
                map_job,
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })?;
        row.map(finish_job).transpose()
    }

    fn list_jobs(
        &self,
        filters: &JobFilters,
        page: u32,
        page_size: u32,
    ) -> Result<JobPage, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(tenant) = &filters.tenant_id {
            clauses.push(format!("tenant_id = ?{}", values.len() + 1));
            values.push(Box::new(tenant.as_str().to_string()));
        }
        if let Some(kind) = filters.model_kind {
            clauses.push(format!("model_kind = ?{}", values.len() + 1));
            values.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(name) = &filters.model_name {
            clauses.push(format!("model_name = ?{}", values.len() + 1));
            values.push(Box::new(name.as_str().to_string()));
        }
        if let Some(status) = filters.status {
            clauses.push(format!("status = ?{}", values.len() + 1));
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(after) = filters.created_after {
            clauses.push(format!("created_at >= ?{}", values.len() + 1));
            values.push(Box::new(after.unix_millis()));
        }
        if let Some(before) = filters.created_before {
            clauses.push(format!("created_at <= ?{}", values.len() + 1));
            values.push(Box::new(before.unix_millis()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let guard = self.lock()?;
        let params_ref: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let total: i64 = guard
            .query_row(
                &format!("SELECT COUNT(*) FROM jobs{where_clause}"),
                params_ref.as_slice(),
                |row| row.get(0),
            )
            .map_err(|err| db_err(&err))?;
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(page_size);
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM jobs{where_clause} ORDER BY created_at DESC LIMIT \
             {page_size} OFFSET {offset}"
        );
        let mut statement = guard.prepare(&query).map_err(|err| db_err(&err))?;
        let rows = statement
            .query_map(params_ref.as_slice(), map_job)
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        let items =
            rows.into_iter().map(finish_job).collect::<Result<Vec<_>, StoreError>>()?;
        Ok(JobPage { items, total: u64::try_from(total).unwrap_or(0), page, page_size })
    }

    fn claim_next_queued(&self, now: Timestamp) -> Result<Option<TrainingJob>, StoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_err(&err))?;
        let candidate: Option<String> = tx
            .query_row(
                "SELECT job_id FROM jobs WHERE status = 'queued' ORDER BY priority DESC, \
                 created_at ASC LIMIT 1",
                params![],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })?;
        let Some(job_id) = candidate else {
            tx.commit().map_err(|err| db_err(&err))?;
            return Ok(None);
        };
        let changed = tx
            .execute(
                "UPDATE jobs SET status = 'running', started_at = ?1, updated_at = ?1 WHERE \
                 job_id = ?2 AND status = 'queued'",
                params![now.unix_millis(), job_id],
            )
            .map_err(|err| db_err(&err))?;
        let claimed = if changed == 1 {
            tx.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
                params![job_id],
                map_job,
            )
            .map(Some)
            .map_err(|err| db_err(&err))?
        } else {
            None
        };
        tx.commit().map_err(|err| db_err(&err))?;
        claimed.map(finish_job).transpose()
    }

    fn update_progress(
        &self,
        job_id: &JobId,
        progress: f64,
        metrics: Option<&TrainingMetrics>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let metrics_json = metrics.map(to_json).transpose()?;
        let guard = self.lock()?;
        let changed = match metrics_json {
            Some(metrics_json) => guard
                .execute(
                    "UPDATE jobs SET progress = ?1, metrics_json = ?2, updated_at = ?3 WHERE \
                     job_id = ?4",
                    params![progress, metrics_json, now.unix_millis(), job_id.to_string()],
                )
                .map_err(|err| db_err(&err))?,
            None => guard
                .execute(
                    "UPDATE jobs SET progress = ?1, updated_at = ?2 WHERE job_id = ?3",
                    params![progress, now.unix_millis(), job_id.to_string()],
                )
                .map_err(|err| db_err(&err))?,
        };
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job not found: {job_id}")));
        }
        Ok(())
    }

    fn mark_completed(
        &self,
        job_id: &JobId,
        model_id: &str,
        metrics: &TrainingMetrics,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let metrics_json = to_json(metrics)?;
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE jobs SET status = 'completed', progress = 1.0, model_id = ?1, \
                 metrics_json = ?2, completed_at = ?3, updated_at = ?3 WHERE job_id = ?4 AND \
                 status = 'running'",
                params![model_id, metrics_json, now.unix_millis(), job_id.to_string()],
            )
            .map_err(|err| db_err(&err))?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!("job is not running: {job_id}")));
        }
        Ok(())
    }

    fn mark_failed(
        &self,
        job_id: &JobId,
        error_message: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE jobs SET status = 'failed', error_message = ?1, completed_at = ?2, \
                 updated_at = ?2 WHERE job_id = ?3 AND status = 'running'",
                params![error_message, now.unix_millis(), job_id.to_string()],
            )
            .map_err(|err| db_err(&err))?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!("job is not running: {job_id}")));
        }
        Ok(())
    }

    fn mark_cancelled(&self, job_id: &JobId, now: Timestamp) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE jobs SET status = 'cancelled', completed_at = ?1, updated_at = ?1 WHERE \
                 job_id = ?2 AND status IN ('queued', 'running')",
                params![now.unix_millis(), job_id.to_string()],
            )
            .map_err(|err| db_err(&err))?;
        Ok(changed == 1)
    }

    fn append_log(&self, job_id: &JobId, entry: &JobLogEntry) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO job_logs (job_id, at, level, message) VALUES (?1, ?2, ?3, ?4)",
                params![
                    job_id.to_string(),
                    entry.at.unix_millis(),
                    entry.level.as_str(),
                    entry.message,
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn tail_logs(
        &self,
        job_id: &JobId,
        tail: u32,
        level: Option<LogLevel>,
    ) -> Result<Vec<JobLogEntry>, StoreError> {
        let guard = self.lock()?;
        let (query, has_level) = match level {
            Some(_) => (
                "SELECT at, level, message FROM (SELECT log_id, at, level, message FROM job_logs \
                 WHERE job_id = ?1 AND level = ?2 ORDER BY log_id DESC LIMIT ?3) ORDER BY log_id \
                 ASC",
                true,
            ),
            None => (
                "SELECT at, level, message FROM (SELECT log_id, at, level, message FROM job_logs \
                 WHERE job_id = ?1 ORDER BY log_id DESC LIMIT ?2) ORDER BY log_id ASC",
                false,
            ),
        };
        let mut statement = guard.prepare(query).map_err(|err| db_err(&err))?;
        let map_row = |row: &Row<'_>| -> rusqlite::Result<(i64, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        };
        let rows = if has_level {
            let level_label = level.map_or("info", LogLevel::as_str);
            statement
                .query_map(params![job_id.to_string(), level_label, tail], map_row)
                .map_err(|err| db_err(&err))?
                .collect::<Result<Vec<_>, _>>()
        } else {
            statement
                .query_map(params![job_id.to_string(), tail], map_row)
                .map_err(|err| db_err(&err))?
                .collect::<Result<Vec<_>, _>>()
        }
        .map_err(|err| db_err(&err))?;
        rows.into_iter()
            .map(|(at, level, message)| {
                Ok(JobLogEntry {
                    at: Timestamp::from_unix_millis(at),
                    level: LogLevel::parse(&level)
                        .map_err(|err| StoreError::Invalid(err.to_string()))?,
                    message,
                })
            })
            .collect()
    }

    fn count_by_status(&self) -> Result<BTreeMap<JobStatus, u64>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")
            .map_err(|err| db_err(&err))?;
        let rows = statement
            .query_map(params![], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status, count))
            })
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        let mut counts = BTreeMap::new();
        for (status, count) in rows {
            let status =
                JobStatus::parse(&status).map_err(|err| StoreError::Invalid(err.to_string()))?;
            counts.insert(status, u64::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
