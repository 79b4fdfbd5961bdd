// gridmind-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store Core
// Description: Connection handling, pragmas, and schema initialization.
// Purpose: Open the durable store and keep its schema at the current version.
// Dependencies: gridmind-config, gridmind-core, rusqlite
// ============================================================================

//! ## Overview
//! The store owns one SQLite connection in WAL mode behind a mutex. Schema
//! initialization is gated on a version row and fails closed on unknown
//! versions. The feature views defined here are the read surface for
//! columnar exports and the training Load stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use gridmind_config::SqliteConfig;
use gridmind_core::StoreError;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// SQLite schema version for the store.
const SCHEMA_VERSION: i64 = 1;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// SQLite store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// SQLite engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Db(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed durable store shared across components.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens the store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteConfig) -> Result<Self, SqliteStoreError> {
        ensure_parent_dir(&config.path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let mut connection = Connection::open_with_flags(&config.path, flags)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        apply_pragmas(&connection, config.busy_timeout_ms)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Opens an in-memory store for tests and ephemeral deployments.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when initialization fails.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let mut connection =
            Connection::open_in_memory().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Locks the shared connection.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Db("store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        }
    }
    Ok(())
}

/// Applies the pragmas required for durability.
fn apply_pragmas(connection: &Connection, busy_timeout_ms: u64) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = wal;
             PRAGMA synchronous = normal;",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(SCHEMA_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Full schema for version 1.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS jobs (
    job_id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    model_kind TEXT NOT NULL,
    model_name TEXT NOT NULL,
    feature_set TEXT NOT NULL,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL,
    config_json TEXT NOT NULL,
    schedule TEXT,
    progress REAL NOT NULL DEFAULT 0.0,
    metrics_json TEXT,
    model_id TEXT,
    error_message TEXT,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER,
    updated_at INTEGER NOT NULL,
    tags_json TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_jobs_status_priority
    ON jobs (status, priority DESC, created_at ASC);
CREATE INDEX IF NOT EXISTS idx_jobs_tenant_created
    ON jobs (tenant_id, created_at DESC);
CREATE TABLE IF NOT EXISTS job_logs (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
    at INTEGER NOT NULL,
    level TEXT NOT NULL,
    message TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_job_logs_job ON job_logs (job_id, log_id);
CREATE TABLE IF NOT EXISTS studies (
    name TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    model_kind TEXT NOT NULL,
    direction TEXT NOT NULL,
    sampler TEXT NOT NULL,
    pruner TEXT NOT NULL,
    n_trials INTEGER NOT NULL,
    timeout_seconds INTEGER,
    user_attrs_json TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS trials (
    study TEXT NOT NULL REFERENCES studies(name) ON DELETE CASCADE,
    number INTEGER NOT NULL,
    params_json TEXT NOT NULL,
    state TEXT NOT NULL,
    value REAL,
    intermediate_json TEXT NOT NULL DEFAULT '{}',
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    PRIMARY KEY (study, number)
);
CREATE TABLE IF NOT EXISTS experiments (
    experiment_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    tenant_id TEXT NOT NULL,
    model_kind TEXT NOT NULL,
    description TEXT,
    tags_json TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    experiment_id TEXT NOT NULL REFERENCES experiments(experiment_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    artifact_uri TEXT NOT NULL,
    tags_json TEXT NOT NULL DEFAULT '{}',
    started_at INTEGER NOT NULL,
    ended_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_runs_experiment ON runs (experiment_id, started_at DESC);
CREATE TABLE IF NOT EXISTS run_params (
    run_id TEXT NOT NULL REFERENCES runs(run_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (run_id, key)
);
CREATE TABLE IF NOT EXISTS run_metrics (
    metric_id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL REFERENCES runs(run_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    step INTEGER NOT NULL,
    at INTEGER NOT NULL,
    value REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_run_metrics_run ON run_metrics (run_id, key, metric_id);
CREATE TABLE IF NOT EXISTS feature_exports (
    export_id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    feature_set TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    asset_ids_json TEXT NOT NULL DEFAULT '[]',
    row_count INTEGER NOT NULL DEFAULT 0,
    file_size_bytes INTEGER NOT NULL DEFAULT 0,
    storage_path TEXT,
    status TEXT NOT NULL,
    error_message TEXT,
    completed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_feature_exports_tenant
    ON feature_exports (tenant_id, completed_at DESC);
CREATE TABLE IF NOT EXISTS measurements (
    tenant_id TEXT NOT NULL,
    asset_id TEXT NOT NULL,
    ts INTEGER NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (tenant_id, asset_id, ts)
);
CREATE TABLE IF NOT EXISTS weather (
    tenant_id TEXT NOT NULL,
    ts INTEGER NOT NULL,
    temperature REAL,
    humidity REAL,
    wind_speed REAL,
    solar_irradiance REAL,
    cloud_cover REAL,
    precipitation REAL,
    PRIMARY KEY (tenant_id, ts)
);
CREATE VIEW IF NOT EXISTS hourly_features AS
SELECT
    tenant_id,
    asset_id,
    (ts / 3600000) * 3600000 AS hour,
    AVG(value) AS avg_value,
    MIN(value) AS min_value,
    MAX(value) AS max_value,
    COUNT(*) AS n_values
FROM measurements
GROUP BY tenant_id, asset_id, hour;
CREATE VIEW IF NOT EXISTS daily_features AS
SELECT
    tenant_id,
    asset_id,
    (ts / 86400000) * 86400000 AS day,
    AVG(value) AS avg_value,
    MIN(value) AS min_value,
    MAX(value) AS max_value,
    COUNT(*) AS n_values
FROM measurements
GROUP BY tenant_id, asset_id, day;
CREATE VIEW IF NOT EXISTS weather_features AS
SELECT tenant_id, ts, temperature, humidity, wind_speed,
       solar_irradiance, cloud_cover, precipitation
FROM weather;
CREATE VIEW IF NOT EXISTS forecast_basic_features AS
SELECT
    m.tenant_id AS tenant_id,
    m.asset_id AS asset_id,
    m.ts AS timestamp,
    CAST((m.ts / 3600000) % 24 AS INTEGER) AS hour_of_day,
    CAST(((m.ts / 86400000) + 3) % 7 AS INTEGER) AS day_of_week,
    CASE WHEN ((m.ts / 86400000) + 3) % 7 >= 5 THEN 1 ELSE 0 END AS is_weekend,
    h.avg_value AS hourly_avg,
    l1.value AS lag_1h,
    l24.value AS lag_24h,
    m.value AS load_kw
FROM measurements m
LEFT JOIN hourly_features h
    ON h.tenant_id = m.tenant_id AND h.asset_id = m.asset_id
    AND h.hour = (m.ts / 3600000) * 3600000
LEFT JOIN measurements l1
    ON l1.tenant_id = m.tenant_id AND l1.asset_id = m.asset_id
    AND l1.ts = m.ts - 3600000
LEFT JOIN measurements l24
    ON l24.tenant_id = m.tenant_id AND l24.asset_id = m.asset_id
    AND l24.ts = m.ts - 86400000;
CREATE VIEW IF NOT EXISTS anomaly_detection_features AS
SELECT
    m.tenant_id AS tenant_id,
    m.asset_id AS asset_id,
    m.ts AS timestamp,
    CAST((m.ts / 3600000) % 24 AS INTEGER) AS hour_of_day,
    CAST(((m.ts / 86400000) + 3) % 7 AS INTEGER) AS day_of_week,
    h.avg_value AS hourly_avg,
    h.min_value AS hourly_min,
    h.max_value AS hourly_max,
    l1.value AS lag_1h,
    m.value AS load_kw
FROM measurements m
LEFT JOIN hourly_features h
    ON h.tenant_id = m.tenant_id AND h.asset_id = m.asset_id
    AND h.hour = (m.ts / 3600000) * 3600000
LEFT JOIN measurements l1
    ON l1.tenant_id = m.tenant_id AND l1.asset_id = m.asset_id
    AND l1.ts = m.ts - 3600000;
";

// ============================================================================
// SECTION: Shared Row Helpers
// ============================================================================

/// Maps a rusqlite error into a store error.
pub(crate) fn db_err(err: &rusqlite::Error) -> StoreError {
    StoreError::Db(err.to_string())
}

/// Serializes a value into a JSON column.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::Invalid(err.to_string()))
}

/// Deserializes a value from a JSON column.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, StoreError> {
    serde_json::from_str(json).map_err(|err| StoreError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
