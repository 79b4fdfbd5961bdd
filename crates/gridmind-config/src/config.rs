// gridmind-config/src/config.rs
// ============================================================================
// Module: Gridmind Configuration
// Description: Configuration loading and validation for Gridmind.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: gridmind-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Every section has conservative defaults so an empty document
//! yields a runnable local deployment (memory object store, memory cache,
//! SQLite beside the binary). Invalid values fail closed at load time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "gridmind.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "GRIDMIND_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default SQLite busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default object-store bucket name.
const DEFAULT_BUCKET: &str = "ml-models";
/// Default hot-cache TTL in seconds.
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
/// Default concurrency cap for the orchestrator.
const DEFAULT_MAX_CONCURRENT_JOBS: u32 = 3;
/// Default per-stage soft timeout in seconds.
const DEFAULT_STAGE_TIMEOUT_SECONDS: u64 = 3_600;
/// Server-side page size cap for job listings.
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
/// Upper bound accepted for the concurrency cap.
const MAX_CONCURRENT_JOBS_LIMIT: u32 = 64;
/// Upper bound accepted for the page size cap.
const MAX_PAGE_SIZE_LIMIT: u32 = 1_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file exceeded the size limit.
    #[error("config file too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual file size in bytes.
        actual_bytes: usize,
    },
    /// Config file failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config values failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Store Section
// ============================================================================

/// SQLite store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Returns the default database path.
fn default_store_path() -> PathBuf {
    PathBuf::from("gridmind.db")
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self { path: default_store_path(), busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS }
    }
}

// ============================================================================
// SECTION: Object Store Section
// ============================================================================

/// Supported object-store providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreProvider {
    /// In-process memory backend for local and test deployments.
    #[default]
    Memory,
    /// S3-compatible backend (AWS S3 or MinIO).
    S3,
}

/// Object-store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Backend provider.
    #[serde(default)]
    pub provider: ObjectStoreProvider,
    /// Bucket holding model artifacts.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Custom endpoint URL (MinIO deployments).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region name.
    #[serde(default)]
    pub region: Option<String>,
    /// True to force path-style addressing.
    #[serde(default)]
    pub force_path_style: bool,
    /// Optional key prefix prepended to all objects.
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Returns the default bucket name.
fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            provider: ObjectStoreProvider::Memory,
            bucket: default_bucket(),
            endpoint: None,
            region: None,
            force_path_style: false,
            prefix: None,
        }
    }
}

impl ObjectStoreConfig {
    /// Validates the object-store section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty bucket names or malformed
    /// prefixes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("object_store.bucket must be set".to_string()));
        }
        if let Some(prefix) = &self.prefix {
            if prefix.starts_with('/') {
                return Err(ConfigError::Invalid(
                    "object_store.prefix must be relative (no leading slash)".to_string(),
                ));
            }
            if prefix.contains('\\') {
                return Err(ConfigError::Invalid(
                    "object_store.prefix must not contain backslashes".to_string(),
                ));
            }
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Invalid(
                    "object_store.endpoint must be an http(s) URL".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Cache Section
// ============================================================================

/// Supported hot-cache backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process TTL map.
    #[default]
    Memory,
    /// Redis-backed cache.
    Redis,
}

/// Hot-cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache backend.
    #[serde(default)]
    pub backend: CacheBackend,
    /// Redis connection URL for the redis backend.
    #[serde(default)]
    pub url: Option<String>,
    /// Entry TTL in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

/// Returns the default cache TTL.
const fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { backend: CacheBackend::Memory, url: None, ttl_seconds: DEFAULT_CACHE_TTL_SECONDS }
    }
}

impl CacheConfig {
    /// Validates the cache section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the redis backend lacks a URL
    /// or the TTL is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_seconds == 0 {
            return Err(ConfigError::Invalid("cache.ttl_seconds must be positive".to_string()));
        }
        if self.backend == CacheBackend::Redis {
            let Some(url) = &self.url else {
                return Err(ConfigError::Invalid(
                    "cache.url must be set for the redis backend".to_string(),
                ));
            };
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ConfigError::Invalid(
                    "cache.url must be a redis:// URL".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Feature Store Section
// ============================================================================

/// Feature-store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureStoreConfig {
    /// Directory receiving columnar export files.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// Lookback applied to online lookups, in hours.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
}

/// Returns the default export directory.
fn default_export_dir() -> PathBuf {
    PathBuf::from("./exports")
}

/// Returns the default online lookback in hours.
const fn default_lookback_hours() -> u32 {
    168
}

impl Default for FeatureStoreConfig {
    fn default() -> Self {
        Self { export_dir: default_export_dir(), lookback_hours: default_lookback_hours() }
    }
}

// ============================================================================
// SECTION: Orchestrator Section
// ============================================================================

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Concurrency cap for execution tasks.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,
    /// Per-stage soft timeout in seconds.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: u64,
    /// Server-side cap applied to listing page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Dispatch loop poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Returns the default concurrency cap.
const fn default_max_concurrent_jobs() -> u32 {
    DEFAULT_MAX_CONCURRENT_JOBS
}

/// Returns the default stage timeout.
const fn default_stage_timeout() -> u64 {
    DEFAULT_STAGE_TIMEOUT_SECONDS
}

/// Returns the default page size cap.
const fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

/// Returns the default dispatch poll interval.
const fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            stage_timeout_seconds: DEFAULT_STAGE_TIMEOUT_SECONDS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl OrchestratorConfig {
    /// Validates the orchestrator section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero or oversized limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_jobs == 0 || self.max_concurrent_jobs > MAX_CONCURRENT_JOBS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "orchestrator.max_concurrent_jobs must lie in [1, {MAX_CONCURRENT_JOBS_LIMIT}]"
            )));
        }
        if self.max_page_size == 0 || self.max_page_size > MAX_PAGE_SIZE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "orchestrator.max_page_size must lie in [1, {MAX_PAGE_SIZE_LIMIT}]"
            )));
        }
        if self.stage_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.stage_timeout_seconds must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tracking Section
// ============================================================================

/// Experiment-tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingConfig {
    /// Directory receiving run artifacts.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
}

/// Returns the default artifact root.
fn default_artifact_root() -> PathBuf {
    PathBuf::from("./artifacts")
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { artifact_root: default_artifact_root() }
    }
}

// ============================================================================
// SECTION: API Section
// ============================================================================

/// HTTP API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Socket address the server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

/// Returns the default bind address.
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8003))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

// ============================================================================
// SECTION: Root Configuration
// ============================================================================

/// Root Gridmind configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridmindConfig {
    /// SQLite store section.
    #[serde(default)]
    pub store: SqliteConfig,
    /// Object-store section.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Hot-cache section.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Feature-store section.
    #[serde(default)]
    pub features: FeatureStoreConfig,
    /// Orchestrator section.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Tracking section.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// API section.
    #[serde(default)]
    pub api: ApiConfig,
}

impl GridmindConfig {
    /// Loads configuration from an explicit path, the `GRIDMIND_CONFIG`
    /// environment variable, or the default filename; a missing default
    /// file yields the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicitly named file is absent,
    /// oversized, unparsable, or invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match env::var(CONFIG_ENV_VAR) {
                Ok(env_path) => (PathBuf::from(env_path), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_NAME), false),
            },
        };
        if !path.exists() {
            if explicit {
                return Err(ConfigError::Io(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_file(&path)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is oversized, unparsable, or
    /// invalid.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_config_path(path)?;
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                max_bytes: MAX_CONFIG_FILE_SIZE,
                actual_bytes: size,
            });
        }
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config: Self =
            toml::from_str(&contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when any section is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.object_store.validate()?;
        self.cache.validate()?;
        self.orchestrator.validate()?;
        if self.store.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a configuration file path against the hard limits.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    let rendered = path.display().to_string();
    if rendered.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(
                "config path contains an overlong component".to_string(),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
