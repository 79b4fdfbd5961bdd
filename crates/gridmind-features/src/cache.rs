// gridmind-features/src/cache.rs
// ============================================================================
// Module: Feature Cache Backends
// Description: Hot-cache implementations behind the FeatureCache trait.
// Purpose: Provide the redis-backed and in-process TTL caches.
// Dependencies: gridmind-core, redis
// ============================================================================

//! ## Overview
//! Two backends implement the hot cache: a redis client for shared
//! deployments and an in-process TTL map for local and test runs. Staleness
//! is bounded by the TTL; callers treat every cache failure as a miss.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use gridmind_config::CacheBackend;
use gridmind_config::CacheConfig;
use gridmind_core::CacheError;
use gridmind_core::FeatureCache;
use redis::Commands;

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Builds the configured cache backend.
///
/// # Errors
///
/// Returns [`CacheError`] when the redis client cannot be created.
pub fn build_cache(config: &CacheConfig) -> Result<Arc<dyn FeatureCache>, CacheError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryFeatureCache::new())),
        CacheBackend::Redis => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| CacheError::Connection("redis url missing".to_string()))?;
            Ok(Arc::new(RedisFeatureCache::connect(url)?))
        }
    }
}

// ============================================================================
// SECTION: Memory Cache
// ============================================================================

/// One cached entry with its expiry.
struct MemoryEntry {
    /// Cached payload.
    value: String,
    /// Absolute expiry instant.
    expires_at: Instant,
}

/// In-process TTL cache.
pub struct MemoryFeatureCache {
    /// Entries keyed by cache key.
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryFeatureCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl Default for MemoryFeatureCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureCache for MemoryFeatureCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Command("cache lock poisoned".to_string()))?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Command("cache lock poisoned".to_string()))?;
        entries.insert(key.to_string(), MemoryEntry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Command("cache lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// SECTION: Redis Cache
// ============================================================================

/// Redis-backed hot cache.
pub struct RedisFeatureCache {
    /// Shared connection guarded by a mutex.
    connection: Mutex<redis::Connection>,
}

impl RedisFeatureCache {
    /// Connects to the redis deployment at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] when the client or connection
    /// cannot be established.
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|err| CacheError::Connection(err.to_string()))?;
        let connection = client
            .get_connection()
            .map_err(|err| CacheError::Connection(err.to_string()))?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, redis::Connection>, CacheError> {
        self.connection
            .lock()
            .map_err(|_| CacheError::Command("redis lock poisoned".to_string()))
    }
}

impl FeatureCache for RedisFeatureCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.lock()?;
        connection.get(key).map_err(|err| CacheError::Command(err.to_string()))
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut connection = self.lock()?;
        connection
            .set_ex(key, value, ttl_seconds)
            .map_err(|err| CacheError::Command(err.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.lock()?;
        connection.del(key).map_err(|err| CacheError::Command(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
