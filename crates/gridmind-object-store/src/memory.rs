// gridmind-object-store/src/memory.rs
// ============================================================================
// Module: In-Memory Object Store
// Description: Process-local ObjectStore backend.
// Purpose: Back tests and local deployments without external storage.
// Dependencies: gridmind-core
// ============================================================================

//! ## Overview
//! The memory backend keeps objects in a sorted map guarded by a mutex. It
//! implements the full gateway surface, including delimiter grouping and
//! prefix deletes, so registry behavior is identical across backends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use gridmind_core::ObjectListing;
use gridmind_core::ObjectStore;
use gridmind_core::ObjectStoreError;

use crate::keys::validate_key;
use crate::keys::validate_prefix;

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-process object store backend.
pub struct MemoryObjectStore {
    /// Bucket name (informational; a single map backs the store).
    bucket: String,
    /// Object payloads keyed by object key.
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    /// Creates an empty store for the named bucket.
    #[must_use]
    pub fn new(bucket: &str) -> Self {
        Self { bucket: bucket.to_string(), objects: Mutex::new(BTreeMap::new()) }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Locks the object map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, ObjectStoreError>
    {
        self.objects
            .lock()
            .map_err(|_| ObjectStoreError::Io("object store lock poisoned".to_string()))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        self.lock()?.insert(key.to_string(), bytes);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        validate_key(key)?;
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    fn list(
        &self,
        prefix: &str,
        delimiter: Option<char>,
    ) -> Result<ObjectListing, ObjectStoreError> {
        validate_prefix(prefix)?;
        let guard = self.lock()?;
        let mut listing = ObjectListing::default();
        for key in guard.keys() {
            let Some(remainder) = key.strip_prefix(prefix) else { continue };
            match delimiter {
                Some(delimiter) => match remainder.find(delimiter) {
                    Some(split) => {
                        let grouped = format!("{prefix}{}{delimiter}", &remainder[.. split]);
                        if listing.common_prefixes.last() != Some(&grouped) {
                            listing.common_prefixes.push(grouped);
                        }
                    }
                    None => listing.keys.push(key.clone()),
                },
                None => listing.keys.push(key.clone()),
            }
        }
        Ok(listing)
    }

    fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError> {
        validate_key(src)?;
        validate_key(dst)?;
        let mut guard = self.lock()?;
        let bytes = guard
            .get(src)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(src.to_string()))?;
        guard.insert(dst.to_string(), bytes);
        Ok(())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        validate_prefix(prefix)?;
        let mut guard = self.lock()?;
        let doomed: Vec<String> =
            guard.keys().filter(|key| key.starts_with(prefix)).cloned().collect();
        for key in &doomed {
            guard.remove(key);
        }
        Ok(doomed)
    }

    fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
