// gridmind-object-store/src/lib.rs
// ============================================================================
// Module: Gridmind Object Store Library
// Description: Object-store gateway backends for model artifacts.
// Purpose: Expose the S3 and in-memory ObjectStore implementations.
// Dependencies: crate::{keys, memory, s3}
// ============================================================================

//! ## Overview
//! The object-store gateway persists model artifacts and sidecars under a
//! structured `tenant/name/version/...` key space. Two backends implement
//! the core [`gridmind_core::ObjectStore`] trait: an S3-compatible client
//! and an in-process memory store for tests and local deployments.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod keys;
pub mod memory;
pub mod s3;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use keys::validate_key;
pub use keys::validate_prefix;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

// ============================================================================
// SECTION: Factory
// ============================================================================

use std::sync::Arc;

use gridmind_config::ObjectStoreConfig;
use gridmind_config::ObjectStoreProvider;
use gridmind_core::ObjectStore;
use gridmind_core::ObjectStoreError;

/// Builds the configured object-store backend and ensures its bucket.
///
/// # Errors
///
/// Returns [`ObjectStoreError`] when the backend cannot be initialized or
/// the bucket cannot be ensured.
pub fn build_object_store(
    config: &ObjectStoreConfig,
) -> Result<Arc<dyn ObjectStore>, ObjectStoreError> {
    let store: Arc<dyn ObjectStore> = match config.provider {
        ObjectStoreProvider::Memory => Arc::new(MemoryObjectStore::new(&config.bucket)),
        ObjectStoreProvider::S3 => Arc::new(S3ObjectStore::new(config)?),
    };
    store.ensure_bucket()?;
    Ok(store)
}
