// gridmind-config/src/lib.rs
// ============================================================================
// Module: Gridmind Configuration Library
// Description: Configuration loading and validation for Gridmind.
// Purpose: Expose the typed configuration tree and its loader.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Configuration is loaded from a single TOML document with strict size and
//! path limits. Missing or invalid configuration fails closed; every
//! component receives its own typed section.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ApiConfig;
pub use config::CacheBackend;
pub use config::CacheConfig;
pub use config::ConfigError;
pub use config::FeatureStoreConfig;
pub use config::GridmindConfig;
pub use config::ObjectStoreConfig;
pub use config::ObjectStoreProvider;
pub use config::OrchestratorConfig;
pub use config::SqliteConfig;
pub use config::TrackingConfig;
