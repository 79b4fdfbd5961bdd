// gridmind-api/src/lib.rs
// ============================================================================
// Module: Gridmind API Library
// Description: HTTP surface and composition root for the training core.
// Purpose: Expose the platform builder, router, and error mapping.
// Dependencies: crate::{error, platform, routes, telemetry}
// ============================================================================

//! ## Overview
//! The API crate wires the platform together once at startup (store, object
//! store, cache, registry, tracker, HPO engine, pipeline, orchestrator) and
//! exposes the core vocabulary over a thin axum router. Handlers parse,
//! delegate, and serialize; error-kind-to-status mapping happens only here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod platform;
pub mod routes;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ApiError;
pub use platform::Platform;
pub use routes::router;
pub use telemetry::NoopEventSink;
pub use telemetry::StderrEventSink;
