// gridmind-api/src/telemetry.rs
// ============================================================================
// Module: Telemetry Sinks
// Description: Event sink implementations for the platform.
// Purpose: Provide stderr-JSON and noop observability backends.
// Dependencies: gridmind-core, serde_json
// ============================================================================

//! ## Overview
//! The platform stays dependency-light on observability: components emit
//! structured events through the core sink interface and deployments choose
//! a backend. The stderr sink writes one JSON line per event; the noop sink
//! discards everything (tests, embedded use).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use gridmind_core::Event;
use gridmind_core::EventSink;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Sink writing one JSON line per event to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn emit(&self, event: &Event) {
        if let Ok(line) = serde_json::to_string(event) {
            let stderr = std::io::stderr();
            let mut guard = stderr.lock();
            let _ = writeln!(guard, "{line}");
        }
    }
}

// ============================================================================
// SECTION: Noop Sink
// ============================================================================

/// Sink discarding every event.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &Event) {}
}
