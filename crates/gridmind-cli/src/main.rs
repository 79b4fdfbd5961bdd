#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// gridmind-cli/src/main.rs
// ============================================================================
// Module: Gridmind CLI Entry Point
// Description: Command dispatcher for the training core.
// Purpose: Serve the platform and run offline feature/config utilities.
// Dependencies: clap, gridmind-api, gridmind-config, tokio
// ============================================================================

//! ## Overview
//! The CLI builds the platform from configuration and either serves the
//! HTTP API or runs one offline task. Exit codes follow the platform
//! contract: 0 success, 1 invalid usage, 2 configuration error, 3 external
//! dependency unavailable, 4 job failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use gridmind_api::Platform;
use gridmind_api::StderrEventSink;
use gridmind_config::GridmindConfig;
use gridmind_core::ErrorKind;
use gridmind_core::PlatformError;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Successful run.
const EXIT_OK: u8 = 0;
/// Invalid usage or arguments.
const EXIT_USAGE: u8 = 1;
/// Configuration error.
const EXIT_CONFIG: u8 = 2;
/// External dependency unavailable.
const EXIT_UNAVAILABLE: u8 = 3;
/// Job or task failed.
const EXIT_JOB_FAILED: u8 = 4;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "gridmind", version, about = "Gridmind training core")]
struct Cli {
    /// Optional config file path (defaults to gridmind.toml or env override).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API with the dispatch loop running.
    Serve,
    /// Validate the configuration file and exit.
    ValidateConfig,
    /// Export a feature set to a Parquet file.
    ExportFeatures(ExportFeaturesCommand),
}

/// Arguments for the offline feature export.
#[derive(Args, Debug)]
struct ExportFeaturesCommand {
    /// Owning tenant.
    #[arg(long)]
    tenant_id: String,
    /// Feature set name.
    #[arg(long)]
    feature_set: String,
    /// Window start in unix milliseconds.
    #[arg(long)]
    start_millis: i64,
    /// Window end in unix milliseconds.
    #[arg(long)]
    end_millis: i64,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match GridmindConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return fail(EXIT_CONFIG, &format!("configuration error: {err}")),
    };
    match cli.command {
        Commands::ValidateConfig => {
            emit("configuration is valid");
            ExitCode::from(EXIT_OK)
        }
        Commands::Serve => run_serve(config),
        Commands::ExportFeatures(command) => run_export(config, &command),
    }
}

/// Runs the API server until interrupted.
fn run_serve(config: GridmindConfig) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => return fail(EXIT_UNAVAILABLE, &format!("runtime error: {err}")),
    };
    runtime.block_on(async {
        let platform = match Platform::build(config, Arc::new(StderrEventSink)) {
            Ok(platform) => Arc::new(platform),
            Err(err) => return platform_exit(&err),
        };
        platform.start();
        let serve = gridmind_api::routes::serve(Arc::clone(&platform));
        let outcome = tokio::select! {
            result = serve => result,
            _ = tokio::signal::ctrl_c() => Ok(()),
        };
        platform.shutdown();
        match outcome {
            Ok(()) => ExitCode::from(EXIT_OK),
            Err(err) => platform_exit(&err),
        }
    })
}

/// Runs one offline feature export.
fn run_export(config: GridmindConfig, command: &ExportFeaturesCommand) -> ExitCode {
    if command.end_millis <= command.start_millis {
        return fail(EXIT_USAGE, "end_millis must be after start_millis");
    }
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => return fail(EXIT_UNAVAILABLE, &format!("runtime error: {err}")),
    };
    runtime.block_on(async {
        let platform = match Platform::build(config, Arc::new(StderrEventSink)) {
            Ok(platform) => platform,
            Err(err) => return platform_exit(&err),
        };
        let result = platform.features.export_to_parquet(
            &TenantId::from(command.tenant_id.as_str()),
            &command.feature_set,
            Timestamp::from_unix_millis(command.start_millis),
            Timestamp::from_unix_millis(command.end_millis),
            &[],
        );
        match result {
            Ok(export) => {
                emit(&serde_json::to_string(&export).unwrap_or_default());
                ExitCode::from(EXIT_OK)
            }
            Err(err) => platform_exit(&err),
        }
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a platform error to the exit-code contract.
fn platform_exit(err: &PlatformError) -> ExitCode {
    let code = match err.kind() {
        ErrorKind::Validation => EXIT_USAGE,
        ErrorKind::Unavailable => EXIT_UNAVAILABLE,
        ErrorKind::NotFound
        | ErrorKind::Conflict
        | ErrorKind::Precondition
        | ErrorKind::Timeout
        | ErrorKind::Internal => EXIT_JOB_FAILED,
    };
    fail(code, &err.to_string())
}

/// Writes a failure line to stderr and returns the exit code.
fn fail(code: u8, message: &str) -> ExitCode {
    let stderr = std::io::stderr();
    let mut guard = stderr.lock();
    let _ = writeln!(guard, "gridmind: {message}");
    ExitCode::from(code)
}

/// Writes an informational line to stdout.
fn emit(message: &str) {
    let stdout = std::io::stdout();
    let mut guard = stdout.lock();
    let _ = writeln!(guard, "{message}");
}
