//! CLI entry point and dispatch logic.
//!
//! `run()` parses arguments, loads configuration, builds the tokio runtime
//! and hands off to the orchestrator. It owns all terminal output: the run
//! summary goes to stdout, diagnostics and errors to stderr, and failures
//! come back as the process exit code for `main` to apply.

use std::collections::BTreeSet;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use super::args::{Cli, Commands};
use crate::config::Config;
use crate::error::ForgeError;
use crate::exit_codes::error_to_exit_code;
use crate::logging::init_tracing;
use crate::orchestrator::Orchestrator;
use crate::runner::tool_available;
use crate::types::RunResult;

/// Parse arguments, run the pipeline, report the outcome.
pub fn run() -> Result<(), i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Commands::Run(args) = cli.command;
    let overrides = args.overrides(cli.config.clone(), cli.verbose);

    let config = match Config::load(&overrides) {
        Ok(config) => Arc::new(config),
        Err(err) => return Err(report_error(&ForgeError::Config(err))),
    };

    preflight_toolchain(&config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = ForgeError::Internal(format!("failed to create async runtime: {e}"));
            return Err(report_error(&err));
        }
    };

    // Resolves provider API keys; missing keys fail here, before any phase.
    let orchestrator = match Orchestrator::new(Arc::clone(&config)) {
        Ok(orchestrator) => orchestrator,
        Err(err) => return Err(report_error(&err)),
    };

    match runtime.block_on(orchestrator.run()) {
        Ok(result) => {
            print_summary(&result);
            Ok(())
        }
        Err(err) => Err(report_error(&err)),
    }
}

/// Warn up front about tools the validation and test phases will not find.
/// The run proceeds either way; the tool output itself lands in the
/// validation errors.
fn preflight_toolchain(config: &Config) {
    let toolchain = &config.toolchain;
    let commands: BTreeSet<&str> = [
        toolchain.go.as_str(),
        toolchain.format.command.as_str(),
        toolchain.vet.command.as_str(),
        toolchain.lint.command.as_str(),
        toolchain.security.command.as_str(),
        toolchain.test.command.as_str(),
    ]
    .into_iter()
    .collect();

    for command in commands {
        if !tool_available(command) {
            warn!(%command, "tool not found on PATH");
        }
    }
}

fn print_summary(result: &RunResult) {
    let elapsed = result.completed_at - result.started_at;
    println!("Pipeline complete.");
    println!("  metrics researched: {}", result.research.metrics.len());
    println!("  source files:       {}", result.code.files.len());
    println!(
        "  tests:              {}",
        if result.test_result.passed {
            "passed"
        } else {
            "failed (diagnosis in log)"
        }
    );
    println!("  files written:      {}", result.written_files.len());
    println!("  elapsed:            {}s", elapsed.num_seconds());
}

fn report_error(err: &ForgeError) -> i32 {
    eprintln!("Error: {err}");
    for suggestion in err.suggestions() {
        eprintln!("  hint: {suggestion}");
    }
    error_to_exit_code(err)
}
