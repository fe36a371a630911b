//! # Validate Command
//!
//! Checks the arguments, runs [`DevTuningforkParser`] with the external
//! compiler, logs the findings and picks the exit code.
//!
//! ## Exit Codes
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success, or `--errorOnExit` not set                      |
//! | 1    | Validation errors were recorded                          |
//! | 2    | The run itself failed (I/O, compiler, missing schema)    |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use serde::Serialize;
use tuningfork_core::{DiagnosticSummary, ErrorCollector};
use tuningfork_schema::ExternalProtoCompiler;
use tuningfork_validation::{DevTuningforkParser, TuningforkError, ValidationOutcome};

pub const EXIT_VALIDATION_ERRORS: u8 = 1;
pub const EXIT_RUN_FAILED: u8 = 2;

/// Arguments of `tuningfork-validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Folder holding dev_tuningfork.proto, tuningfork_settings.txt and the
    /// dev_tuningfork_fidelityparams_*.txt files.
    #[arg(long = "tuningforkPath")]
    pub tuningfork_path: PathBuf,

    /// Path to the protoc executable.
    #[arg(long = "protoCompiler")]
    pub proto_compiler: PathBuf,

    /// Exit with a nonzero code when validation fails.
    #[arg(
        long = "errorOnExit",
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub error_on_exit: bool,

    /// Write a JSON summary of every finding to this file.
    #[arg(long = "reportPath")]
    pub report_path: Option<PathBuf>,
}

/// JSON written to `--reportPath`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    tuningfork_path: &'a Path,
    /// Set when the run stopped before all checks ran.
    failure: Option<String>,
    written: Vec<&'a Path>,
    #[serde(flatten)]
    summary: DiagnosticSummary,
}

/// Execute the validate command.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    check_arguments(args);

    let mut errors = ErrorCollector::new();
    let mut parser = DevTuningforkParser::new(
        &args.tuningfork_path,
        ExternalProtoCompiler::new(&args.proto_compiler),
    );
    let result = parser.validate(&mut errors);
    errors.log_status();

    let failure = match &result {
        Ok(outcome) => {
            log_outcome(outcome);
            None
        }
        Err(e) => {
            tracing::error!(stage = %parser.stage(), "{e}");
            Some(e)
        }
    };

    if let Some(report_path) = &args.report_path {
        let outcome = result.as_ref().ok();
        write_report(report_path, args, failure, outcome, &errors)?;
    }

    let code = if failure.is_some() {
        EXIT_RUN_FAILED
    } else if errors.error_count() > 0 {
        EXIT_VALIDATION_ERRORS
    } else {
        tracing::info!("Tuning Fork folder is valid");
        0
    };
    Ok(if args.error_on_exit { code } else { 0 })
}

/// Pre-flight checks. Problems are logged; the run goes ahead and fails
/// where the missing piece is needed.
fn check_arguments(args: &ValidateArgs) {
    if args.tuningfork_path.is_dir() {
        tracing::info!(path = %args.tuningfork_path.display(), "Tuning Fork folder exists: OK");
    } else {
        tracing::error!(
            path = %args.tuningfork_path.display(),
            "Tuning Fork folder does not exist or is not a directory"
        );
    }

    let compiler = &args.proto_compiler;
    if !compiler.is_file() {
        tracing::error!(path = %compiler.display(), "Proto compiler does not exist");
    } else if !is_executable(compiler) {
        tracing::error!(path = %compiler.display(), "Proto compiler is not executable");
    } else {
        tracing::info!(path = %compiler.display(), "Proto compiler exists: OK");
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn log_outcome(outcome: &ValidationOutcome) {
    tracing::info!(path = %outcome.descriptor.display(), "descriptor written");
    if let Some(settings) = &outcome.settings_binary {
        tracing::info!(path = %settings.display(), "settings binary written");
    }
    tracing::info!(
        count = outcome.fidelity_binaries.len(),
        "fidelity parameter binaries written"
    );
}

fn write_report(
    report_path: &Path,
    args: &ValidateArgs,
    failure: Option<&TuningforkError>,
    outcome: Option<&ValidationOutcome>,
    errors: &ErrorCollector,
) -> Result<()> {
    let written: Vec<&Path> = outcome
        .map(|o| {
            std::iter::once(o.descriptor.as_path())
                .chain(o.settings_binary.as_deref())
                .chain(o.fidelity_binaries.iter().map(PathBuf::as_path))
                .collect()
        })
        .unwrap_or_default();
    let report = Report {
        tuningfork_path: &args.tuningfork_path,
        failure: failure.map(ToString::to_string),
        written,
        summary: errors.summary(),
    };
    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    fs::write(report_path, json)
        .with_context(|| format!("writing report to {}", report_path.display()))?;
    tracing::info!(path = %report_path.display(), "report written");
    Ok(())
}
