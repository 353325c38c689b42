//! `validate` command
//!
//! Loads each file through the regular loader and reports every issue.
//! All files are checked even when an earlier one fails; the first failure
//! decides the exit code.

use std::path::Path;

use serde_json::{Value, json};

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadResult};
use crate::error::{ConfigError, StagehandError, ValidationIssue};

/// Validate choreography files without running them.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, or the first config
/// error found across all files.
pub fn run(args: &ValidateArgs) -> Result<(), StagehandError> {
    let loader = ConfigLoader::new().strict(args.strict);
    let mut first_error: Option<StagehandError> = None;
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        if !path.exists() {
            return Err(StagehandError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating choreography");

        let outcome = loader.load(path);
        match args.format {
            OutputFormat::Human => print_human(path, &outcome),
            OutputFormat::Json => reports.push(report_json(path, &outcome)),
        }
        if let Err(e) = outcome
            && first_error.is_none()
        {
            first_error = Some(e.into());
        }
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&Value::Array(reports))?);
    }

    first_error.map_or(Ok(()), Err)
}

fn print_human(path: &Path, outcome: &Result<LoadResult, ConfigError>) {
    match outcome {
        Ok(result) => {
            println!(
                "{}: ok ({} gates, {} warnings)",
                path.display(),
                result.config.gates.len(),
                result.warnings.len()
            );
            for warning in &result.warnings {
                println!("  {warning}");
            }
        }
        Err(ConfigError::ValidationError { errors, .. }) => {
            println!("{}: invalid", path.display());
            for issue in errors {
                println!("  {issue}");
            }
        }
        Err(e) => println!("{}: {e}", path.display()),
    }
}

fn report_json(path: &Path, outcome: &Result<LoadResult, ConfigError>) -> Value {
    let file = path.display().to_string();
    match outcome {
        Ok(result) => json!({
            "file": file,
            "valid": true,
            "gates": result.config.gates.len(),
            "errors": [],
            "warnings": issues_json(&result.warnings),
        }),
        Err(ConfigError::ValidationError { errors, .. }) => json!({
            "file": file,
            "valid": false,
            "errors": issues_json(errors),
            "warnings": [],
        }),
        Err(e) => json!({
            "file": file,
            "valid": false,
            "errors": [{ "path": "", "message": e.to_string() }],
            "warnings": [],
        }),
    }
}

fn issues_json(issues: &[ValidationIssue]) -> Value {
    issues
        .iter()
        .map(|i| json!({ "path": i.path, "message": i.message }))
        .collect()
}
