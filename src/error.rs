//! Error types for `stagehand`
//!
//! Choreography itself never fails: missing signals, duplicate publishes
//! and teardown races are absorbed inside the gates. The errors here cover
//! the ambient surface (configuration loading, I/O, CLI) and map onto
//! process exit codes.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `stagehand` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `stagehand` operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid command-line usage that clap could not catch
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run interrupted by Ctrl+C before the page settled
    #[error("interrupted")]
    Interrupted,
}

impl StagehandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Interrupted => ExitCode::INTERRUPTED,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path (or origin label) of the configuration
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path (or origin label) of the configuration
        path: String,
        /// Every error-severity issue found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exists but could not be read as UTF-8 text
    #[error("cannot read {path}: {source}")]
    Unreadable {
        /// Path to the file
        path: PathBuf,
        /// Underlying read failure
        #[source]
        source: std::io::Error,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no issues".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g. `"gates[2].trigger"`)
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl ValidationIssue {
    /// Creates an error-severity issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-severity issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Informational; the configuration still loads
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_per_variant() {
        let config = StagehandError::Config(ConfigError::MissingFile {
            path: PathBuf::from("missing.yaml"),
        });
        assert_eq!(config.exit_code(), ExitCode::CONFIG_ERROR);

        let io = StagehandError::Io(std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), ExitCode::IO_ERROR);

        let unreadable = StagehandError::Config(ConfigError::Unreadable {
            path: PathBuf::from("page.yaml"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(unreadable.exit_code(), ExitCode::CONFIG_ERROR);

        let usage = StagehandError::Usage("bad".to_string());
        assert_eq!(usage.exit_code(), ExitCode::USAGE_ERROR);

        assert_eq!(
            StagehandError::Interrupted.exit_code(),
            ExitCode::INTERRUPTED
        );
    }

    #[test]
    fn validation_issue_display() {
        let issue = ValidationIssue::warning("gates[1].fallback", "fallback is ignored");
        assert_eq!(
            issue.to_string(),
            "warning: fallback is ignored at gates[1].fallback"
        );
    }

    #[test]
    fn validation_error_summarizes_issues() {
        let err = ConfigError::ValidationError {
            path: "page.yaml".to_string(),
            errors: vec![
                ValidationIssue::error("gates", "no gates configured"),
                ValidationIssue::error("gates[0]", "duplicate section"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("no gates configured"));
        assert!(msg.contains("and 1 more"));
    }

    #[test]
    fn config_error_is_transparent() {
        let err: StagehandError = ConfigError::InvalidValue {
            field: "file_size".to_string(),
            value: "2 bytes".to_string(),
            expected: "at most 1 bytes".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("invalid value for 'file_size'"));
    }
}
