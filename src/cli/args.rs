//! CLI argument definitions
//!
//! All Clap derive structs for `stagehand` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Staged section reveals driven by readiness signals and fallback timers.
#[derive(Parser, Debug)]
#[command(name = "stagehand", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "STAGEHAND_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: LogFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mount a page and play its choreography in real time.
    Run(RunArgs),

    /// Validate choreography files without running them.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a YAML choreography; the built-in one is used when omitted.
    #[arg(short, long, env = "STAGEHAND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Count signals without delivering them, so every gate falls back.
    #[arg(long)]
    pub silent_bus: bool,

    /// Write JSONL events to this file.
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Unmount after this long even if gates are still pending (e.g. `30s`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Choreography files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["stagehand", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(!args.silent_bus);
        assert_eq!(args.timeout, None);
        assert_eq!(cli.log_format, LogFormat::Human);
    }

    #[test]
    fn test_run_with_options() {
        let cli = Cli::try_parse_from([
            "stagehand",
            "run",
            "--config",
            "page.yaml",
            "--silent-bus",
            "--timeout",
            "30s",
            "--metrics-port",
            "9100",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, Some(PathBuf::from("page.yaml")));
        assert!(args.silent_bus);
        assert_eq!(args.timeout, Some(Duration::from_secs(30)));
        assert_eq!(args.metrics_port, Some(9100));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let result = Cli::try_parse_from(["stagehand", "run", "--timeout", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_files() {
        let result = Cli::try_parse_from(["stagehand", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_strict_json() {
        let cli = Cli::try_parse_from([
            "stagehand", "validate", "a.yaml", "b.yaml", "--strict", "--format", "json",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.strict);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["stagehand", "version", "-vv", "--color", "never"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["stagehand", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
