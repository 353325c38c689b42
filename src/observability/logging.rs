//! Diagnostic logging.
//!
//! Logs go to stderr so `run` can stream JSONL events on stdout. Lines are
//! stamped with time since startup, which reads directly against the
//! choreography's millisecond offsets. `STAGEHAND_LOG_LEVEL` replaces the
//! verbosity-derived filter entirely.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::uptime;

use crate::cli::args::ColorChoice;

const LOG_LEVEL_ENV: &str = "STAGEHAND_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Builds the filter used when `STAGEHAND_LOG_LEVEL` is unset.
///
/// Each `-v` opens up the crate's own targets one level before anything
/// else. At `-vv` gate transitions and unlocks are visible while the bus
/// still hides its per-publish chatter; `-vvv` shows subscriptions too.
#[must_use]
pub const fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,stagehand=info",
        2 => "info,stagehand=debug,stagehand::bus=info",
        _ => "debug,stagehand=trace",
    }
}

fn use_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(uptime())
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Human => builder.with_ansi(use_ansi(color)).try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, verbosity, "logging initialized");
    }
}
