//! `run` command
//!
//! Mounts a page in real time and waits until every gate is done, the
//! timeout expires or the user interrupts.

use std::sync::Arc;
use std::time::Duration;

use crate::bus::BusMode;
use crate::cli::args::RunArgs;
use crate::config::load_or_default;
use crate::error::StagehandError;
use crate::observability::EventEmitter;
use crate::page::Page;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Settled,
    TimedOut,
    Interrupted,
}

/// Play the choreography.
///
/// # Errors
///
/// Returns a usage error for a zero `--timeout`, a config error if the
/// choreography cannot be loaded, an I/O
/// error if the events file or metrics listener cannot be opened, and
/// `StagehandError::Interrupted` on Ctrl+C.
pub async fn run(args: &RunArgs) -> Result<(), StagehandError> {
    if args.timeout.is_some_and(|limit| limit.is_zero()) {
        return Err(StagehandError::Usage(
            "--timeout must be greater than zero".to_string(),
        ));
    }

    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    if let Some(path) = &args.config {
        tracing::info!(config = %path.display(), "loading choreography");
    }
    let loaded = load_or_default(args.config.as_ref())?;
    if let Some(worst) = loaded.config.worst_case_reveal() {
        tracing::info!(worst_case = ?worst, "page self-reveals without signals");
    }

    let emitter = match &args.events {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };
    let mode = if args.silent_bus {
        BusMode::Silent
    } else {
        BusMode::Deliver
    };

    let page = Page::mount_with_mode(&loaded.config, mode, Arc::new(emitter));
    let outcome = play(&page, args.timeout).await;

    let pending: Vec<String> = page
        .gates()
        .filter(|g| g.state() != crate::gate::GateState::Done)
        .map(|g| g.section().to_string())
        .collect();
    let unlocked = page.tracker().unlocked_set();
    page.unmount().await;

    match outcome {
        Outcome::Settled => {
            tracing::info!(unlocked = unlocked.len(), "every section revealed");
            Ok(())
        }
        Outcome::TimedOut => {
            tracing::warn!(pending = ?pending, "timed out before every section was revealed");
            Ok(())
        }
        Outcome::Interrupted => Err(StagehandError::Interrupted),
    }
}

async fn play(page: &Page, timeout: Option<Duration>) -> Outcome {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        settled = page.settled() => {
            if settled { Outcome::Settled } else { Outcome::Interrupted }
        }
        () = deadline => Outcome::TimedOut,
        _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChoreographyConfig;
    use crate::gate::GateState;
    use crate::signal::SectionId;

    #[tokio::test]
    async fn zero_timeout_is_rejected_before_mounting() {
        let args = RunArgs {
            config: None,
            silent_bus: false,
            events: None,
            metrics_port: None,
            timeout: Some(Duration::ZERO),
        };
        let err = run(&args).await.unwrap_err();
        assert!(matches!(err, StagehandError::Usage(_)));
        assert_eq!(err.exit_code(), crate::error::ExitCode::USAGE_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn play_settles_default_page() {
        let page = Page::mount(&ChoreographyConfig::default(), Arc::new(EventEmitter::noop()));
        assert_eq!(play(&page, None).await, Outcome::Settled);
        page.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn play_times_out_before_fallbacks() {
        let page = Page::mount(&ChoreographyConfig::default(), Arc::new(EventEmitter::noop()));
        assert_eq!(
            play(&page, Some(Duration::from_secs(5))).await,
            Outcome::TimedOut
        );
        assert_eq!(page.gate(SectionId::About).unwrap().state(), GateState::Done);
        assert_eq!(
            page.gate(SectionId::Experience).unwrap().state(),
            GateState::Armed
        );
        page.unmount().await;
    }
}
