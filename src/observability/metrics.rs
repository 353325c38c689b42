//! Metrics collection for `stagehand`.
//!
//! Prometheus-compatible metrics with typed convenience functions. Every
//! label value comes from the closed signal/section/state vocabularies, so
//! label cardinality is bounded without sanitization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StagehandError;
use crate::gate::{GateState, TriggerCause};
use crate::signal::{SectionId, Signal};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `StagehandError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), StagehandError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| StagehandError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "stagehand_gate_transitions_total",
        "Total number of gate state transitions"
    );
    describe_counter!(
        "stagehand_gate_triggers_total",
        "Gate triggers by cause (immediate, signal, fallback)"
    );
    describe_histogram!(
        "stagehand_gate_reveal_ms",
        "Time from gate mount to DONE in milliseconds"
    );
    describe_counter!(
        "stagehand_signals_published_total",
        "Total number of signals published on the readiness bus"
    );
    describe_gauge!(
        "stagehand_sections_unlocked",
        "Number of unlocked navigation targets"
    );
}

/// Records a gate state transition.
pub fn record_gate_transition(section: SectionId, to: GateState) {
    counter!(
        "stagehand_gate_transitions_total",
        "section" => section.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Records what moved a gate out of `ARMED`.
pub fn record_gate_trigger(section: SectionId, cause: &TriggerCause) {
    counter!(
        "stagehand_gate_triggers_total",
        "section" => section.as_str(),
        "cause" => cause.kind()
    )
    .increment(1);
}

/// Records the mount-to-done latency of a gate.
pub fn record_gate_reveal(section: SectionId, elapsed: Duration) {
    histogram!("stagehand_gate_reveal_ms", "section" => section.as_str())
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Records a publish on the readiness bus.
pub fn record_signal_published(signal: Signal) {
    counter!("stagehand_signals_published_total", "signal" => signal.as_str()).increment(1);
}

/// Sets the unlocked navigation target gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_sections_unlocked(count: usize) {
    gauge!("stagehand_sections_unlocked").set(count as f64);
}
