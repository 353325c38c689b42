//! Section gate orchestration
//!
//! A mounted gate is one tokio task that walks
//! `ARMED -> TYPING -> REVEALED -> DONE` and publishes its completion signal
//! on the way into `DONE`. Every await point is bounded by the gate's
//! cancellation token, so teardown at any stage releases the listener and
//! timers and prevents any later publish.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bus::ReadinessBus;
use crate::config::GateConfig;
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::signal::SectionId;

use super::state::{GateSnapshot, GateState, GateStatus, GateTransition, TriggerCause};
use super::trigger::Arming;
use super::typewriter::type_out;

/// One section's reveal lifecycle.
pub struct SectionGate {
    config: Arc<GateConfig>,
    bus: Arc<ReadinessBus>,
    status: Arc<GateStatus>,
    cancel: CancellationToken,
    emitter: Arc<EventEmitter>,
}

impl SectionGate {
    /// Mounts a gate: creates it in `ARMED`, subscribes to its trigger
    /// signal and spawns the task that drives it.
    ///
    /// Must be called from within a tokio runtime. The gate is cancelled
    /// when `parent` is cancelled or when [`GateHandle::cancel`] is called.
    #[must_use]
    pub fn mount(
        config: GateConfig,
        bus: &Arc<ReadinessBus>,
        parent: &CancellationToken,
        emitter: Arc<EventEmitter>,
    ) -> GateHandle {
        let status = Arc::new(GateStatus::new(config.section));
        let arming = Arming::new(
            bus,
            config.trigger,
            config.trigger_delay,
            config.fallback,
            status.mounted_at(),
        );
        let cancel = parent.child_token();

        debug!(
            section = %config.section,
            trigger = ?config.trigger,
            buffer = ?config.trigger_delay,
            fallback = ?config.fallback,
            "gate armed"
        );

        let gate = Self {
            config: Arc::new(config),
            bus: Arc::clone(bus),
            status: Arc::clone(&status),
            cancel: cancel.clone(),
            emitter,
        };
        let section = gate.config.section;
        let task = tokio::spawn(gate.run(arming));

        GateHandle {
            section,
            status,
            cancel,
            task,
        }
    }

    async fn run(self, arming: Arming) {
        if self.choreograph(arming).await.is_none() {
            debug!(
                section = %self.config.section,
                state = %self.status.state(),
                "gate torn down"
            );
        }
    }

    /// Drives the gate to `DONE`. Returns `None` if cancelled first.
    async fn choreograph(&self, arming: Arming) -> Option<()> {
        let config = &self.config;

        // ARMED -> TYPING
        let cause = self.cancel.run_until_cancelled(arming.resolve()).await?;
        metrics::record_gate_trigger(config.section, &cause);
        self.advance(GateState::Armed, Some(cause))?;

        // TYPING -> REVEALED
        let status = &self.status;
        self.cancel
            .run_until_cancelled(type_out(&config.header, config.typing_interval, |prefix| {
                status.set_header(prefix);
            }))
            .await?;
        self.advance(GateState::Typing, None)?;

        // REVEALED -> DONE
        self.cancel
            .run_until_cancelled(tokio::time::sleep(config.post_typing_delay))
            .await?;
        if self.cancel.is_cancelled() {
            return None;
        }
        self.advance(GateState::Revealed, None)?;
        metrics::record_gate_reveal(config.section, self.status.mounted_at().elapsed());

        if let Some(signal) = config.completion {
            self.bus.publish(signal);
        }
        Some(())
    }

    fn advance(&self, from: GateState, cause: Option<TriggerCause>) -> Option<GateTransition> {
        let transition = self.status.try_advance(from, cause)?;
        let elapsed_ms = u64::try_from(transition.elapsed.as_millis()).unwrap_or(u64::MAX);

        match transition.cause {
            Some(cause) => info!(
                section = %transition.section,
                from = %transition.from,
                to = %transition.to,
                %cause,
                elapsed_ms,
                "gate transition"
            ),
            None => info!(
                section = %transition.section,
                from = %transition.from,
                to = %transition.to,
                elapsed_ms,
                "gate transition"
            ),
        }

        metrics::record_gate_transition(transition.section, transition.to);
        self.emitter.emit(Event::GateTransitioned {
            timestamp: Utc::now(),
            section: transition.section,
            from: transition.from,
            to: transition.to,
            cause: transition.cause,
            elapsed_ms,
        });
        Some(transition)
    }
}

/// Handle to a mounted gate.
#[derive(Debug)]
pub struct GateHandle {
    section: SectionId,
    status: Arc<GateStatus>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl GateHandle {
    /// Returns the gate's section.
    #[must_use]
    pub const fn section(&self) -> SectionId {
        self.section
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.status.state()
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        self.status.snapshot()
    }

    /// Returns every transition so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<GateTransition> {
        self.status.history()
    }

    /// Returns when the gate was mounted.
    #[must_use]
    pub fn mounted_at(&self) -> Instant {
        self.status.mounted_at()
    }

    /// Returns a receiver observing snapshot changes.
    #[must_use]
    pub fn watch(&self) -> tokio::sync::watch::Receiver<GateSnapshot> {
        self.status.watch()
    }

    /// Waits until the gate reaches `target` (or any later state).
    ///
    /// Returns `false` if the gate was torn down before getting there.
    pub async fn reached(&self, target: GateState) -> bool {
        let mut rx = self.status.watch();
        let cancel = self.cancel.clone();
        tokio::select! {
            res = rx.wait_for(|snap| snap.state >= target) => res.is_ok(),
            () = cancel.cancelled() => self.status.state() >= target,
        }
    }

    /// Returns whether the gate has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the gate. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels the gate and waits for its task to finish.
    pub async fn unmount(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
