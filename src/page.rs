//! Page composition
//!
//! A [`Page`] owns everything one page lifetime needs: the readiness bus,
//! the navigation tracker and one gate per configured section. Nothing is
//! global, so several pages can be mounted side by side (tests do).

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bus::{BusMode, ReadinessBus, Subscription};
use crate::config::ChoreographyConfig;
use crate::gate::{GateHandle, GateState, SectionGate};
use crate::nav::NavigationTracker;
use crate::observability::{Event, EventEmitter};
use crate::signal::SectionId;

/// A mounted page.
#[derive(Debug)]
pub struct Page {
    id: Uuid,
    bus: Arc<ReadinessBus>,
    tracker: Arc<NavigationTracker>,
    gates: IndexMap<SectionId, GateHandle>,
    cancel: CancellationToken,
    nav_subscriptions: Vec<Subscription>,
    emitter: Arc<EventEmitter>,
}

impl Page {
    /// Mounts a page with a delivering bus.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn mount(config: &ChoreographyConfig, emitter: Arc<EventEmitter>) -> Self {
        Self::mount_with_mode(config, BusMode::Deliver, emitter)
    }

    /// Mounts a page whose bus runs in `mode`.
    ///
    /// The tracker subscribes before any gate, so it observes every
    /// completion signal. Gates are mounted in configuration order.
    #[must_use]
    pub fn mount_with_mode(
        config: &ChoreographyConfig,
        mode: BusMode,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        let id = Uuid::new_v4();
        let bus = ReadinessBus::with_mode(mode, Arc::clone(&emitter));
        let first = config.gates.first().map_or(SectionId::About, |g| g.section);
        let tracker = Arc::new(NavigationTracker::new(first, Arc::clone(&emitter)));
        let nav_subscriptions = tracker.attach(&bus);
        let cancel = CancellationToken::new();

        let gates: IndexMap<SectionId, GateHandle> = config
            .gates
            .iter()
            .map(|gate| {
                let handle =
                    SectionGate::mount(gate.clone(), &bus, &cancel, Arc::clone(&emitter));
                (handle.section(), handle)
            })
            .collect();

        info!(page_id = %id, gates = gates.len(), ?mode, "page mounted");
        emitter.emit(Event::PageMounted {
            timestamp: Utc::now(),
            page_id: id,
            sections: gates.keys().copied().collect(),
        });

        Self {
            id,
            bus,
            tracker,
            gates,
            cancel,
            nav_subscriptions,
            emitter,
        }
    }

    /// Returns the page instance id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the page's readiness bus.
    #[must_use]
    pub const fn bus(&self) -> &Arc<ReadinessBus> {
        &self.bus
    }

    /// Returns the navigation tracker.
    #[must_use]
    pub const fn tracker(&self) -> &Arc<NavigationTracker> {
        &self.tracker
    }

    /// Returns the gate for `section`, if mounted.
    #[must_use]
    pub fn gate(&self, section: SectionId) -> Option<&GateHandle> {
        self.gates.get(&section)
    }

    /// Returns every gate in mount order.
    pub fn gates(&self) -> impl Iterator<Item = &GateHandle> {
        self.gates.values()
    }

    /// Returns the sections whose gate has reached `DONE`.
    #[must_use]
    pub fn completed(&self) -> Vec<SectionId> {
        self.gates
            .values()
            .filter(|g| g.state() == GateState::Done)
            .map(GateHandle::section)
            .collect()
    }

    /// Waits until every gate has reached `DONE`.
    ///
    /// Returns `false` if the page is torn down first. Gates waiting on a
    /// signal without a fallback may keep this pending forever.
    pub async fn settled(&self) -> bool {
        join_all(self.gates.values().map(|g| g.reached(GateState::Done)))
            .await
            .into_iter()
            .all(|done| done)
    }

    /// Tears the page down.
    ///
    /// Every gate is cancelled, the bus is closed so no further signal is
    /// delivered, and all gate tasks are awaited.
    pub async fn unmount(mut self) {
        self.release();
        let completed = self.completed();
        let gates = std::mem::take(&mut self.gates);
        join_all(gates.into_values().map(GateHandle::unmount)).await;

        info!(page_id = %self.id, completed = completed.len(), "page unmounted");
        self.emitter.emit(Event::PageUnmounted {
            timestamp: Utc::now(),
            page_id: self.id,
            completed,
        });
    }

    fn release(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!(page_id = %self.id, "releasing page");
        self.cancel.cancel();
        self.bus.close();
        self.nav_subscriptions.clear();
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.release();
    }
}
