//! Navigation unlock tracker
//!
//! Tracks which sections are reachable from navigation and which one is
//! active. A section becomes reachable when its readiness signal is
//! observed on the bus; the set only ever grows.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::bus::{ReadinessBus, Subscription};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::signal::{SectionId, Signal};

/// How much of a section currently intersects the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionVisibility {
    /// Observed section.
    pub section: SectionId,
    /// Visible fraction in `0.0..=1.0`.
    pub ratio: f64,
}

impl SectionVisibility {
    /// Creates a visibility observation.
    #[must_use]
    pub const fn new(section: SectionId, ratio: f64) -> Self {
        Self { section, ratio }
    }
}

#[derive(Debug)]
struct NavState {
    unlocked: IndexSet<SectionId>,
    active: SectionId,
}

/// Unlocked and active navigation targets for one page.
#[derive(Debug)]
pub struct NavigationTracker {
    state: Mutex<NavState>,
    emitter: Arc<EventEmitter>,
}

impl Default for NavigationTracker {
    fn default() -> Self {
        Self::new(SectionId::About, Arc::new(EventEmitter::noop()))
    }
}

impl NavigationTracker {
    /// Creates a tracker with `first` unlocked and active.
    #[must_use]
    pub fn new(first: SectionId, emitter: Arc<EventEmitter>) -> Self {
        let mut unlocked = IndexSet::new();
        unlocked.insert(first);
        metrics::set_sections_unlocked(unlocked.len());
        Self {
            state: Mutex::new(NavState {
                unlocked,
                active: first,
            }),
            emitter,
        }
    }

    /// Subscribes to every readiness signal on `bus`.
    ///
    /// The tracker stays subscribed for as long as the returned
    /// subscriptions are alive.
    #[must_use]
    pub fn attach(self: &Arc<Self>, bus: &Arc<ReadinessBus>) -> Vec<Subscription> {
        Signal::ALL
            .iter()
            .map(|&signal| {
                let tracker = Arc::downgrade(self);
                bus.subscribe(signal, move |signal| {
                    if let Some(tracker) = tracker.upgrade() {
                        tracker.on_signal(signal);
                    }
                })
            })
            .collect()
    }

    /// Unlocks the section announced by `signal`.
    ///
    /// Returns `true` if the section was newly unlocked.
    pub fn on_signal(&self, signal: Signal) -> bool {
        let section = signal.section();
        let count = {
            let mut state = self.lock();
            if !state.unlocked.insert(section) {
                trace!(%section, "section already unlocked");
                return false;
            }
            state.unlocked.len()
        };

        debug!(%section, %signal, "section unlocked");
        metrics::set_sections_unlocked(count);
        self.emitter.emit(Event::SectionUnlocked {
            timestamp: Utc::now(),
            section,
        });
        true
    }

    /// Returns the unlocked sections in unlock order.
    #[must_use]
    pub fn unlocked_set(&self) -> Vec<SectionId> {
        self.lock().unlocked.iter().copied().collect()
    }

    /// Returns `true` if `section` can be navigated to.
    #[must_use]
    pub fn is_unlocked(&self, section: SectionId) -> bool {
        self.lock().unlocked.contains(&section)
    }

    /// Returns the active section.
    #[must_use]
    pub fn active_id(&self) -> SectionId {
        self.lock().active
    }

    /// Activates `section` on a navigation click.
    ///
    /// Locked sections are ignored. Returns `true` if `section` is active
    /// afterwards.
    pub fn navigate(&self, section: SectionId) -> bool {
        if !self.is_unlocked(section) {
            debug!(%section, "navigation to locked section ignored");
            return false;
        }
        self.activate(section);
        true
    }

    /// Activates the unlocked section with the largest visible ratio.
    ///
    /// Ties go to the section observed first. Returns the newly active
    /// section, or `None` when nothing unlocked intersects the viewport.
    pub fn observe_viewport(&self, visibilities: &[SectionVisibility]) -> Option<SectionId> {
        let best = {
            let state = self.lock();
            visibilities
                .iter()
                .filter(|v| v.ratio > 0.0 && state.unlocked.contains(&v.section))
                .fold(None::<&SectionVisibility>, |best, v| match best {
                    Some(b) if b.ratio >= v.ratio => Some(b),
                    _ => Some(v),
                })
                .map(|v| v.section)
        }?;
        self.activate(best);
        Some(best)
    }

    fn activate(&self, section: SectionId) {
        {
            let mut state = self.lock();
            if state.active == section {
                return;
            }
            state.active = section;
        }
        debug!(%section, "section activated");
        self.emitter.emit(Event::SectionActivated {
            timestamp: Utc::now(),
            section,
        });
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
