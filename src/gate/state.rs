//! Gate state representation
//!
//! A gate's lifecycle is a strictly forward chain
//! `ARMED -> TYPING -> REVEALED -> DONE`. [`GateStatus`] owns the current
//! [`GateSnapshot`] behind a `watch` channel and only ever moves it one step
//! forward through a compare-and-set, so observers see a monotonic sequence
//! and every transition happens exactly once.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::signal::{SectionId, Signal};

/// Lifecycle state of a section gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    /// Hidden, waiting for the trigger signal or fallback timer.
    Armed,
    /// Header characters are being revealed.
    Typing,
    /// Header fully typed, content visible.
    Revealed,
    /// Completion signal published (if any); terminal.
    Done,
}

impl GateState {
    /// Returns the state that follows this one, or `None` for `DONE`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Armed => Some(Self::Typing),
            Self::Typing => Some(Self::Revealed),
            Self::Revealed => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns the upper-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Armed => "ARMED",
            Self::Typing => "TYPING",
            Self::Revealed => "REVEALED",
            Self::Done => "DONE",
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What moved a gate out of `ARMED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerCause {
    /// The gate has no trigger signal and started at mount.
    Immediate,
    /// The upstream signal arrived before the fallback deadline.
    Signal {
        /// Signal that fired.
        signal: Signal,
    },
    /// The fallback deadline expired first.
    Fallback,
}

impl TriggerCause {
    /// Returns the cause kind as a static label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Signal { .. } => "signal",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal { signal } => write!(f, "signal '{signal}'"),
            other => f.write_str(other.kind()),
        }
    }
}

/// Observable view of a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Current lifecycle state.
    pub state: GateState,
    /// Header prefix revealed so far.
    pub header: String,
    /// Whether the section content (cards, grid, carousel) is visible.
    pub content_visible: bool,
    /// What triggered the gate, once it has left `ARMED`.
    pub cause: Option<TriggerCause>,
}

impl GateSnapshot {
    const fn armed() -> Self {
        Self {
            state: GateState::Armed,
            header: String::new(),
            content_visible: false,
            cause: None,
        }
    }
}

/// Record of one forward transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateTransition {
    /// Gate that moved.
    pub section: SectionId,
    /// State left.
    pub from: GateState,
    /// State entered.
    pub to: GateState,
    /// Time since the gate was mounted.
    pub elapsed: Duration,
    /// Trigger cause, set on the `ARMED -> TYPING` edge only.
    pub cause: Option<TriggerCause>,
}

/// Shared, observable state of one gate.
pub struct GateStatus {
    section: SectionId,
    mounted_at: Instant,
    snapshot: watch::Sender<GateSnapshot>,
    history: Mutex<Vec<GateTransition>>,
}

impl GateStatus {
    /// Creates a status in `ARMED`, timestamped now.
    #[must_use]
    pub fn new(section: SectionId) -> Self {
        let (snapshot, _) = watch::channel(GateSnapshot::armed());
        Self {
            section,
            mounted_at: Instant::now(),
            snapshot,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Returns the owning section.
    #[must_use]
    pub const fn section(&self) -> SectionId {
        self.section
    }

    /// Returns when the gate was mounted.
    #[must_use]
    pub const fn mounted_at(&self) -> Instant {
        self.mounted_at
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.snapshot.borrow().state
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Returns a receiver that observes every snapshot change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<GateSnapshot> {
        self.snapshot.subscribe()
    }

    /// Returns every transition recorded so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<GateTransition> {
        self.lock_history().clone()
    }

    /// Attempts to move from `from` to its successor.
    ///
    /// Succeeds only if the gate is currently in `from`, so a transition
    /// can neither repeat nor skip a state. Entering `TYPING` records
    /// `cause`; entering `REVEALED` makes the content visible.
    ///
    /// Returns the recorded transition when this call won.
    pub fn try_advance(
        &self,
        from: GateState,
        cause: Option<TriggerCause>,
    ) -> Option<GateTransition> {
        let to = from.next()?;
        // Held across the CAS so history order matches snapshot order
        let mut history = self.lock_history();
        let advanced = self.snapshot.send_if_modified(|snap| {
            if snap.state != from {
                return false;
            }
            snap.state = to;
            if to == GateState::Typing {
                snap.cause = cause;
            }
            if to == GateState::Revealed {
                snap.content_visible = true;
            }
            true
        });
        if !advanced {
            return None;
        }

        let transition = GateTransition {
            section: self.section,
            from,
            to,
            elapsed: self.mounted_at.elapsed(),
            cause: if to == GateState::Typing { cause } else { None },
        };
        history.push(transition.clone());
        drop(history);
        Some(transition)
    }

    /// Publishes a newly revealed header prefix while `TYPING`.
    pub fn set_header(&self, prefix: &str) {
        self.snapshot.send_if_modified(|snap| {
            if snap.state != GateState::Typing || snap.header == prefix {
                return false;
            }
            prefix.clone_into(&mut snap.header);
            true
        });
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<GateTransition>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateStatus")
            .field("section", &self.section)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_status_is_armed() {
        let status = GateStatus::new(SectionId::Projects);
        let snap = status.snapshot();
        assert_eq!(snap.state, GateState::Armed);
        assert!(snap.header.is_empty());
        assert!(!snap.content_visible);
        assert!(snap.cause.is_none());
        assert!(status.history().is_empty());
    }

    #[test]
    fn test_state_order() {
        assert!(GateState::Armed < GateState::Typing);
        assert!(GateState::Typing < GateState::Revealed);
        assert!(GateState::Revealed < GateState::Done);
        assert_eq!(GateState::Done.next(), None);
    }

    #[test]
    fn test_cas_advance_success() {
        let status = GateStatus::new(SectionId::Experience);
        let t = status
            .try_advance(GateState::Armed, Some(TriggerCause::Fallback))
            .unwrap();
        assert_eq!(t.from, GateState::Armed);
        assert_eq!(t.to, GateState::Typing);
        assert_eq!(t.cause, Some(TriggerCause::Fallback));
        assert_eq!(status.state(), GateState::Typing);
    }

    #[test]
    fn test_cas_advance_from_wrong_state_fails() {
        let status = GateStatus::new(SectionId::Experience);
        assert!(status.try_advance(GateState::Typing, None).is_none());
        assert_eq!(status.state(), GateState::Armed);
    }

    #[test]
    fn test_second_trigger_is_inert() {
        let status = GateStatus::new(SectionId::Experience);
        let signal = TriggerCause::Signal {
            signal: Signal::InterestsReady,
        };
        assert!(status.try_advance(GateState::Armed, Some(signal)).is_some());
        assert!(
            status
                .try_advance(GateState::Armed, Some(TriggerCause::Fallback))
                .is_none()
        );
        assert_eq!(status.snapshot().cause, Some(signal));
        assert_eq!(status.history().len(), 1);
    }

    #[test]
    fn test_done_is_terminal() {
        let status = GateStatus::new(SectionId::About);
        for from in [GateState::Armed, GateState::Typing, GateState::Revealed] {
            assert!(status.try_advance(from, None).is_some());
        }
        assert!(status.try_advance(GateState::Done, None).is_none());
        assert_eq!(status.state(), GateState::Done);

        let states: Vec<GateState> = status.history().iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![GateState::Typing, GateState::Revealed, GateState::Done]
        );
    }

    #[test]
    fn test_revealed_shows_content() {
        let status = GateStatus::new(SectionId::Projects);
        status.try_advance(GateState::Armed, Some(TriggerCause::Immediate));
        assert!(!status.snapshot().content_visible);
        status.try_advance(GateState::Typing, None);
        assert!(status.snapshot().content_visible);
    }

    #[test]
    fn test_header_only_updates_while_typing() {
        let status = GateStatus::new(SectionId::Projects);
        status.set_header("Pro");
        assert!(status.snapshot().header.is_empty());

        status.try_advance(GateState::Armed, Some(TriggerCause::Immediate));
        status.set_header("Pro");
        assert_eq!(status.snapshot().header, "Pro");

        status.try_advance(GateState::Typing, None);
        status.set_header("Projects");
        assert_eq!(status.snapshot().header, "Pro");
    }

    #[test]
    fn test_watch_sees_transitions() {
        let status = GateStatus::new(SectionId::Interests);
        let mut rx = status.watch();
        assert!(!rx.has_changed().unwrap());
        status.try_advance(GateState::Armed, Some(TriggerCause::Immediate));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, GateState::Typing);
    }

    #[test]
    fn test_concurrent_cas_only_one_wins() {
        let status = Arc::new(GateStatus::new(SectionId::Experience));
        let mut handles = vec![];

        for i in 0..10 {
            let s = Arc::clone(&status);
            handles.push(thread::spawn(move || {
                let cause = if i % 2 == 0 {
                    TriggerCause::Fallback
                } else {
                    TriggerCause::Signal {
                        signal: Signal::InterestsReady,
                    }
                };
                s.try_advance(GateState::Armed, Some(cause)).is_some()
            }));
        }

        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|&&won| won).count(), 1);
        assert_eq!(status.state(), GateState::Typing);
        assert_eq!(status.history().len(), 1);
    }

    #[test]
    fn test_poisoned_history_still_advances() {
        let status = Arc::new(GateStatus::new(SectionId::Interests));
        let poisoner = Arc::clone(&status);
        let _ = thread::spawn(move || {
            let _guard = poisoner.history.lock().unwrap();
            panic!("poison the history lock");
        })
        .join();
        assert!(status.history.is_poisoned());

        assert!(
            status
                .try_advance(GateState::Armed, Some(TriggerCause::Immediate))
                .is_some()
        );
        assert_eq!(status.history().len(), 1);
        assert_eq!(status.state(), GateState::Typing);
    }

    #[test]
    fn test_trigger_cause_display() {
        assert_eq!(TriggerCause::Fallback.to_string(), "fallback");
        assert_eq!(
            TriggerCause::Signal {
                signal: Signal::ProjectsReady
            }
            .to_string(),
            "signal 'projects-ready'"
        );
    }
}
