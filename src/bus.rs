//! Readiness bus
//!
//! An injectable publish/subscribe channel carrying named readiness
//! signals. Delivery is synchronous and fire-and-forget: a publish reaches
//! the handlers registered at that moment and is then gone, so a late
//! subscriber never observes a past signal.
//!
//! Handlers are invoked on a snapshot of the subscriber list with no lock
//! held, which lets a handler publish, subscribe or unsubscribe while a
//! publish is being dispatched.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::signal::Signal;

/// Callback invoked once per publish of the subscribed signal.
pub type Handler = Arc<dyn Fn(Signal) + Send + Sync>;

/// Whether publishes reach subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusMode {
    /// Publishes are delivered to current subscribers.
    #[default]
    Deliver,
    /// Publishes are counted but never delivered; every gate falls back
    /// to its timeout.
    Silent,
}

/// Identifier of one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Process-wide readiness bus for one page lifetime.
pub struct ReadinessBus {
    mode: BusMode,
    subscribers: DashMap<Signal, Vec<(SubscriptionId, Handler)>>,
    publish_counts: DashMap<Signal, AtomicU64>,
    next_id: AtomicU64,
    closed: AtomicBool,
    emitter: Arc<EventEmitter>,
}

impl ReadinessBus {
    /// Creates a delivering bus.
    #[must_use]
    pub fn new(emitter: Arc<EventEmitter>) -> Arc<Self> {
        Self::with_mode(BusMode::Deliver, emitter)
    }

    /// Creates a bus with the given delivery mode.
    #[must_use]
    pub fn with_mode(mode: BusMode, emitter: Arc<EventEmitter>) -> Arc<Self> {
        Arc::new(Self {
            mode,
            subscribers: DashMap::new(),
            publish_counts: DashMap::new(),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            emitter,
        })
    }

    /// Returns the delivery mode.
    #[must_use]
    pub const fn mode(&self) -> BusMode {
        self.mode
    }

    /// Registers `handler` for `signal`.
    ///
    /// The returned [`Subscription`] unsubscribes when dropped or when
    /// [`unsubscribe`](Self::unsubscribe) is called. Subscribing to a closed
    /// bus yields an inert subscription.
    pub fn subscribe<F>(self: &Arc<Self>, signal: Signal, handler: F) -> Subscription
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let active = !self.is_closed();
        if active {
            let handler: Handler = Arc::new(handler);
            self.subscribers
                .entry(signal)
                .or_default()
                .push((id, handler));
            trace!(%signal, ?id, "subscribed");
        }
        Subscription {
            bus: Arc::downgrade(self),
            signal,
            id,
            active: AtomicBool::new(active),
        }
    }

    /// Removes a subscription. Safe to call any number of times.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        if subscription.active.swap(false, Ordering::SeqCst) {
            self.remove(subscription.signal, subscription.id);
        }
    }

    fn remove(&self, signal: Signal, id: SubscriptionId) {
        if let Some(mut handlers) = self.subscribers.get_mut(&signal) {
            handlers.retain(|(existing, _)| *existing != id);
        }
        trace!(%signal, ?id, "unsubscribed");
    }

    /// Broadcasts `signal` to every handler currently registered for it.
    ///
    /// Returns the number of handlers invoked. Publishing on a closed bus
    /// is a no-op.
    pub fn publish(&self, signal: Signal) -> usize {
        if self.is_closed() {
            debug!(%signal, "publish after close ignored");
            return 0;
        }

        self.publish_counts
            .entry(signal)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst);
        metrics::record_signal_published(signal);

        let handlers: Vec<Handler> = match self.mode {
            BusMode::Deliver => self
                .subscribers
                .get(&signal)
                .map(|entry| entry.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default(),
            BusMode::Silent => Vec::new(),
        };

        debug!(%signal, subscribers = handlers.len(), "signal published");
        self.emitter.emit(Event::SignalPublished {
            timestamp: Utc::now(),
            signal,
            delivered_to: handlers.len(),
        });

        for handler in &handlers {
            handler(signal);
        }
        handlers.len()
    }

    /// Closes the bus: drops every subscriber and ignores later publishes.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.subscribers.clear();
            debug!("readiness bus closed");
        }
    }

    /// Returns whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the number of handlers registered for `signal`.
    #[must_use]
    pub fn subscriber_count(&self, signal: Signal) -> usize {
        self.subscribers.get(&signal).map_or(0, |h| h.len())
    }

    /// Returns how many times `signal` has been published.
    #[must_use]
    pub fn publish_count(&self, signal: Signal) -> u64 {
        self.publish_counts
            .get(&signal)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }
}

impl std::fmt::Debug for ReadinessBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessBus")
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Handle to one registration on a [`ReadinessBus`].
///
/// Holds only a weak reference, so a subscription captured inside a handler
/// does not keep the bus alive.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<ReadinessBus>,
    signal: Signal,
    id: SubscriptionId,
    active: AtomicBool,
}

impl Subscription {
    /// Returns the subscribed signal.
    #[must_use]
    pub const fn signal(&self) -> Signal {
        self.signal
    }

    /// Returns whether the handler is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Unsubscribes. Idempotent.
    pub fn cancel(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self);
        } else {
            self.active.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
