//! Trigger resolution
//!
//! A gate leaves `ARMED` when its upstream signal arrives or its fallback
//! deadline expires, whichever happens first. Both are expressed as
//! futures raced by [`first_of`]; the loser is dropped, which disarms its
//! timer or listener.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::Either;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::bus::{ReadinessBus, Subscription};
use crate::signal::Signal;

use super::state::TriggerCause;

/// Races two futures and returns the output of whichever completes first.
///
/// The other future is dropped without being polled again. When both are
/// ready on the same poll, `primary` wins.
pub async fn first_of<A, B>(primary: A, secondary: B) -> Either<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    tokio::select! {
        biased;
        a = primary => Either::Left(a),
        b = secondary => Either::Right(b),
    }
}

/// A gate's armed listener on the readiness bus.
///
/// Created synchronously at mount, so a publish between mount and the
/// first poll of the gate task still leaves a permit behind.
#[derive(Debug)]
pub struct SignalListener {
    signal: Signal,
    notify: Arc<Notify>,
    subscription: Subscription,
}

impl SignalListener {
    /// Subscribes to `signal` on `bus`.
    #[must_use]
    pub fn arm(bus: &Arc<ReadinessBus>, signal: Signal) -> Self {
        let notify = Arc::new(Notify::new());
        let wake = Arc::clone(&notify);
        let subscription = bus.subscribe(signal, move |_| wake.notify_one());
        Self {
            signal,
            notify,
            subscription,
        }
    }

    /// Returns the awaited signal.
    #[must_use]
    pub const fn signal(&self) -> Signal {
        self.signal
    }

    /// Resolves once the signal has been published at least once since
    /// [`arm`](Self::arm).
    pub async fn fired(&self) {
        self.notify.notified().await;
    }

    /// Removes the listener from the bus.
    pub fn disarm(self) {
        self.subscription.cancel();
    }
}

/// How a gate leaves `ARMED`.
#[derive(Debug)]
pub enum Arming {
    /// No trigger signal: start at mount.
    Immediate,
    /// Wait for a signal, optionally bounded by a fallback deadline.
    Wait {
        /// Bus listener for the trigger signal.
        listener: SignalListener,
        /// Pause between the signal and leaving `ARMED`.
        buffer: Duration,
        /// Absolute instant at which the fallback fires.
        deadline: Option<Instant>,
    },
}

impl Arming {
    /// Builds the arming for a gate mounted at `mounted_at`.
    ///
    /// A fallback without a trigger signal is ignored: the gate starts
    /// immediately. A fallback too far out to be represented as an
    /// instant is treated as no fallback.
    #[must_use]
    pub fn new(
        bus: &Arc<ReadinessBus>,
        trigger: Option<Signal>,
        buffer: Duration,
        fallback: Option<Duration>,
        mounted_at: Instant,
    ) -> Self {
        trigger.map_or(Self::Immediate, |signal| Self::Wait {
            listener: SignalListener::arm(bus, signal),
            buffer,
            deadline: fallback.and_then(|delay| mounted_at.checked_add(delay)),
        })
    }

    /// Waits for the first trigger and disarms the other one.
    ///
    /// The fallback deadline stays armed while the post-signal buffer
    /// runs, so a signal arriving shortly before the deadline cannot push
    /// the gate past it.
    pub async fn resolve(self) -> TriggerCause {
        match self {
            Self::Immediate => TriggerCause::Immediate,
            Self::Wait {
                listener,
                buffer,
                deadline,
            } => {
                let signal = listener.signal();
                let buffered = async {
                    listener.fired().await;
                    if !buffer.is_zero() {
                        debug!(%signal, ?buffer, "trigger buffer");
                        tokio::time::sleep(buffer).await;
                    }
                };
                let cause = match deadline {
                    Some(deadline) => {
                        match first_of(buffered, tokio::time::sleep_until(deadline)).await {
                            Either::Left(()) => TriggerCause::Signal { signal },
                            Either::Right(()) => TriggerCause::Fallback,
                        }
                    }
                    None => {
                        buffered.await;
                        TriggerCause::Signal { signal }
                    }
                };
                listener.disarm();
                cause
            }
        }
    }
}
