//! Section gates
//!
//! One gate per page section. A gate waits for its upstream readiness
//! signal (or a fallback deadline), types its header, reveals its content
//! and finally publishes its own readiness signal.
//!
//! # Architecture
//!
//! - [`GateStatus`]: observable, forward-only state with CAS transitions
//! - [`trigger`]: first-of race between the upstream signal and the fallback
//! - [`typewriter`]: lazy prefix sequence and its timed playback
//! - [`SectionGate`]: the task that drives one gate to `DONE`

pub mod engine;
pub mod state;
pub mod trigger;
pub mod typewriter;

pub use engine::{GateHandle, SectionGate};
pub use state::{GateSnapshot, GateState, GateStatus, GateTransition, TriggerCause};
pub use typewriter::Typewriter;
