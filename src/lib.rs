//! `stagehand` - staged section reveals for a single page
//!
//! Each section of a page sits behind a gate that waits for an upstream
//! readiness signal (or a fallback timer), types out its header, reveals
//! its content and announces its own readiness on a shared bus. A
//! navigation tracker follows the same signals to decide which sections
//! can be navigated to.

pub mod bus;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod nav;
pub mod observability;
pub mod page;
pub mod signal;

pub use bus::{BusMode, ReadinessBus, Subscription};
pub use config::{ChoreographyConfig, GateConfig};
pub use error::{ConfigError, StagehandError};
pub use gate::{GateHandle, GateState, SectionGate, TriggerCause};
pub use nav::{NavigationTracker, SectionVisibility};
pub use page::Page;
pub use signal::{SectionId, Signal};
