//! Choreography configuration
//!
//! YAML description of a page's gates, its loader and its validator.
//! Without a file the built-in choreography is used.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, load_or_default};
pub use schema::{ChoreographyConfig, GateConfig, MAX_GATE_DURATION, SELF_REVEAL_BUDGET};
pub use validation::{ValidationResult, Validator};
