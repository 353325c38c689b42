//! Choreography configuration schema
//!
//! Typed, `serde`-driven description of every gate on a page. Durations are
//! written in `humantime` syntax (`90ms`, `8s 500ms`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gate::typewriter::typing_duration;
use crate::signal::{SectionId, Signal};

/// Worst-case time by which a page should have revealed itself without
/// any real signal.
pub const SELF_REVEAL_BUDGET: Duration = Duration::from_secs(25);

/// Upper bound accepted for any single gate timing.
pub const MAX_GATE_DURATION: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// Root
// ============================================================================

/// Every gate on one page, in mount order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoreographyConfig {
    /// Gate definitions.
    pub gates: Vec<GateConfig>,
}

impl ChoreographyConfig {
    /// Returns the gate for `section`, if configured.
    #[must_use]
    pub fn gate(&self, section: SectionId) -> Option<&GateConfig> {
        self.gates.iter().find(|g| g.section == section)
    }

    /// Returns the gate that publishes `signal`, if any.
    #[must_use]
    pub fn producer_of(&self, signal: Signal) -> Option<&GateConfig> {
        self.gates.iter().find(|g| g.completion == Some(signal))
    }

    /// Returns the latest instant, relative to mount, at which any gate
    /// reaches `DONE` when no signal is ever delivered.
    ///
    /// Gates that wait on a signal without a fallback never finish in that
    /// case and yield `None`.
    #[must_use]
    pub fn worst_case_reveal(&self) -> Option<Duration> {
        self.gates
            .iter()
            .map(GateConfig::self_reveal)
            .try_fold(Duration::ZERO, |acc, d| d.map(|d| acc.max(d)))
    }
}

impl Default for ChoreographyConfig {
    /// The choreography observed on the portfolio page.
    ///
    /// Experience waits on `interests-ready`, which is published further
    /// down the page; in practice it is revealed by its fallback.
    fn default() -> Self {
        Self {
            gates: vec![
                GateConfig {
                    section: SectionId::About,
                    header: "About Me".to_string(),
                    trigger: None,
                    trigger_delay: Duration::ZERO,
                    fallback: None,
                    typing_interval: Duration::from_millis(100),
                    post_typing_delay: Duration::from_millis(300),
                    completion: None,
                },
                GateConfig {
                    section: SectionId::Experience,
                    header: "Experience".to_string(),
                    trigger: Some(Signal::InterestsReady),
                    trigger_delay: Duration::from_millis(2800),
                    fallback: Some(Duration::from_millis(8500)),
                    typing_interval: Duration::from_millis(90),
                    post_typing_delay: Duration::from_millis(600),
                    completion: Some(Signal::ExperienceReady),
                },
                GateConfig {
                    section: SectionId::Projects,
                    header: "Projects".to_string(),
                    trigger: Some(Signal::ExperienceReady),
                    trigger_delay: Duration::from_millis(1500),
                    fallback: Some(Duration::from_millis(12_000)),
                    typing_interval: Duration::from_millis(90),
                    post_typing_delay: Duration::from_millis(600),
                    completion: Some(Signal::ProjectsReady),
                },
                GateConfig {
                    section: SectionId::AdditionalExperience,
                    header: "Additional Experience".to_string(),
                    trigger: Some(Signal::ProjectsReady),
                    trigger_delay: Duration::ZERO,
                    fallback: Some(Duration::from_millis(14_000)),
                    typing_interval: Duration::from_millis(90),
                    post_typing_delay: Duration::from_millis(600),
                    completion: Some(Signal::AdditionalExperienceReady),
                },
                GateConfig {
                    section: SectionId::Interests,
                    header: "Interests".to_string(),
                    trigger: Some(Signal::ProjectsReady),
                    trigger_delay: Duration::ZERO,
                    fallback: Some(Duration::from_millis(16_000)),
                    typing_interval: Duration::from_millis(100),
                    post_typing_delay: Duration::from_millis(600),
                    completion: Some(Signal::InterestsReady),
                },
            ],
        }
    }
}

// ============================================================================
// Gate
// ============================================================================

/// One section gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Section owning the gate.
    pub section: SectionId,

    /// Header revealed character by character.
    pub header: String,

    /// Upstream signal that triggers the gate; absent for the first gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Signal>,

    /// Extra wait between the trigger signal and typing.
    #[serde(default, with = "duration", skip_serializing_if = "Duration::is_zero")]
    pub trigger_delay: Duration,

    /// Deadline, measured from mount, after which the gate self-triggers.
    #[serde(default, with = "optional_duration", skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Duration>,

    /// Delay between revealed characters.
    #[serde(with = "duration")]
    pub typing_interval: Duration,

    /// Pause between the header finishing and the completion signal.
    #[serde(with = "duration")]
    pub post_typing_delay: Duration,

    /// Signal published once the gate is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Signal>,
}

impl GateConfig {
    /// Returns how long the reveal takes once the gate is triggered.
    #[must_use]
    pub fn reveal_duration(&self) -> Duration {
        typing_duration(&self.header, self.typing_interval).saturating_add(self.post_typing_delay)
    }

    /// Returns when this gate reaches `DONE` if no signal is ever delivered.
    #[must_use]
    pub fn self_reveal(&self) -> Option<Duration> {
        let start = match (self.trigger, self.fallback) {
            (None, _) => Duration::ZERO,
            (Some(_), Some(fallback)) => fallback,
            (Some(_), None) => return None,
        };
        Some(start.saturating_add(self.reveal_duration()))
    }
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw)
            .map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
    }
}

mod optional_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => super::duration::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                humantime::parse_duration(&raw).map_err(|e| {
                    serde::de::Error::custom(format!("invalid duration '{raw}': {e}"))
                })
            })
            .transpose()
    }
}
