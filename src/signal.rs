//! Signal and section vocabulary.
//!
//! Both vocabularies are closed: the wire names below are the only contract
//! between sections. Names are case-sensitive and parse with a
//! "did you mean" hint when they are close to a known one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named, payload-less readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Signal {
    /// `experience-ready`
    ExperienceReady,
    /// `projects-ready`
    ProjectsReady,
    /// `additional-experience-ready`
    AdditionalExperienceReady,
    /// `interests-ready`
    InterestsReady,
}

impl Signal {
    /// Every signal, in page order of the section it unlocks.
    pub const ALL: [Self; 4] = [
        Self::ExperienceReady,
        Self::ProjectsReady,
        Self::AdditionalExperienceReady,
        Self::InterestsReady,
    ];

    /// Returns the wire name of the signal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExperienceReady => "experience-ready",
            Self::ProjectsReady => "projects-ready",
            Self::AdditionalExperienceReady => "additional-experience-ready",
            Self::InterestsReady => "interests-ready",
        }
    }

    /// Returns the navigation target this signal unlocks.
    #[must_use]
    pub const fn section(self) -> SectionId {
        match self {
            Self::ExperienceReady => SectionId::Experience,
            Self::ProjectsReady => SectionId::Projects,
            Self::AdditionalExperienceReady => SectionId::AdditionalExperience,
            Self::InterestsReady => SectionId::Interests,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|signal| signal.as_str() == s)
            .ok_or_else(|| UnknownName::new("signal", s, Self::ALL.map(Self::as_str)))
    }
}

impl TryFrom<String> for Signal {
    type Error = UnknownName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signal> for &'static str {
    fn from(signal: Signal) -> Self {
        signal.as_str()
    }
}

/// Page section identifier.
///
/// Declared in page order, so `Ord` follows the visual top-to-bottom layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum SectionId {
    /// `about`
    About,
    /// `experience`
    Experience,
    /// `projects`
    Projects,
    /// `additional-experience`
    AdditionalExperience,
    /// `interests`
    Interests,
}

impl SectionId {
    /// Every section, in page order.
    pub const ALL: [Self; 5] = [
        Self::About,
        Self::Experience,
        Self::Projects,
        Self::AdditionalExperience,
        Self::Interests,
    ];

    /// Returns the element id of the section.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Experience => "experience",
            Self::Projects => "projects",
            Self::AdditionalExperience => "additional-experience",
            Self::Interests => "interests",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| UnknownName::new("section", s, Self::ALL.map(Self::as_str)))
    }
}

impl TryFrom<String> for SectionId {
    type Error = UnknownName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SectionId> for &'static str {
    fn from(section: SectionId) -> Self {
        section.as_str()
    }
}

/// A name outside the closed signal or section vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{name}'{hint}")]
pub struct UnknownName {
    /// `"signal"` or `"section"`
    pub kind: &'static str,
    /// The rejected input
    pub name: String,
    /// Closest known name, when one is near enough to be a typo
    pub suggestion: Option<&'static str>,
    hint: String,
}

impl UnknownName {
    fn new<const N: usize>(kind: &'static str, name: &str, known: [&'static str; N]) -> Self {
        let suggestion = closest_match(name, &known);
        let hint = suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"));
        Self {
            kind,
            name: name.to_string(),
            suggestion,
            hint,
        }
    }
}

/// Returns the known name within edit distance 3 of `input`, if any.
fn closest_match(input: &str, known: &[&'static str]) -> Option<&'static str> {
    known
        .iter()
        .map(|name| (*name, strsim::damerau_levenshtein(input, name)))
        .filter(|(_, distance)| *distance <= 3)
        .min_by_key(|(_, distance)| *distance)
        .map(|(name, _)| name)
}
