//! Choreography validation
//!
//! Runs after parsing on the fully deserialized [`ChoreographyConfig`] and
//! collects every issue rather than stopping at the first one.
//!
//! Errors describe configurations that cannot choreograph correctly
//! (duplicate sections, ambiguous completion signals). Warnings describe
//! configurations that run but may reveal late or never.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::config::schema::{
    ChoreographyConfig, GateConfig, MAX_GATE_DURATION, SELF_REVEAL_BUDGET,
};
use crate::error::ValidationIssue;
use crate::signal::{SectionId, Signal};

// ============================================================================
// Public API
// ============================================================================

/// Result of choreography validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent mounting).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Choreography validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &ChoreographyConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if config.gates.is_empty() {
            self.add_error("gates", "at least one gate is required");
        }

        self.validate_sections(config);
        let producers = self.validate_completions(config);
        for (index, gate) in config.gates.iter().enumerate() {
            self.validate_gate(index, gate, &producers);
        }
        self.validate_fallback_order(config);
        self.validate_budget(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Page-level rules
    // ========================================================================

    fn validate_sections(&mut self, config: &ChoreographyConfig) {
        let mut seen: HashSet<SectionId> = HashSet::new();
        for (index, gate) in config.gates.iter().enumerate() {
            if !seen.insert(gate.section) {
                self.add_error(
                    format!("gates[{index}].section"),
                    format!("duplicate section '{}'", gate.section),
                );
            }
        }
    }

    /// Maps each completion signal to the index of its first producer.
    fn validate_completions(&mut self, config: &ChoreographyConfig) -> HashMap<Signal, usize> {
        let mut producers: HashMap<Signal, usize> = HashMap::new();
        for (index, gate) in config.gates.iter().enumerate() {
            let Some(signal) = gate.completion else {
                continue;
            };
            if let Some(first) = producers.get(&signal) {
                self.add_error(
                    format!("gates[{index}].completion"),
                    format!("signal '{signal}' is already published by gates[{first}]"),
                );
            } else {
                producers.insert(signal, index);
            }
        }
        producers
    }

    fn validate_fallback_order(&mut self, config: &ChoreographyConfig) {
        let mut previous: Option<(usize, Duration)> = None;
        for (index, gate) in config.gates.iter().enumerate() {
            let Some(fallback) = gate.fallback.filter(|_| gate.trigger.is_some()) else {
                continue;
            };
            if let Some((prev_index, prev)) = previous
                && fallback < prev
            {
                self.add_warning(
                    format!("gates[{index}].fallback"),
                    format!(
                        "fallback {} fires before the fallback of gates[{prev_index}] ({})",
                        humantime::format_duration(fallback),
                        humantime::format_duration(prev)
                    ),
                );
            }
            previous = Some((index, fallback));
        }
    }

    fn validate_budget(&mut self, config: &ChoreographyConfig) {
        if let Some(worst) = config.worst_case_reveal()
            && worst > SELF_REVEAL_BUDGET
        {
            self.add_warning(
                "gates",
                format!(
                    "page self-reveals only after {} without signals (budget {})",
                    humantime::format_duration(worst),
                    humantime::format_duration(SELF_REVEAL_BUDGET)
                ),
            );
        }
    }

    // ========================================================================
    // Gate-level rules
    // ========================================================================

    fn validate_gate(
        &mut self,
        index: usize,
        gate: &GateConfig,
        producers: &HashMap<Signal, usize>,
    ) {
        let timings = [
            ("trigger_delay", Some(gate.trigger_delay)),
            ("fallback", gate.fallback),
            ("typing_interval", Some(gate.typing_interval)),
            ("post_typing_delay", Some(gate.post_typing_delay)),
        ];
        for (field, value) in timings {
            if let Some(value) = value
                && value > MAX_GATE_DURATION
            {
                self.add_error(
                    format!("gates[{index}].{field}"),
                    format!(
                        "{field} exceeds the {} limit",
                        humantime::format_duration(MAX_GATE_DURATION)
                    ),
                );
            }
        }

        if gate.header.is_empty() {
            self.add_warning(
                format!("gates[{index}].header"),
                "header is empty; the gate reveals without typing",
            );
        } else if gate.typing_interval.is_zero() {
            self.add_error(
                format!("gates[{index}].typing_interval"),
                "typing interval must be greater than zero",
            );
        }

        match (gate.trigger, gate.fallback) {
            (Some(_), None) => self.add_warning(
                format!("gates[{index}].fallback"),
                "gate has a trigger but no fallback and may never reveal",
            ),
            (None, Some(_)) => self.add_warning(
                format!("gates[{index}].fallback"),
                "fallback is ignored for a gate without a trigger",
            ),
            _ => {}
        }

        let Some(trigger) = gate.trigger else {
            return;
        };
        let path = format!("gates[{index}].trigger");

        if gate.completion == Some(trigger) {
            self.add_error(path, format!("gate is triggered by its own completion '{trigger}'"));
            return;
        }

        match producers.get(&trigger) {
            None => self.add_warning(
                path,
                format!("no gate publishes '{trigger}'; only the fallback can trigger this gate"),
            ),
            Some(&producer) if producer > index => self.add_warning(
                path,
                format!(
                    "cross-wired: '{trigger}' is published by gates[{producer}], \
                     which appears later on the page"
                ),
            ),
            Some(_) => {}
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::error(path, message));
    }

    fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::warning(path, message));
    }
}
