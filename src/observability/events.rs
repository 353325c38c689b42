//! Structured event stream for `stagehand`.
//!
//! Discrete, typed events emitted while a page is mounted. Events are
//! serialized as newline-delimited JSON (JSONL) and include a monotonically
//! increasing sequence number for ordering guarantees.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::gate::{GateState, TriggerCause};
use crate::signal::{SectionId, Signal};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during choreography.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A page has been mounted and its gates armed.
    PageMounted {
        /// When the page was mounted.
        timestamp: DateTime<Utc>,
        /// Page instance identifier.
        page_id: Uuid,
        /// Sections with a gate, in mount order.
        sections: Vec<SectionId>,
    },

    /// A page has been torn down.
    PageUnmounted {
        /// When the page was unmounted.
        timestamp: DateTime<Utc>,
        /// Page instance identifier.
        page_id: Uuid,
        /// Sections that had reached `DONE` before teardown.
        completed: Vec<SectionId>,
    },

    /// A gate moved forward one state.
    GateTransitioned {
        /// When the transition happened.
        timestamp: DateTime<Utc>,
        /// Section owning the gate.
        section: SectionId,
        /// State left.
        from: GateState,
        /// State entered.
        to: GateState,
        /// What triggered the gate (set on the `ARMED -> TYPING` edge only).
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<TriggerCause>,
        /// Milliseconds since the gate was mounted.
        elapsed_ms: u64,
    },

    /// A signal was published on the readiness bus.
    SignalPublished {
        /// When the signal was published.
        timestamp: DateTime<Utc>,
        /// Signal name.
        signal: Signal,
        /// Number of handlers that received it.
        delivered_to: usize,
    },

    /// A navigation target became reachable.
    SectionUnlocked {
        /// When the section was unlocked.
        timestamp: DateTime<Utc>,
        /// Newly unlocked section.
        section: SectionId,
    },

    /// The active navigation target changed.
    SectionActivated {
        /// When the section became active.
        timestamp: DateTime<Utc>,
        /// Newly active section.
        section: SectionId,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are silently dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_transition() -> Event {
        Event::GateTransitioned {
            timestamp: DateTime::parse_from_rfc3339("2025-02-04T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            section: SectionId::Experience,
            from: GateState::Armed,
            to: GateState::Typing,
            cause: Some(TriggerCause::Fallback),
            elapsed_ms: 8500,
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&sample_transition()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "GateTransitioned");
        assert_eq!(parsed["section"], "experience");
        assert_eq!(parsed["from"], "ARMED");
        assert_eq!(parsed["to"], "TYPING");
        assert_eq!(parsed["cause"]["kind"], "fallback");
    }

    #[test]
    fn missing_cause_is_omitted() {
        let event = Event::GateTransitioned {
            timestamp: Utc::now(),
            section: SectionId::About,
            from: GateState::Typing,
            to: GateState::Revealed,
            cause: None,
            elapsed_ms: 800,
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert!(parsed.get("cause").is_none());
    }

    #[test]
    fn emitter_writes_valid_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_transition());

        let output = tw.contents();
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["type"], "GateTransitioned");
        assert_eq!(parsed["elapsed_ms"], 8500);
        assert_eq!(parsed["sequence"], 0);
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_transition());
        emitter.emit(Event::SignalPublished {
            timestamp: Utc::now(),
            signal: Signal::ProjectsReady,
            delivered_to: 2,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["signal"], "projects-ready");
    }

    #[test]
    fn envelope_flattens_event_fields() {
        let envelope = EventEnvelope {
            sequence: 7,
            event: Event::SectionUnlocked {
                timestamp: Utc::now(),
                section: SectionId::Interests,
            },
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["sequence"], 7);
        assert_eq!(parsed["type"], "SectionUnlocked");
        assert_eq!(parsed["section"], "interests");
        assert!(parsed.get("event").is_none());
    }
}
