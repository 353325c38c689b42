//! Shared integration-test helpers: fixtures, the `stagehand` binary and
//! an in-memory event sink.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use stagehand::config::{ChoreographyConfig, ConfigLoader};
use stagehand::observability::EventEmitter;

/// Returns the path of a file under `tests/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Loads a fixture through the regular loader.
#[allow(clippy::missing_panics_doc)]
pub fn load_fixture(name: &str) -> ChoreographyConfig {
    ConfigLoader::new()
        .load(&fixture_path(name))
        .expect("fixture should load")
        .config
}

/// Runs the `stagehand` binary to completion.
#[allow(clippy::missing_panics_doc)]
pub fn run_stagehand(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stagehand"))
        .args(args)
        .env_remove("STAGEHAND_CONFIG")
        .env_remove("STAGEHAND_LOG_LEVEL")
        .output()
        .expect("failed to run stagehand")
}

/// Reads a JSONL file into one value per line.
#[allow(clippy::missing_panics_doc)]
pub fn read_jsonl(path: &Path) -> Vec<Value> {
    let contents = std::fs::read_to_string(path).expect("events file should exist");
    parse_jsonl(&contents)
}

fn parse_jsonl(contents: &str) -> Vec<Value> {
    contents
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid JSON: {e}\nline: {l}")))
        .collect()
}

/// Asserts `actual` is within 2ms after `expected_ms`.
#[track_caller]
pub fn assert_at(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(2),
        "expected ~{expected:?}, got {actual:?}"
    );
}

/// In-memory sink shared between an [`EventEmitter`] and the test.
#[derive(Clone, Default)]
pub struct EventCapture(Arc<Mutex<Vec<u8>>>);

impl EventCapture {
    /// Creates an emitter writing into this capture.
    pub fn emitter(&self) -> Arc<EventEmitter> {
        Arc::new(EventEmitter::new(Box::new(self.clone())))
    }

    /// Returns every captured event.
    #[allow(clippy::missing_panics_doc)]
    pub fn events(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        parse_jsonl(&String::from_utf8(bytes).unwrap())
    }

    /// Returns captured events of the given `type`.
    pub fn of_type(&self, kind: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }
}

impl Write for EventCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
