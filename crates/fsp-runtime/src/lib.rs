#![forbid(unsafe_code)]

//! FrankenSpectral runtime: execution modes, bounded trace ledger and the
//! shared test-logging helpers used across the workspace.
//!
//! ## Module layout
//!
//! | Module   | Contents                                           |
//! |----------|----------------------------------------------------|
//! | `mode`   | [`RuntimeMode`] enum (Strict / Hardened)           |
//! | `ledger` | [`TraceLedger`] bounded FIFO of structured records |

pub mod ledger;
pub mod mode;

pub use ledger::TraceLedger;
pub use mode::RuntimeMode;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, saturating to zero on clock skew.
#[must_use]
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// ═══════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════

/// One JSON line describing a test outcome, tagged with the proptest seed
/// and runtime mode when they matter for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLogEntry {
    pub test_id: String,
    pub timestamp_ms: u64,
    pub module: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RuntimeMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_error: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Pass,
    Fail,
}

impl TestLogEntry {
    #[must_use]
    pub fn new(
        test_id: impl Into<String>,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            timestamp_ms: now_unix_ms(),
            module: module.into(),
            message: message.into(),
            seed: None,
            mode: None,
            result: None,
            max_error: None,
        }
    }

    #[must_use]
    pub fn with_result(mut self, result: TestResult) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Largest element-wise error relative to the largest reference magnitude.
///
/// Spectral bins can sit arbitrarily close to zero, so per-element relative
/// error is meaningless. Returns `0.0` for empty input and the absolute
/// error when the reference is all zeros.
#[must_use]
pub fn max_relative_error(actual: &[f64], expected: &[f64]) -> f64 {
    assert_eq!(
        actual.len(),
        expected.len(),
        "max_relative_error: length mismatch: actual={} expected={}",
        actual.len(),
        expected.len()
    );
    let scale = expected.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let worst = actual
        .iter()
        .zip(expected)
        .fold(0.0_f64, |acc, (a, e)| acc.max((a - e).abs()));
    if scale > 0.0 { worst / scale } else { worst }
}
