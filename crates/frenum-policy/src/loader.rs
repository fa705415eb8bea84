//! YAML decoding for policy and test documents.
//!
//! The concrete encoding is deliberately thin: documents decode into the
//! generic value trees defined in frenum-contracts, and everything
//! interesting (validation, compilation) happens downstream.  A policy
//! document that fails to decode is a `ConfigError`; a single malformed
//! test case is NOT: it is preserved as `LoadedCase::Invalid` so the
//! runner can report it as a failed outcome without aborting the run.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use frenum_contracts::{FrenumError, FrenumResult, RuleSpec, TestCase};

/// A decoded policy document, prior to lint and compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDoc {
    #[serde(default = "default_policy_version")]
    pub policy_version: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_policy_version() -> String {
    "1.0.0".to_string()
}

/// Parse a policy document from YAML text.
pub fn load_policy_str(text: &str) -> FrenumResult<PolicyDoc> {
    serde_yaml::from_str(text).map_err(|e| FrenumError::ConfigError {
        reason: format!("failed to parse policy YAML: {e}"),
    })
}

/// Read and parse the policy document at `path`.
pub fn load_policy_file(path: &Path) -> FrenumResult<PolicyDoc> {
    let text = fs::read_to_string(path).map_err(|e| FrenumError::ConfigError {
        reason: format!("failed to read policy file '{}': {e}", path.display()),
    })?;
    load_policy_str(&text)
}

/// One entry of a test document.
///
/// `Invalid` carries enough context for the runner to emit a failed
/// outcome in the case's place.
#[derive(Debug, Clone)]
pub enum LoadedCase {
    Case(TestCase),
    Invalid { description: String, error: String },
}

#[derive(Deserialize)]
struct TestsDoc {
    #[serde(default)]
    tests: Vec<serde_yaml::Value>,
}

/// Parse a test document from YAML text.
///
/// Fails only when the document itself is unreadable or has no `tests`
/// entries; individual malformed cases survive as `LoadedCase::Invalid`.
pub fn load_tests_str(text: &str) -> FrenumResult<Vec<LoadedCase>> {
    let doc: TestsDoc = serde_yaml::from_str(text).map_err(|e| FrenumError::ConfigError {
        reason: format!("failed to parse test YAML: {e}"),
    })?;
    if doc.tests.is_empty() {
        return Err(FrenumError::ConfigError {
            reason: "test document has no 'tests' key or it is empty".to_string(),
        });
    }

    let cases = doc
        .tests
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let description = raw
                .get("description")
                .and_then(|d| d.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("test_{i}"));
            match serde_yaml::from_value::<TestCase>(raw) {
                Ok(mut case) => {
                    if case.description.is_empty() {
                        case.description = description;
                    }
                    LoadedCase::Case(case)
                }
                Err(e) => LoadedCase::Invalid {
                    description,
                    error: format!("invalid test case: {e}"),
                },
            }
        })
        .collect();

    Ok(cases)
}

/// Read and parse the test document at `path`.
pub fn load_tests_file(path: &Path) -> FrenumResult<Vec<LoadedCase>> {
    let text = fs::read_to_string(path).map_err(|e| FrenumError::ConfigError {
        reason: format!("failed to read test file '{}': {e}", path.display()),
    })?;
    load_tests_str(&text)
}
