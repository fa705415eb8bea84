//! Decisions, evaluation results, test cases, and coverage.
//!
//! `EvaluationResult` is what `Engine::evaluate` returns to the host;
//! `TestCase` / `TestOutcome` / `CoverageReport` are the test-runner side
//! of the same vocabulary.

use serde::{Deserialize, Serialize};

use crate::call::ToolCall;

/// The terminal verdict for a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Block => "block",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar argument that triggered a `regex_block` pattern or a PII
/// detector during evaluation.
///
/// `path` is the dotted path of the scalar inside `ToolCall::args`;
/// `label` is the rule name (regex matches) or detector name (PII matches)
/// that the audit logger substitutes into `"<redacted:<label>>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redaction {
    pub path: String,
    pub label: String,
}

/// The aggregate result of evaluating all applicable rules against one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub decision: Decision,

    /// Human-readable explanation.  Includes the offending field path for
    /// regex and PII blocks; `"No rule blocked"` when everything passed.
    pub reason: String,

    /// The rule that produced the block, when there is one.
    pub blocking_rule: Option<String>,

    /// Names of the rules actually applied, in declaration order, inclusive
    /// of the blocking rule.  Rules after the first block never appear.
    pub rules_evaluated: Vec<String>,

    /// Dotted paths of scalars that matched a pattern or detector, in match
    /// order, without duplicates.
    #[serde(default)]
    pub matched_paths: Vec<String>,

    /// Everything the audit logger must redact, with labels.
    #[serde(default)]
    pub redactions: Vec<Redaction>,
}

/// One declarative regression scenario for a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub description: String,
    pub tool_call: ToolCall,
    pub expected: Decision,
    /// When given and `expected` is block, the blocking rule must match too.
    #[serde(default)]
    pub expected_rule: Option<String>,
}

/// The result of running one test case (or of failing to construct one).
///
/// A case that cannot be parsed still produces an outcome: `case` is `None`,
/// `passed` is false, and `reason` carries the diagnostic.  A malformed case
/// never aborts the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub description: String,
    pub case: Option<TestCase>,
    /// Absent when the case never ran (construction failure).
    pub actual_decision: Option<Decision>,
    pub actual_blocking_rule: Option<String>,
    /// Carried for coverage accounting.
    #[serde(default)]
    pub rules_evaluated: Vec<String>,
    pub passed: bool,
    pub reason: String,
}

/// Guardrail coverage over the deterministic rules of one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_deterministic: usize,
    /// Count of deterministic rules exercised by at least one test.
    pub exercised: usize,
    /// `100 * exercised / total_deterministic`, rounded to one decimal
    /// place; 0.0 when there are no deterministic rules.
    pub coverage_pct: f64,
    /// Sorted names of exercised deterministic rules.
    pub rules_exercised: Vec<String>,
    /// Sorted names of deterministic rules no test touched.
    pub rules_not_exercised: Vec<String>,
    /// Sorted names of semantic rules; never counted in the percentage.
    pub semantic_rules: Vec<String>,
}
