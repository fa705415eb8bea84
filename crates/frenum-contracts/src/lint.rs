//! Lint diagnostic types.
//!
//! The linter emits coded findings over a rule list.  Severity is derived
//! from the code: `E***` findings block enforcement startup when raised via
//! the evaluator constructor, `W***` findings taint the rule (it fails
//! closed at evaluation time) but never prevent startup.

use serde::{Deserialize, Serialize};

/// The closed set of diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LintCode {
    /// Invalid regex pattern.
    E001,
    /// Unknown PII detector name.
    E002,
    /// Duplicate rule name within one policy.
    E003,
    /// Empty `applies_to` list (or an empty pattern inside it).
    W001,
    /// Missing (or empty) mandatory parameter for a known rule type.
    W002,
    /// Unknown rule type.
    W003,
}

impl LintCode {
    pub fn as_str(self) -> &'static str {
        match self {
            LintCode::E001 => "E001",
            LintCode::E002 => "E002",
            LintCode::E003 => "E003",
            LintCode::W001 => "W001",
            LintCode::W002 => "W002",
            LintCode::W003 => "W003",
        }
    }

    pub fn severity(self) -> LintSeverity {
        match self {
            LintCode::E001 | LintCode::E002 | LintCode::E003 => LintSeverity::Error,
            LintCode::W001 | LintCode::W002 | LintCode::W003 => LintSeverity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Error,
    Warning,
}

/// One diagnostic produced by the linter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintFinding {
    pub code: LintCode,
    pub severity: LintSeverity,
    /// The rule the finding is about, when attributable to one.
    pub rule_name: Option<String>,
    pub message: String,
}

impl LintFinding {
    pub fn new(code: LintCode, rule_name: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            rule_name,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == LintSeverity::Error
    }
}
