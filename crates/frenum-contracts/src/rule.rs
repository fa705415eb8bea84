//! Rule taxonomy and the raw (pre-compilation) rule representation.
//!
//! A policy document is decoded into a list of `RuleSpec`s.  The raw form
//! keeps the declared `type` as a plain string because an unknown type is a
//! lint warning (W003), not a parse failure: the rule is retained and fails
//! closed at evaluation time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of rule kinds the evaluator knows how to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Block when any probed field matches any of a list of regex patterns.
    RegexBlock,
    /// Block when a required field is missing, empty, or does not fully
    /// match a single regex pattern.
    RegexRequire,
    /// Scan every scalar argument with named PII detectors.
    PiiDetect,
    /// Gate tools on the caller's `role` argument against a role table.
    Entitlement,
    /// Block when an estimated-cost argument exceeds a threshold.
    Budget,
    /// Block any tool whose name is not on an allowlist.
    ToolAllowlist,
}

impl RuleKind {
    /// All known kinds, in a stable order.
    pub const ALL: [RuleKind; 6] = [
        RuleKind::RegexBlock,
        RuleKind::RegexRequire,
        RuleKind::PiiDetect,
        RuleKind::Entitlement,
        RuleKind::Budget,
        RuleKind::ToolAllowlist,
    ];

    /// The snake_case name used in policy documents.
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::RegexBlock => "regex_block",
            RuleKind::RegexRequire => "regex_require",
            RuleKind::PiiDetect => "pii_detect",
            RuleKind::Entitlement => "entitlement",
            RuleKind::Budget => "budget",
            RuleKind::ToolAllowlist => "tool_allowlist",
        }
    }

    /// Parse a document `type` string.  Returns `None` for unknown types,
    /// which the linter reports as W003.
    pub fn from_name(name: &str) -> Option<Self> {
        RuleKind::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

/// Whether a rule's outcome is a pure function of the tool call.
///
/// Semantic rules are tracked (they appear in coverage reports under their
/// own heading) but never enforced and never counted toward guardrail
/// coverage.  The document key for this field is `kind`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleClass {
    #[default]
    Deterministic,
    Semantic,
}

/// A single rule as declared in a policy document, before compilation.
///
/// `params` stays a generic value tree here; kind-specific validation
/// happens in the linter and during compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Unique (within the policy) rule name, used in decisions and audit
    /// records.  Duplicates are lint error E003.
    pub name: String,

    /// Declared rule type.  Unknown values are retained (lint W003) and the
    /// rule becomes an unconditional block at evaluation time.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Tool-name patterns this rule applies to.  Literal names or tiny
    /// globs; the single entry `"*"` means all tools.  An empty list is
    /// lint warning W001 (the rule can never match).
    #[serde(default = "default_applies_to")]
    pub applies_to: Vec<String>,

    /// Deterministic or semantic classification (document key `kind`).
    #[serde(rename = "kind", default)]
    pub classification: RuleClass,

    /// Kind-specific parameters, validated by the linter and compiler.
    #[serde(default)]
    pub params: Value,
}

fn default_applies_to() -> Vec<String> {
    vec!["*".to_string()]
}
