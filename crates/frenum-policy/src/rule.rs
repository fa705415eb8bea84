//! Compiled rules: the typed, validated form the evaluator runs against.
//!
//! Compilation turns each raw `RuleSpec` into a `CompiledRule` with
//! pre-compiled regexes, resolved detector enums, and normalized
//! applicability (literal names split from glob patterns for O(1) lookup).
//! A rule whose parameters are missing or malformed is not dropped: it is
//! tainted as `Misconfigured` and blocks unconditionally at evaluation
//! time (fail closed).
//!
//! `CompiledPolicy::compile` is the enforcement gate: it runs the linter
//! first and refuses to build when any error-severity finding exists.
//! The same documents examined through `lint()` alone never abort.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::Deserialize;

use frenum_contracts::{
    Decision, FrenumError, FrenumResult, LintSeverity, RuleClass, RuleKind, RuleSpec,
};
use frenum_core::pii::PiiDetector;

use crate::lint::lint;

/// What to do when a `pii_detect` rule finds something.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiAction {
    /// Block the call outright.
    #[default]
    Block,
    /// Let the call through but record the finding for audit redaction.
    Flag,
}

/// The kind-specific, fully validated evaluation logic of one rule.
#[derive(Debug, Clone)]
pub enum CompiledCheck {
    RegexBlock {
        fields: Vec<String>,
        patterns: Vec<Regex>,
    },
    RegexRequire {
        fields: Vec<String>,
        /// Anchored at compile time so matching is always full-string.
        pattern: Regex,
    },
    PiiDetect {
        detectors: Vec<PiiDetector>,
        action: PiiAction,
    },
    Entitlement {
        /// Role name to allowed tool patterns (literals and globs).
        roles: BTreeMap<String, Vec<String>>,
        /// Applied when the call carries no role or an unmapped one.
        default: Decision,
    },
    Budget {
        max_cost: f64,
        cost_field: String,
        /// Applied when the cost scalar is absent or not numeric.
        on_missing: Decision,
    },
    ToolAllowlist {
        allowed_tools: Vec<String>,
    },
    /// W002/W003 taint: the rule blocks every call it applies to.
    Misconfigured { reason: String },
}

/// One rule, ready to evaluate.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    /// The declared `type` string, kept verbatim for audit and reports
    /// (unknown types survive compilation as `Misconfigured`).
    pub type_name: String,
    pub classification: RuleClass,
    applies_literal: HashSet<String>,
    applies_globs: Vec<String>,
    pub check: CompiledCheck,
}

impl CompiledRule {
    /// Does this rule apply to the given tool name?
    ///
    /// Literal membership is O(1); glob patterns are checked in declaration
    /// order.  `"*"` matches anything.
    pub fn applies_to(&self, tool: &str) -> bool {
        self.applies_literal.contains(tool)
            || self.applies_globs.iter().any(|g| glob_match(g, tool))
    }
}

/// An immutable, validated policy.  Reload is a swap: build a new value and
/// replace the old one; in-flight evaluations keep the previous policy.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    pub policy_version: String,
    pub rules: Vec<CompiledRule>,
}

impl CompiledPolicy {
    /// Lint, then compile.
    ///
    /// Any error-severity finding (invalid regex, unknown detector,
    /// duplicate rule name) aborts with `ConfigError`; this is the
    /// fail-closed startup gate.  Warning findings taint the affected rule
    /// as `Misconfigured` but never abort.
    pub fn compile(specs: &[RuleSpec], policy_version: impl Into<String>) -> FrenumResult<Self> {
        let errors: Vec<String> = lint(specs)
            .into_iter()
            .filter(|f| f.severity == LintSeverity::Error)
            .map(|f| match &f.rule_name {
                Some(name) => format!("{} [{}]: {}", f.code.as_str(), name, f.message),
                None => format!("{}: {}", f.code.as_str(), f.message),
            })
            .collect();
        if !errors.is_empty() {
            return Err(FrenumError::ConfigError {
                reason: format!("policy failed lint: {}", errors.join("; ")),
            });
        }

        let rules = specs.iter().map(compile_rule).collect();
        Ok(Self {
            policy_version: policy_version.into(),
            rules,
        })
    }

    /// Names of deterministic rules, in declaration order.
    pub fn deterministic_rule_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter(|r| r.classification == RuleClass::Deterministic)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names of semantic rules, in declaration order.
    pub fn semantic_rule_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter(|r| r.classification == RuleClass::Semantic)
            .map(|r| r.name.clone())
            .collect()
    }
}

// ── Per-kind parameter schemas ────────────────────────────────────────────────

#[derive(Deserialize)]
struct RegexBlockParams {
    fields: Vec<String>,
    patterns: Vec<String>,
}

#[derive(Deserialize)]
struct RegexRequireParams {
    fields: Vec<String>,
    pattern: String,
}

#[derive(Deserialize)]
struct PiiDetectParams {
    detectors: Vec<String>,
    #[serde(default)]
    action: PiiAction,
}

#[derive(Deserialize)]
struct EntitlementParams {
    roles: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_block")]
    default: Decision,
}

#[derive(Deserialize)]
struct BudgetParams {
    max_cost: f64,
    #[serde(default = "default_cost_field")]
    cost_field: String,
    #[serde(default = "default_block")]
    on_missing: Decision,
}

#[derive(Deserialize)]
struct ToolAllowlistParams {
    allowed_tools: Vec<String>,
}

fn default_block() -> Decision {
    Decision::Block
}

fn default_cost_field() -> String {
    "estimated_cost".to_string()
}

// ── Compilation ───────────────────────────────────────────────────────────────

fn compile_rule(spec: &RuleSpec) -> CompiledRule {
    let (applies_literal, applies_globs) = split_applies_to(&spec.applies_to);
    CompiledRule {
        name: spec.name.clone(),
        type_name: spec.type_name.clone(),
        classification: spec.classification,
        applies_literal,
        applies_globs,
        check: compile_check(spec),
    }
}

fn split_applies_to(patterns: &[String]) -> (HashSet<String>, Vec<String>) {
    let mut literal = HashSet::new();
    let mut globs = Vec::new();
    for pattern in patterns {
        if pattern.contains('*') {
            globs.push(pattern.clone());
        } else {
            literal.insert(pattern.clone());
        }
    }
    (literal, globs)
}

fn compile_check(spec: &RuleSpec) -> CompiledCheck {
    let misconfigured = |reason: String| CompiledCheck::Misconfigured { reason };

    let Some(kind) = RuleKind::from_name(&spec.type_name) else {
        return misconfigured(format!("unknown rule type '{}'", spec.type_name));
    };

    match kind {
        RuleKind::RegexBlock => {
            let params: RegexBlockParams = match serde_json::from_value(spec.params.clone()) {
                Ok(p) => p,
                Err(e) => return misconfigured(format!("invalid regex_block params: {e}")),
            };
            if params.fields.is_empty() || params.patterns.is_empty() {
                return misconfigured("regex_block requires non-empty 'fields' and 'patterns'".to_string());
            }
            let mut patterns = Vec::with_capacity(params.patterns.len());
            for source in &params.patterns {
                match Regex::new(source) {
                    Ok(re) => patterns.push(re),
                    Err(e) => return misconfigured(format!("invalid regex pattern '{source}': {e}")),
                }
            }
            CompiledCheck::RegexBlock {
                fields: params.fields,
                patterns,
            }
        }

        RuleKind::RegexRequire => {
            let params: RegexRequireParams = match serde_json::from_value(spec.params.clone()) {
                Ok(p) => p,
                Err(e) => return misconfigured(format!("invalid regex_require params: {e}")),
            };
            if params.fields.is_empty() {
                return misconfigured("regex_require requires non-empty 'fields'".to_string());
            }
            match Regex::new(&format!("^(?:{})$", params.pattern)) {
                Ok(pattern) => CompiledCheck::RegexRequire {
                    fields: params.fields,
                    pattern,
                },
                Err(e) => misconfigured(format!("invalid regex pattern '{}': {e}", params.pattern)),
            }
        }

        RuleKind::PiiDetect => {
            let params: PiiDetectParams = match serde_json::from_value(spec.params.clone()) {
                Ok(p) => p,
                Err(e) => return misconfigured(format!("invalid pii_detect params: {e}")),
            };
            if params.detectors.is_empty() {
                return misconfigured("pii_detect requires non-empty 'detectors'".to_string());
            }
            let mut detectors = Vec::with_capacity(params.detectors.len());
            for name in &params.detectors {
                match PiiDetector::from_name(name) {
                    Some(d) => detectors.push(d),
                    None => return misconfigured(format!("unknown PII detector '{name}'")),
                }
            }
            CompiledCheck::PiiDetect {
                detectors,
                action: params.action,
            }
        }

        RuleKind::Entitlement => match serde_json::from_value::<EntitlementParams>(spec.params.clone()) {
            Ok(params) => CompiledCheck::Entitlement {
                roles: params.roles,
                default: params.default,
            },
            Err(e) => misconfigured(format!("invalid entitlement params: {e}")),
        },

        RuleKind::Budget => match serde_json::from_value::<BudgetParams>(spec.params.clone()) {
            Ok(params) => CompiledCheck::Budget {
                max_cost: params.max_cost,
                cost_field: params.cost_field,
                on_missing: params.on_missing,
            },
            Err(e) => misconfigured(format!("invalid budget params: {e}")),
        },

        RuleKind::ToolAllowlist => match serde_json::from_value::<ToolAllowlistParams>(spec.params.clone()) {
            Ok(params) => {
                if params.allowed_tools.is_empty() {
                    misconfigured("tool_allowlist requires non-empty 'allowed_tools'".to_string())
                } else {
                    CompiledCheck::ToolAllowlist {
                        allowed_tools: params.allowed_tools,
                    }
                }
            }
            Err(e) => misconfigured(format!("invalid tool_allowlist params: {e}")),
        },
    }
}

// ── Tiny glob matching ────────────────────────────────────────────────────────

/// Match `text` against a tiny glob `pattern`: `*` matches any run of
/// characters, everything else is literal.  Richer syntax is intentionally
/// unsupported; it would change coverage semantics.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let last = parts.len() - 1;

    if !text.starts_with(parts[0]) {
        return false;
    }
    let mut pos = parts[0].len();

    for (i, part) in parts.iter().enumerate().skip(1) {
        if part.is_empty() {
            continue;
        }
        if i == last {
            // The final segment anchors at the end and must not overlap
            // what earlier segments consumed.
            return text.len() >= pos + part.len() && text.ends_with(part);
        }
        match text[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }

    true
}
