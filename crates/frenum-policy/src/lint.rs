//! Static analysis of policy rule lists.
//!
//! `lint` is a pure function: it examines raw `RuleSpec`s and emits coded
//! findings.  It never aborts; exit semantics belong to the caller.  The
//! same checks gate `CompiledPolicy::compile`, where error-severity
//! findings become a `ConfigError`.
//!
//! | Code | Severity | Meaning                                   |
//! |------|----------|-------------------------------------------|
//! | E001 | error    | Invalid regex pattern                     |
//! | E002 | error    | Unknown PII detector                      |
//! | E003 | error    | Duplicate rule name                       |
//! | W001 | warning  | Empty `applies_to` (rule can never match) |
//! | W002 | warning  | Missing mandatory parameter               |
//! | W003 | warning  | Unknown rule type                         |

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use frenum_contracts::{LintCode, LintFinding, RuleKind, RuleSpec};
use frenum_core::pii::PiiDetector;

/// Mandatory parameter keys per known rule kind.
fn required_params(kind: RuleKind) -> &'static [&'static str] {
    match kind {
        RuleKind::RegexBlock => &["fields", "patterns"],
        RuleKind::RegexRequire => &["fields", "pattern"],
        RuleKind::PiiDetect => &["detectors"],
        RuleKind::Entitlement => &["roles"],
        RuleKind::Budget => &["max_cost"],
        RuleKind::ToolAllowlist => &["allowed_tools"],
    }
}

/// Check a rule list for configuration problems.
///
/// Findings are ordered by rule declaration order, then code ascending,
/// then message.
pub fn lint(specs: &[RuleSpec]) -> Vec<LintFinding> {
    let mut findings: Vec<(usize, LintFinding)> = Vec::new();
    let mut seen_names: HashSet<&str> = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        let mut push = |code: LintCode, message: String| {
            findings.push((index, LintFinding::new(code, Some(spec.name.clone()), message)));
        };

        // E003: duplicate rule names.
        if !seen_names.insert(spec.name.as_str()) {
            push(LintCode::E003, format!("Duplicate rule name: '{}'", spec.name));
        }

        let kind = RuleKind::from_name(&spec.type_name);

        // W003: unknown rule type.  The rule is retained and blocks
        // unconditionally at evaluation time.
        if kind.is_none() {
            push(LintCode::W003, format!("Unknown rule type: '{}'", spec.type_name));
        }

        // W001: empty applies_to, or an empty pattern inside it.
        if spec.applies_to.is_empty() {
            push(
                LintCode::W001,
                "Rule 'applies_to' list is empty; this rule will never match".to_string(),
            );
        } else {
            for pattern in &spec.applies_to {
                if pattern.is_empty() {
                    push(
                        LintCode::W001,
                        "Rule 'applies_to' contains an empty pattern".to_string(),
                    );
                }
            }
        }

        let Some(kind) = kind else {
            continue;
        };

        // W002: missing or empty mandatory params.
        for param in required_params(kind) {
            match lookup(&spec.params, param) {
                None => push(
                    LintCode::W002,
                    format!(
                        "Missing required parameter '{param}' for rule type '{}'",
                        spec.type_name
                    ),
                ),
                Some(value) if is_empty(value) => push(
                    LintCode::W002,
                    format!(
                        "Parameter '{param}' for rule type '{}' is empty",
                        spec.type_name
                    ),
                ),
                Some(_) => {}
            }
        }

        // E001: regex sources must compile.
        match kind {
            RuleKind::RegexBlock => {
                if let Some(Value::Array(patterns)) = lookup(&spec.params, "patterns") {
                    for pattern in patterns {
                        let source = stringify(pattern);
                        if let Err(e) = Regex::new(&source) {
                            push(LintCode::E001, format!("Invalid regex pattern '{source}': {e}"));
                        }
                    }
                }
            }
            RuleKind::RegexRequire => {
                if let Some(pattern) = lookup(&spec.params, "pattern") {
                    let source = stringify(pattern);
                    if let Err(e) = Regex::new(&source) {
                        push(LintCode::E001, format!("Invalid regex pattern '{source}': {e}"));
                    }
                }
            }
            _ => {}
        }

        // E002: detector names must come from the registry.
        if kind == RuleKind::PiiDetect {
            if let Some(Value::Array(detectors)) = lookup(&spec.params, "detectors") {
                for detector in detectors {
                    let name = stringify(detector);
                    if PiiDetector::from_name(&name).is_none() {
                        push(LintCode::E002, format!("Unknown PII detector: '{name}'"));
                    }
                }
            }
        }
    }

    findings.sort_by(|(ai, a), (bi, b)| {
        ai.cmp(bi)
            .then(a.code.cmp(&b.code))
            .then_with(|| a.message.cmp(&b.message))
    });
    findings.into_iter().map(|(_, f)| f).collect()
}

fn lookup<'v>(params: &'v Value, key: &str) -> Option<&'v Value> {
    params.as_object().and_then(|map| map.get(key))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frenum_contracts::{LintSeverity, RuleClass};
    use serde_json::json;

    fn spec(name: &str, type_name: &str, params: serde_json::Value) -> RuleSpec {
        RuleSpec {
            name: name.to_string(),
            type_name: type_name.to_string(),
            applies_to: vec!["*".to_string()],
            classification: RuleClass::Deterministic,
            params,
        }
    }

    fn codes(findings: &[LintFinding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn clean_policy_has_no_findings() {
        let specs = vec![
            spec(
                "block_sql",
                "regex_block",
                json!({ "fields": ["query"], "patterns": ["(?i)DROP\\s+TABLE"] }),
            ),
            spec("allowlist", "tool_allowlist", json!({ "allowed_tools": ["search"] })),
        ];
        assert!(lint(&specs).is_empty());
    }

    #[test]
    fn e001_invalid_regex() {
        let specs = vec![spec(
            "bad",
            "regex_block",
            json!({ "fields": ["q"], "patterns": ["[unclosed"] }),
        )];
        let findings = lint(&specs);

        assert_eq!(codes(&findings), vec!["E001"]);
        assert_eq!(findings[0].severity, LintSeverity::Error);
        assert!(findings[0].message.contains("[unclosed"));
    }

    #[test]
    fn e001_invalid_require_pattern() {
        let specs = vec![spec(
            "bad",
            "regex_require",
            json!({ "fields": ["id"], "pattern": "(" }),
        )];
        assert_eq!(codes(&lint(&specs)), vec!["E001"]);
    }

    #[test]
    fn e002_unknown_detector() {
        let specs = vec![spec(
            "pii",
            "pii_detect",
            json!({ "detectors": ["email", "dna"] }),
        )];
        let findings = lint(&specs);

        assert_eq!(codes(&findings), vec!["E002"]);
        assert!(findings[0].message.contains("dna"));
    }

    #[test]
    fn e003_duplicate_names() {
        let specs = vec![
            spec("dup", "tool_allowlist", json!({ "allowed_tools": ["a"] })),
            spec("dup", "tool_allowlist", json!({ "allowed_tools": ["b"] })),
        ];
        let findings = lint(&specs);

        assert_eq!(codes(&findings), vec!["E003"]);
        assert_eq!(findings[0].rule_name.as_deref(), Some("dup"));
    }

    #[test]
    fn w001_empty_applies_to() {
        let mut s = spec("never", "tool_allowlist", json!({ "allowed_tools": ["a"] }));
        s.applies_to = vec![];
        let findings = lint(&[s]);

        assert_eq!(codes(&findings), vec!["W001"]);
        assert_eq!(findings[0].severity, LintSeverity::Warning);
    }

    #[test]
    fn w001_empty_pattern_element() {
        let mut s = spec("gap", "tool_allowlist", json!({ "allowed_tools": ["a"] }));
        s.applies_to = vec!["execute_sql".to_string(), String::new()];
        assert_eq!(codes(&lint(&[s])), vec!["W001"]);
    }

    #[test]
    fn w002_missing_param() {
        let specs = vec![spec("nomax", "budget", json!({}))];
        let findings = lint(&specs);

        assert_eq!(codes(&findings), vec!["W002"]);
        assert!(findings[0].message.contains("max_cost"));
    }

    #[test]
    fn w002_empty_param() {
        let specs = vec![spec("empty", "pii_detect", json!({ "detectors": [] }))];
        assert_eq!(codes(&lint(&specs)), vec!["W002"]);
    }

    #[test]
    fn w003_unknown_type() {
        let specs = vec![spec("odd", "llm_judge", json!({}))];
        let findings = lint(&specs);

        assert_eq!(codes(&findings), vec!["W003"]);
        assert!(findings[0].message.contains("llm_judge"));
    }

    /// Findings come out ordered by declaration order, then code.
    #[test]
    fn findings_are_ordered_by_rule_then_code() {
        let specs = vec![
            // Rule 0: E001 and W002 (missing fields).
            spec("first", "regex_block", json!({ "patterns": ["[bad"] })),
            // Rule 1: W003.
            spec("second", "mystery", json!({})),
            // Rule 2: duplicate of rule 0's name -> E003.
            spec("first", "tool_allowlist", json!({ "allowed_tools": ["a"] })),
        ];
        let findings = lint(&specs);

        assert_eq!(codes(&findings), vec!["E001", "W002", "W003", "E003"]);
    }

    /// Unknown types skip kind-specific checks; a single W003 is emitted.
    #[test]
    fn unknown_type_skips_param_checks() {
        let specs = vec![spec("odd", "mystery", json!({ "anything": [] }))];
        assert_eq!(codes(&lint(&specs)), vec!["W003"]);
    }
}
