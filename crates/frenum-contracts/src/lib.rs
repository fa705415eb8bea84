//! # frenum-contracts
//!
//! Shared types, schemas, and contracts for the frenum policy engine.
//!
//! All crates in the workspace import from here.  No business logic lives in
//! this crate, only data definitions and error types.

pub mod call;
pub mod error;
pub mod lint;
pub mod outcome;
pub mod record;
pub mod rule;

pub use call::ToolCall;
pub use error::{FrenumError, FrenumResult};
pub use lint::{LintCode, LintFinding, LintSeverity};
pub use outcome::{CoverageReport, Decision, EvaluationResult, Redaction, TestCase, TestOutcome};
pub use record::{AuditRecord, HumanOverride};
pub use rule::{RuleClass, RuleKind, RuleSpec};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Decision ─────────────────────────────────────────────────────────────

    #[test]
    fn decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Decision::Allow).unwrap(), "\"allow\"");
        assert_eq!(serde_json::to_string(&Decision::Block).unwrap(), "\"block\"");
    }

    #[test]
    fn decision_round_trips() {
        let decoded: Decision = serde_json::from_str("\"block\"").unwrap();
        assert_eq!(decoded, Decision::Block);
    }

    // ── RuleKind ─────────────────────────────────────────────────────────────

    #[test]
    fn rule_kind_names_round_trip() {
        for kind in RuleKind::ALL {
            assert_eq!(RuleKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn rule_kind_unknown_name_is_none() {
        assert_eq!(RuleKind::from_name("llm_judge"), None);
        assert_eq!(RuleKind::from_name(""), None);
    }

    // ── RuleSpec defaults ─────────────────────────────────────────────────────

    #[test]
    fn rule_spec_defaults_applies_to_star_and_deterministic() {
        let spec: RuleSpec = serde_json::from_value(json!({
            "name": "r1",
            "type": "tool_allowlist",
            "params": { "allowed_tools": ["search"] }
        }))
        .unwrap();

        assert_eq!(spec.applies_to, vec!["*".to_string()]);
        assert_eq!(spec.classification, RuleClass::Deterministic);
    }

    #[test]
    fn rule_spec_semantic_kind_parses() {
        let spec: RuleSpec = serde_json::from_value(json!({
            "name": "needs_review",
            "type": "regex_block",
            "kind": "semantic",
            "params": {}
        }))
        .unwrap();

        assert_eq!(spec.classification, RuleClass::Semantic);
    }

    // ── LintCode severity ─────────────────────────────────────────────────────

    #[test]
    fn lint_code_severity_split() {
        assert_eq!(LintCode::E001.severity(), LintSeverity::Error);
        assert_eq!(LintCode::E002.severity(), LintSeverity::Error);
        assert_eq!(LintCode::E003.severity(), LintSeverity::Error);
        assert_eq!(LintCode::W001.severity(), LintSeverity::Warning);
        assert_eq!(LintCode::W002.severity(), LintSeverity::Warning);
        assert_eq!(LintCode::W003.severity(), LintSeverity::Warning);
    }

    #[test]
    fn lint_finding_derives_severity_from_code() {
        let finding = LintFinding::new(LintCode::E003, Some("dup".to_string()), "Duplicate rule name: 'dup'");
        assert!(finding.is_error());

        let finding = LintFinding::new(LintCode::W001, None, "empty applies_to");
        assert!(!finding.is_error());
    }

    // ── AuditRecord wire format ───────────────────────────────────────────────

    /// Field order in the JSON line is part of the audit contract.
    #[test]
    fn audit_record_key_order_is_fixed() {
        let record = AuditRecord {
            decision_id: "d-1".to_string(),
            timestamp: "2026-08-02T12:00:00.000Z".to_string(),
            policy_version: "1.0.0".to_string(),
            tool_name: "execute_sql".to_string(),
            tool_args: json!({ "query": "SELECT 1" }),
            decision: Decision::Allow,
            rules_evaluated: vec!["block_sql_injection".to_string()],
            blocking_rule: None,
            human_override: None,
            trace_id: None,
        };

        let line = serde_json::to_string(&record).unwrap();
        let expected_order = [
            "decision_id",
            "timestamp",
            "policy_version",
            "tool_name",
            "tool_args",
            "decision",
            "rules_evaluated",
            "blocking_rule",
            "human_override",
            "trace_id",
        ];

        let mut last = 0;
        for key in expected_order {
            let needle = format!("\"{key}\"");
            let pos = line[last..]
                .find(&needle)
                .unwrap_or_else(|| panic!("key '{key}' missing or out of order in {line}"));
            last += pos + needle.len();
        }
    }

    /// Readers must tolerate unknown fields and missing optional ones.
    #[test]
    fn audit_record_reader_ignores_unknown_fields() {
        let line = r#"{
            "decision_id": "d-2",
            "timestamp": "2026-08-02T12:00:00.000Z",
            "policy_version": "1.0.0",
            "tool_name": "search",
            "tool_args": {},
            "decision": "block",
            "some_future_field": 42
        }"#;

        let record: AuditRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.decision, Decision::Block);
        assert!(record.rules_evaluated.is_empty());
        assert!(record.blocking_rule.is_none());
        assert!(record.human_override.is_none());
    }

    // ── ToolCall ─────────────────────────────────────────────────────────────

    #[test]
    fn tool_call_trace_id_builder() {
        let call = ToolCall::new("search", json!({ "q": "x" })).with_trace_id("trace-7");
        assert_eq!(call.trace_id.as_deref(), Some("trace-7"));
    }

    #[test]
    fn tool_call_args_default_to_null() {
        let call: ToolCall = serde_json::from_value(json!({ "name": "noop" })).unwrap();
        assert!(call.args.is_null());
        assert!(call.trace_id.is_none());
    }

    // ── FrenumError display messages ─────────────────────────────────────────

    #[test]
    fn error_config_display() {
        let err = FrenumError::ConfigError {
            reason: "duplicate rule name 'x'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("duplicate rule name 'x'"));
    }

    #[test]
    fn error_audit_write_display() {
        let err = FrenumError::AuditWriteFailed {
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("audit write failed"));
        assert!(msg.contains("disk full"));
    }
}
