//! # frenum-policy
//!
//! Policy loading, rule compilation, linting, and the deterministic
//! evaluator for frenum.
//!
//! ## Overview
//!
//! A policy document declares an ordered list of rules.  [`Engine`] compiles
//! them (refusing to start on error-severity lint findings), then evaluates
//! tool calls with firewall semantics: rules apply in declaration order and
//! the first block wins.  Everything uncertain fails closed.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use frenum_policy::Engine;
//!
//! let engine = Engine::from_file(Path::new("policy.yaml"))?;
//! let result = engine.evaluate(&tool_call);
//! if result.decision == Decision::Block {
//!     eprintln!("blocked by {:?}: {}", result.blocking_rule, result.reason);
//! }
//! ```

pub mod engine;
pub mod lint;
pub mod loader;
pub mod rule;

pub use engine::Engine;
pub use lint::lint;
pub use loader::{load_policy_file, load_policy_str, load_tests_file, load_tests_str, LoadedCase, PolicyDoc};
pub use rule::{glob_match, CompiledCheck, CompiledPolicy, CompiledRule, PiiAction};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use frenum_contracts::{Decision, ToolCall};
    use serde_json::json;

    use crate::Engine;

    /// A realistic multi-rule policy: evaluation order, applicability, and
    /// short-circuiting all interact here.
    const LAYERED_POLICY: &str = r#"
policy_version: "1.0.0"
rules:
  - name: block_sql_injection
    type: regex_block
    applies_to: ["execute_sql"]
    params:
      fields: ["query"]
      patterns:
        - "(?i)(DROP|DELETE|TRUNCATE)\\s+TABLE"

  - name: detect_pii
    type: pii_detect
    applies_to: ["*"]
    params:
      detectors: ["email", "hk_id", "ssn"]
      action: block

  - name: allowed_tools_only
    type: tool_allowlist
    applies_to: ["*"]
    params:
      allowed_tools: ["execute_sql", "search", "get_data", "send_email"]
"#;

    #[test]
    fn layered_policy_allows_clean_calls() {
        let engine = Engine::from_yaml_str(LAYERED_POLICY).unwrap();
        let result = engine.evaluate(&ToolCall::new(
            "execute_sql",
            json!({ "query": "SELECT count(*) FROM users" }),
        ));

        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(
            result.rules_evaluated,
            vec!["block_sql_injection", "detect_pii", "allowed_tools_only"]
        );
    }

    #[test]
    fn earlier_rule_blocks_before_later_ones_run() {
        let engine = Engine::from_yaml_str(LAYERED_POLICY).unwrap();
        let result = engine.evaluate(&ToolCall::new(
            "execute_sql",
            json!({ "query": "DROP TABLE users" }),
        ));

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.blocking_rule.as_deref(), Some("block_sql_injection"));
        assert_eq!(result.rules_evaluated, vec!["block_sql_injection"]);
    }

    #[test]
    fn pii_rule_catches_any_tool() {
        let engine = Engine::from_yaml_str(LAYERED_POLICY).unwrap();
        let result = engine.evaluate(&ToolCall::new(
            "search",
            json!({ "query": "find alice@example.com" }),
        ));

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.blocking_rule.as_deref(), Some("detect_pii"));
        // The SQL rule does not apply to "search": it never ran.
        assert_eq!(result.rules_evaluated, vec!["detect_pii"]);
    }

    #[test]
    fn unknown_tool_falls_through_to_allowlist() {
        let engine = Engine::from_yaml_str(LAYERED_POLICY).unwrap();
        let result = engine.evaluate(&ToolCall::new("delete_account", json!({ "user_id": "123" })));

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.blocking_rule.as_deref(), Some("allowed_tools_only"));
        assert_eq!(result.rules_evaluated, vec!["detect_pii", "allowed_tools_only"]);
    }

    /// The same call, evaluated twice, yields byte-identical results.
    #[test]
    fn end_to_end_determinism() {
        let engine = Engine::from_yaml_str(LAYERED_POLICY).unwrap();
        let call = ToolCall::new("send_email", json!({ "body": "ssn 123-45-6789" }));

        assert_eq!(engine.evaluate(&call), engine.evaluate(&call));
    }
}
