//! The deterministic short-circuit evaluator.
//!
//! Evaluation algorithm:
//!
//! 1. Build the ordered list of applicable rules: those whose `applies_to`
//!    matches the tool name (literal or tiny glob; `"*"` matches anything),
//!    in declaration order.  Semantic-classified rules are tracked but
//!    never enforced.
//! 2. Apply each rule in order.  The first `block` terminates evaluation;
//!    rules after it are never applied.
//! 3. If every applicable rule passes, the call is allowed.
//!
//! The evaluator is total: for any constructed policy and any `ToolCall`
//! it returns an `EvaluationResult`.  Every internal failure inside a rule
//! (bad cost value, misconfigured parameters) folds into a `block` with an
//! explanatory reason instead of an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use frenum_contracts::{
    Decision, EvaluationResult, FrenumResult, Redaction, RuleClass, RuleSpec, ToolCall,
};
use frenum_core::pii::scan_all;
use frenum_core::probe::{canonical_scalar, probe_selected, select, Probe};
use frenum_core::traits::DecisionSink;

use crate::loader::load_policy_file;
use crate::rule::{glob_match, CompiledCheck, CompiledPolicy, CompiledRule, PiiAction};

/// The outcome of applying one rule to one call.
enum RuleOutcome {
    Pass,
    Block(String),
}

/// The frenum policy engine.
///
/// Construct once per policy; the compiled rule set is immutable, so
/// `evaluate` is safe to call from any number of concurrent readers.
/// Reloading a policy means building a new `Engine` and swapping it in;
/// in-flight evaluations finish against the old one.
pub struct Engine {
    policy: CompiledPolicy,
    /// Memoised tool name to applicable rule indices.  The rule set never
    /// mutates, so entries stay valid for the engine's lifetime.
    applicable_cache: RwLock<HashMap<String, Arc<Vec<usize>>>>,
    sink: Option<Arc<dyn DecisionSink>>,
}

impl Engine {
    /// Wrap an already compiled policy.
    pub fn new(policy: CompiledPolicy) -> Self {
        Self {
            policy,
            applicable_cache: RwLock::new(HashMap::new()),
            sink: None,
        }
    }

    /// Lint-gate and compile raw rule specs.
    ///
    /// Returns `ConfigError` on any error-severity lint finding (invalid
    /// regex, unknown detector, duplicate name): enforcement must not start
    /// on a policy that cannot mean what it says.
    pub fn from_specs(specs: &[RuleSpec], policy_version: impl Into<String>) -> FrenumResult<Self> {
        Ok(Self::new(CompiledPolicy::compile(specs, policy_version)?))
    }

    /// Parse `text` as a YAML policy document and build an engine.
    pub fn from_yaml_str(text: &str) -> FrenumResult<Self> {
        let doc = crate::loader::load_policy_str(text)?;
        Self::from_specs(&doc.rules, doc.policy_version)
    }

    /// Read the policy document at `path` and build an engine.
    pub fn from_file(path: &Path) -> FrenumResult<Self> {
        let doc = load_policy_file(path)?;
        Self::from_specs(&doc.rules, doc.policy_version)
    }

    /// Attach a per-decision callback (e.g. an audit logger).
    ///
    /// The sink observes every evaluation after the decision is final and
    /// can never change it.
    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn policy(&self) -> &CompiledPolicy {
        &self.policy
    }

    /// Evaluate one tool call against the policy.
    ///
    /// Total and deterministic: identical inputs produce byte-identical
    /// results, and no error ever escapes.
    pub fn evaluate(&self, call: &ToolCall) -> EvaluationResult {
        debug!(tool = %call.name, "evaluating tool call");

        let indices = self.applicable(&call.name);

        let mut rules_evaluated: Vec<String> = Vec::new();
        let mut matched_paths: Vec<String> = Vec::new();
        let mut redactions: Vec<Redaction> = Vec::new();
        let mut blocked: Option<(String, String)> = None;

        for &index in indices.iter() {
            let rule = &self.policy.rules[index];
            rules_evaluated.push(rule.name.clone());

            match apply_rule(rule, call, &mut matched_paths, &mut redactions) {
                RuleOutcome::Pass => {}
                RuleOutcome::Block(reason) => {
                    warn!(
                        tool = %call.name,
                        rule = %rule.name,
                        reason = %reason,
                        "tool call blocked"
                    );
                    blocked = Some((rule.name.clone(), reason));
                    break;
                }
            }
        }

        let result = match blocked {
            Some((blocking_rule, reason)) => EvaluationResult {
                decision: Decision::Block,
                reason,
                blocking_rule: Some(blocking_rule),
                rules_evaluated,
                matched_paths,
                redactions,
            },
            None => {
                debug!(
                    tool = %call.name,
                    rules = rules_evaluated.len(),
                    "tool call allowed"
                );
                EvaluationResult {
                    decision: Decision::Allow,
                    reason: "No rule blocked".to_string(),
                    blocking_rule: None,
                    rules_evaluated,
                    matched_paths,
                    redactions,
                }
            }
        };

        if let Some(sink) = &self.sink {
            sink.on_decision(call, &result);
        }

        result
    }

    /// Ordered indices of the deterministic rules applicable to `tool`.
    fn applicable(&self, tool: &str) -> Arc<Vec<usize>> {
        if let Some(cached) = self
            .applicable_cache
            .read()
            .expect("applicability cache lock poisoned")
            .get(tool)
        {
            return cached.clone();
        }

        let indices: Vec<usize> = self
            .policy
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                rule.classification == RuleClass::Deterministic && rule.applies_to(tool)
            })
            .map(|(index, _)| index)
            .collect();

        self.applicable_cache
            .write()
            .expect("applicability cache lock poisoned")
            .entry(tool.to_string())
            .or_insert_with(|| Arc::new(indices))
            .clone()
    }
}

// ── Per-rule evaluation ───────────────────────────────────────────────────────

fn apply_rule(
    rule: &CompiledRule,
    call: &ToolCall,
    matched_paths: &mut Vec<String>,
    redactions: &mut Vec<Redaction>,
) -> RuleOutcome {
    match &rule.check {
        CompiledCheck::Misconfigured { reason } => {
            RuleOutcome::Block(format!("Rule misconfigured: {reason}"))
        }

        CompiledCheck::RegexBlock { fields, patterns } => {
            for field in fields {
                for (path, scalar) in probe_selected(&call.args, field) {
                    for pattern in patterns {
                        if let Some(found) = pattern.find(&scalar) {
                            let snippet: String = found.as_str().chars().take(50).collect();
                            record_match(matched_paths, redactions, &path, &rule.name);
                            return RuleOutcome::Block(format!(
                                "Pattern matched in '{path}': {snippet}"
                            ));
                        }
                    }
                }
            }
            RuleOutcome::Pass
        }

        CompiledCheck::RegexRequire { fields, pattern } => {
            for field in fields {
                // Null counts as missing; only real scalars satisfy a
                // required field.
                let scalars: Vec<(String, String)> = select(&call.args, field)
                    .into_iter()
                    .filter(|(_, node)| !node.is_null())
                    .filter_map(|(path, node)| canonical_scalar(node).map(|s| (path, s)))
                    .collect();

                if scalars.is_empty() {
                    return RuleOutcome::Block(format!(
                        "Required field '{field}' missing or invalid"
                    ));
                }
                for (_, scalar) in &scalars {
                    if scalar.is_empty() || !pattern.is_match(scalar) {
                        return RuleOutcome::Block(format!(
                            "Required field '{field}' missing or invalid"
                        ));
                    }
                }
            }
            RuleOutcome::Pass
        }

        CompiledCheck::PiiDetect { detectors, action } => {
            let mut first: Option<(String, &'static str)> = None;
            for (path, scalar) in Probe::new(&call.args) {
                let findings = scan_all(&scalar, detectors);
                if findings.is_empty() {
                    continue;
                }
                for finding in &findings {
                    record_match(matched_paths, redactions, &path, finding.detector.name());
                }
                if first.is_none() {
                    first = Some((path.clone(), findings[0].detector.name()));
                }
            }

            match (first, action) {
                (Some((path, detector)), PiiAction::Block) => {
                    RuleOutcome::Block(format!("PII detected ({detector}) in '{path}'"))
                }
                _ => RuleOutcome::Pass,
            }
        }

        CompiledCheck::Entitlement { roles, default } => {
            let role = call.args.get("role").and_then(|v| v.as_str()).unwrap_or("");
            let denied = || {
                RuleOutcome::Block(format!("Role '{role}' not entitled to '{}'", call.name))
            };
            match roles.get(role) {
                Some(allowed) if allowed.iter().any(|p| glob_match(p, &call.name)) => {
                    RuleOutcome::Pass
                }
                Some(_) => denied(),
                None => match default {
                    Decision::Allow => RuleOutcome::Pass,
                    Decision::Block => denied(),
                },
            }
        }

        CompiledCheck::Budget {
            max_cost,
            cost_field,
            on_missing,
        } => {
            let cost = probe_selected(&call.args, cost_field)
                .first()
                .and_then(|(_, scalar)| scalar.parse::<f64>().ok());
            match cost {
                None => match on_missing {
                    Decision::Allow => RuleOutcome::Pass,
                    Decision::Block => RuleOutcome::Block(format!(
                        "Estimated cost unavailable: '{cost_field}' missing or not numeric"
                    )),
                },
                Some(cost) if cost > *max_cost => RuleOutcome::Block(format!(
                    "Estimated cost {cost} exceeds max_cost {max_cost}"
                )),
                Some(_) => RuleOutcome::Pass,
            }
        }

        CompiledCheck::ToolAllowlist { allowed_tools } => {
            if allowed_tools.iter().any(|p| glob_match(p, &call.name)) {
                RuleOutcome::Pass
            } else {
                RuleOutcome::Block(format!("Tool '{}' not in allowlist", call.name))
            }
        }
    }
}

/// Record a matched path (deduplicated, order-preserving) and its redaction
/// label (first label wins per path).
fn record_match(
    matched_paths: &mut Vec<String>,
    redactions: &mut Vec<Redaction>,
    path: &str,
    label: &str,
) {
    if !matched_paths.iter().any(|p| p == path) {
        matched_paths.push(path.to_string());
    }
    if !redactions.iter().any(|r| r.path == path) {
        redactions.push(Redaction {
            path: path.to_string(),
            label: label.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn engine(yaml: &str) -> Engine {
        Engine::from_yaml_str(yaml).unwrap()
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall::new(name, args)
    }

    const SQL_POLICY: &str = r#"
policy_version: "1.0.0"
rules:
  - name: block_sql_injection
    type: regex_block
    applies_to: ["execute_sql"]
    params:
      fields: ["query"]
      patterns:
        - "(?i)(DROP|DELETE|TRUNCATE)\\s+TABLE"
"#;

    // ── Scenario: regex_block ────────────────────────────────────────────────

    #[test]
    fn sql_injection_is_blocked() {
        let result = engine(SQL_POLICY).evaluate(&call("execute_sql", json!({ "query": "DROP TABLE users" })));

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.blocking_rule.as_deref(), Some("block_sql_injection"));
        assert!(result.reason.contains("query"), "reason should name the field: {}", result.reason);
        assert!(result.reason.contains("DROP TABLE"), "reason should show the match: {}", result.reason);
    }

    #[test]
    fn clean_query_is_allowed() {
        let result = engine(SQL_POLICY).evaluate(&call("execute_sql", json!({ "query": "SELECT 1" })));

        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(result.reason, "No rule blocked");
        assert_eq!(result.rules_evaluated, vec!["block_sql_injection"]);
    }

    #[test]
    fn regex_block_probes_nested_fields() {
        let yaml = r#"
rules:
  - name: no_secrets
    type: regex_block
    applies_to: ["*"]
    params:
      fields: ["body"]
      patterns: ["secret-\\d+"]
"#;
        let result = engine(yaml).evaluate(&call(
            "send_email",
            json!({ "body": { "text": "attaching secret-42 here" } }),
        ));

        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.contains("body.text"));
        assert_eq!(result.matched_paths, vec!["body.text"]);
    }

    // ── Scenario: regex_require ──────────────────────────────────────────────

    const CONFIRM_POLICY: &str = r#"
rules:
  - name: require_confirmation
    type: regex_require
    applies_to: ["send_email"]
    params:
      fields: ["confirmation_id"]
      pattern: "CONF-[A-Z0-9]{8}"
"#;

    #[test]
    fn missing_required_field_blocks() {
        let result = engine(CONFIRM_POLICY).evaluate(&call("send_email", json!({ "to": "a@b.c" })));

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.blocking_rule.as_deref(), Some("require_confirmation"));
        assert!(result.reason.contains("confirmation_id"));
    }

    #[test]
    fn partial_match_is_not_full_match() {
        // The pattern must match the whole value, not a substring.
        let result = engine(CONFIRM_POLICY).evaluate(&call(
            "send_email",
            json!({ "confirmation_id": "prefix CONF-ABCD1234 suffix" }),
        ));
        assert_eq!(result.decision, Decision::Block);
    }

    #[test]
    fn valid_required_field_passes() {
        let result = engine(CONFIRM_POLICY).evaluate(&call(
            "send_email",
            json!({ "confirmation_id": "CONF-ABCD1234" }),
        ));
        assert_eq!(result.decision, Decision::Allow);
    }

    #[test]
    fn empty_required_field_blocks() {
        let result = engine(CONFIRM_POLICY)
            .evaluate(&call("send_email", json!({ "confirmation_id": "" })));
        assert_eq!(result.decision, Decision::Block);
    }

    // ── Scenario: pii_detect ─────────────────────────────────────────────────

    #[test]
    fn hk_id_in_body_blocks_and_names_path() {
        let yaml = r#"
rules:
  - name: detect_pii
    type: pii_detect
    applies_to: ["*"]
    params:
      detectors: ["hk_id"]
      action: block
"#;
        let result = engine(yaml).evaluate(&call(
            "send_email",
            json!({ "body": "Customer HKID is A123456(8)" }),
        ));

        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.contains("body"), "reason: {}", result.reason);
        assert!(result.reason.contains("hk_id"), "reason: {}", result.reason);
        assert_eq!(result.redactions.len(), 1);
        assert_eq!(result.redactions[0].path, "body");
        assert_eq!(result.redactions[0].label, "hk_id");
    }

    #[test]
    fn pii_flag_mode_allows_but_records() {
        let yaml = r#"
rules:
  - name: flag_email
    type: pii_detect
    applies_to: ["*"]
    params:
      detectors: ["email"]
      action: flag
"#;
        let result = engine(yaml).evaluate(&call(
            "search",
            json!({ "query": "who is alice@example.com" }),
        ));

        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(result.matched_paths, vec!["query"]);
        assert_eq!(result.redactions[0].label, "email");
    }

    // ── Scenario: entitlement ────────────────────────────────────────────────

    const ENTITLEMENT_POLICY: &str = r#"
rules:
  - name: role_gate
    type: entitlement
    applies_to: ["*"]
    params:
      roles:
        analyst: ["search", "get_data"]
        admin: ["*"]
      default: block
"#;

    #[test]
    fn analyst_cannot_execute_sql() {
        let result = engine(ENTITLEMENT_POLICY)
            .evaluate(&call("execute_sql", json!({ "role": "analyst" })));

        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.contains("analyst"));
        assert!(result.reason.contains("execute_sql"));
    }

    #[test]
    fn admin_wildcard_allows_everything() {
        let result = engine(ENTITLEMENT_POLICY)
            .evaluate(&call("execute_sql", json!({ "role": "admin" })));
        assert_eq!(result.decision, Decision::Allow);
    }

    #[test]
    fn unknown_role_uses_default() {
        let result = engine(ENTITLEMENT_POLICY)
            .evaluate(&call("search", json!({ "role": "intern" })));
        assert_eq!(result.decision, Decision::Block);

        let result = engine(ENTITLEMENT_POLICY).evaluate(&call("search", json!({})));
        assert_eq!(result.decision, Decision::Block);
    }

    // ── Scenario: budget ─────────────────────────────────────────────────────

    const BUDGET_POLICY: &str = r#"
rules:
  - name: cost_cap
    type: budget
    applies_to: ["*"]
    params:
      max_cost: 10.0
"#;

    #[test]
    fn cost_over_budget_blocks() {
        let result = engine(BUDGET_POLICY)
            .evaluate(&call("search", json!({ "estimated_cost": 12.5 })));

        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.contains("12.5"));
        assert!(result.reason.contains("10"));
    }

    #[test]
    fn cost_within_budget_passes() {
        let result = engine(BUDGET_POLICY)
            .evaluate(&call("search", json!({ "estimated_cost": 10.0 })));
        assert_eq!(result.decision, Decision::Allow);
    }

    #[test]
    fn missing_cost_fails_closed() {
        let result = engine(BUDGET_POLICY).evaluate(&call("search", json!({})));
        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.contains("estimated_cost"));
    }

    #[test]
    fn non_numeric_cost_fails_closed() {
        let result = engine(BUDGET_POLICY)
            .evaluate(&call("search", json!({ "estimated_cost": "cheap" })));
        assert_eq!(result.decision, Decision::Block);
    }

    #[test]
    fn missing_cost_can_be_allowed_explicitly() {
        let yaml = r#"
rules:
  - name: lenient_cap
    type: budget
    applies_to: ["*"]
    params:
      max_cost: 10.0
      on_missing: allow
"#;
        let result = engine(yaml).evaluate(&call("search", json!({})));
        assert_eq!(result.decision, Decision::Allow);
    }

    // ── Scenario: tool_allowlist ─────────────────────────────────────────────

    #[test]
    fn unlisted_tool_is_blocked() {
        let yaml = r#"
rules:
  - name: allowed_tools_only
    type: tool_allowlist
    applies_to: ["*"]
    params:
      allowed_tools: ["execute_sql", "search", "get_*"]
"#;
        let eng = engine(yaml);

        assert_eq!(eng.evaluate(&call("search", json!({}))).decision, Decision::Allow);
        assert_eq!(eng.evaluate(&call("get_data", json!({}))).decision, Decision::Allow);

        let result = eng.evaluate(&call("delete_account", json!({})));
        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.contains("delete_account"));
    }

    // ── Ordering and applicability ───────────────────────────────────────────

    #[test]
    fn first_block_wins_and_short_circuits() {
        let yaml = r#"
rules:
  - name: first_gate
    type: tool_allowlist
    applies_to: ["*"]
    params:
      allowed_tools: ["search"]
  - name: second_gate
    type: tool_allowlist
    applies_to: ["*"]
    params:
      allowed_tools: ["nothing"]
"#;
        let result = engine(yaml).evaluate(&call("execute_sql", json!({})));

        assert_eq!(result.blocking_rule.as_deref(), Some("first_gate"));
        // Rules after the first block never appear.
        assert_eq!(result.rules_evaluated, vec!["first_gate"]);
    }

    #[test]
    fn inapplicable_rules_never_appear() {
        let result = engine(SQL_POLICY).evaluate(&call("send_email", json!({ "query": "DROP TABLE x" })));

        assert_eq!(result.decision, Decision::Allow);
        assert!(result.rules_evaluated.is_empty());
    }

    #[test]
    fn glob_applies_to_matches() {
        let yaml = r#"
rules:
  - name: sql_only
    type: regex_block
    applies_to: ["*_sql"]
    params:
      fields: ["query"]
      patterns: ["DROP"]
"#;
        let eng = engine(yaml);

        let hit = eng.evaluate(&call("execute_sql", json!({ "query": "DROP x" })));
        assert_eq!(hit.decision, Decision::Block);

        let miss = eng.evaluate(&call("search", json!({ "query": "DROP x" })));
        assert!(miss.rules_evaluated.is_empty());
    }

    #[test]
    fn semantic_rules_are_not_enforced() {
        let yaml = r#"
rules:
  - name: human_review
    type: tool_allowlist
    kind: semantic
    applies_to: ["*"]
    params:
      allowed_tools: ["nothing"]
"#;
        let result = engine(yaml).evaluate(&call("execute_sql", json!({})));

        assert_eq!(result.decision, Decision::Allow);
        assert!(result.rules_evaluated.is_empty());
    }

    // ── Fail closed ──────────────────────────────────────────────────────────

    #[test]
    fn unknown_type_blocks_on_evaluation() {
        let yaml = r#"
rules:
  - name: odd
    type: llm_judge
    applies_to: ["*"]
    params: {}
"#;
        let result = engine(yaml).evaluate(&call("anything", json!({})));

        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.starts_with("Rule misconfigured:"), "reason: {}", result.reason);
        assert_eq!(result.blocking_rule.as_deref(), Some("odd"));
    }

    #[test]
    fn missing_params_block_on_evaluation() {
        let yaml = r#"
rules:
  - name: incomplete
    type: regex_block
    applies_to: ["*"]
    params: {}
"#;
        let result = engine(yaml).evaluate(&call("anything", json!({})));
        assert_eq!(result.decision, Decision::Block);
        assert!(result.reason.starts_with("Rule misconfigured:"));
    }

    #[test]
    fn invalid_regex_fails_construction() {
        let yaml = r#"
rules:
  - name: broken
    type: regex_block
    applies_to: ["*"]
    params:
      fields: ["q"]
      patterns: ["[unclosed"]
"#;
        assert!(Engine::from_yaml_str(yaml).is_err());
    }

    // ── Determinism ──────────────────────────────────────────────────────────

    #[test]
    fn evaluation_is_deterministic() {
        let eng = engine(SQL_POLICY);
        let tool_call = call("execute_sql", json!({ "query": "DROP TABLE users" }));

        let first = eng.evaluate(&tool_call);
        let second = eng.evaluate(&tool_call);

        assert_eq!(first, second);
    }

    #[test]
    fn applicability_cache_does_not_change_results() {
        let eng = engine(SQL_POLICY);

        // Prime the cache, then evaluate a different tool and the same one
        // again; results must be unaffected.
        let a = eng.evaluate(&call("execute_sql", json!({ "query": "SELECT 1" })));
        let _ = eng.evaluate(&call("send_email", json!({})));
        let b = eng.evaluate(&call("execute_sql", json!({ "query": "SELECT 1" })));

        assert_eq!(a, b);
    }

    // ── Sink ─────────────────────────────────────────────────────────────────

    struct RecordingSink {
        seen: Mutex<Vec<(String, Decision)>>,
    }

    impl DecisionSink for RecordingSink {
        fn on_decision(&self, call: &ToolCall, result: &EvaluationResult) {
            self.seen
                .lock()
                .unwrap()
                .push((call.name.clone(), result.decision));
        }
    }

    #[test]
    fn sink_observes_every_decision() {
        let sink = Arc::new(RecordingSink {
            seen: Mutex::new(vec![]),
        });
        let eng = engine(SQL_POLICY).with_sink(sink.clone());

        eng.evaluate(&call("execute_sql", json!({ "query": "DROP TABLE t" })));
        eng.evaluate(&call("execute_sql", json!({ "query": "SELECT 1" })));

        let seen = sink.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("execute_sql".to_string(), Decision::Block),
                ("execute_sql".to_string(), Decision::Allow),
            ]
        );
    }
}
