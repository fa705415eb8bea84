//! Declarative regression tests and guardrail coverage.
//!
//! The runner drives the evaluator with `TestCase`s and checks the decision
//! (and, for blocks, the blocking rule) against expectations.  Coverage is
//! computed over deterministic rules only: a rule counts as exercised when
//! any outcome saw it in `rules_evaluated` or as the blocking rule.
//! Semantic rules are listed separately and never enter the percentage.

use std::collections::BTreeSet;

use frenum_contracts::{CoverageReport, Decision, TestOutcome};
use frenum_policy::{CompiledPolicy, Engine, LoadedCase};

/// Run every loaded case against the engine.
///
/// Cases that failed to parse (`LoadedCase::Invalid`) become failed
/// outcomes carrying the parse diagnostic; they never abort the run.
pub fn run_tests(engine: &Engine, cases: &[LoadedCase]) -> Vec<TestOutcome> {
    cases
        .iter()
        .map(|loaded| match loaded {
            LoadedCase::Case(case) => {
                let result = engine.evaluate(&case.tool_call);

                let mut passed = result.decision == case.expected;
                let mut reason = result.reason.clone();

                if !passed {
                    reason = format!(
                        "Expected {}, got {}: {}",
                        case.expected, result.decision, result.reason
                    );
                } else if let Some(expected_rule) = &case.expected_rule {
                    if case.expected == Decision::Block
                        && result.blocking_rule.as_deref() != Some(expected_rule.as_str())
                    {
                        passed = false;
                        reason = format!(
                            "Expected rule '{}', got '{}'",
                            expected_rule,
                            result.blocking_rule.as_deref().unwrap_or("none")
                        );
                    }
                }

                TestOutcome {
                    description: case.description.clone(),
                    case: Some(case.clone()),
                    actual_decision: Some(result.decision),
                    actual_blocking_rule: result.blocking_rule.clone(),
                    rules_evaluated: result.rules_evaluated.clone(),
                    passed,
                    reason,
                }
            }
            LoadedCase::Invalid { description, error } => TestOutcome {
                description: description.clone(),
                case: None,
                actual_decision: None,
                actual_blocking_rule: None,
                rules_evaluated: vec![],
                passed: false,
                reason: error.clone(),
            },
        })
        .collect()
}

/// Guardrail coverage of `policy` given a set of test outcomes.
pub fn coverage(policy: &CompiledPolicy, outcomes: &[TestOutcome]) -> CoverageReport {
    let deterministic: BTreeSet<String> = policy.deterministic_rule_names().into_iter().collect();
    let semantic: Vec<String> = {
        let mut names = policy.semantic_rule_names();
        names.sort();
        names
    };

    let mut exercised: BTreeSet<String> = BTreeSet::new();
    for outcome in outcomes {
        exercised.extend(outcome.rules_evaluated.iter().cloned());
        if let Some(rule) = &outcome.actual_blocking_rule {
            exercised.insert(rule.clone());
        }
    }

    let covered: Vec<String> = deterministic.intersection(&exercised).cloned().collect();
    let not_covered: Vec<String> = deterministic
        .difference(&exercised)
        .cloned()
        .collect();

    let coverage_pct = if deterministic.is_empty() {
        0.0
    } else {
        round_one_dp(100.0 * covered.len() as f64 / deterministic.len() as f64)
    };

    CoverageReport {
        total_deterministic: deterministic.len(),
        exercised: covered.len(),
        coverage_pct,
        rules_exercised: covered,
        rules_not_exercised: not_covered,
        semantic_rules: semantic,
    }
}

fn round_one_dp(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
