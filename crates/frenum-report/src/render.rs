//! Report synthesis: text, JSON, and HTML renderings with a tamper-evident
//! evidence hash.
//!
//! All three renderings share one `ReportData` value.  The evidence hash is
//! a SHA-256 digest over a canonical serialization (outcomes in declaration
//! order, rule names sorted, numbers to fixed precision, every line
//! newline-terminated), so two runs over identical inputs always produce
//! identical hashes.  The timestamp is deliberately excluded from the
//! hashed material.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use frenum_contracts::{CoverageReport, TestOutcome};

/// One row of the rendered test table.
#[derive(Debug, Clone, Serialize)]
pub struct TestRow {
    pub description: String,
    pub tool: String,
    pub expected: String,
    pub actual: String,
    pub rule: String,
    pub passed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Everything the renderers need, in canonical form.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub generated_at: String,
    /// SHA-256 of the policy document text; empty when unavailable.
    pub policy_hash: String,
    pub summary: ReportSummary,
    pub coverage: CoverageReport,
    pub tests: Vec<TestRow>,
    pub evidence_hash: String,
}

impl ReportData {
    /// Assemble report data from a test run.
    ///
    /// `generated_at` is injected (not sampled) so reports can be
    /// reproduced exactly under a fixed clock.
    pub fn build(
        outcomes: &[TestOutcome],
        coverage: &CoverageReport,
        policy_content: &str,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let policy_hash = if policy_content.is_empty() {
            String::new()
        } else {
            sha256_hex(policy_content)
        };

        let tests: Vec<TestRow> = outcomes
            .iter()
            .map(|outcome| TestRow {
                description: outcome.description.clone(),
                tool: outcome
                    .case
                    .as_ref()
                    .map(|c| c.tool_call.name.clone())
                    .unwrap_or_default(),
                expected: outcome
                    .case
                    .as_ref()
                    .map(|c| c.expected.to_string())
                    .unwrap_or_default(),
                actual: outcome
                    .actual_decision
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                rule: outcome.actual_blocking_rule.clone().unwrap_or_default(),
                passed: outcome.passed,
                reason: outcome.reason.clone(),
            })
            .collect();

        let passed = tests.iter().filter(|t| t.passed).count();
        let summary = ReportSummary {
            total: tests.len(),
            passed,
            failed: tests.len() - passed,
        };

        let evidence_hash = evidence_hash(&policy_hash, &tests, coverage);

        Self {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            policy_hash,
            summary,
            coverage: coverage.clone(),
            tests,
            evidence_hash,
        }
    }
}

/// SHA-256 over the canonical serialization of a test run.
fn evidence_hash(policy_hash: &str, tests: &[TestRow], coverage: &CoverageReport) -> String {
    let mut canon = String::new();
    canon.push_str(&format!("policy|{policy_hash}\n"));
    for row in tests {
        canon.push_str(&format!(
            "test|{}|{}|{}|{}|{}|{}\n",
            row.description, row.tool, row.expected, row.actual, row.rule, row.passed
        ));
    }
    canon.push_str(&format!(
        "coverage|{:.1}|{}|{}\n",
        coverage.coverage_pct, coverage.total_deterministic, coverage.exercised
    ));
    for name in &coverage.rules_exercised {
        canon.push_str(&format!("exercised|{name}\n"));
    }
    for name in &coverage.rules_not_exercised {
        canon.push_str(&format!("not_exercised|{name}\n"));
    }
    for name in &coverage.semantic_rules {
        canon.push_str(&format!("semantic|{name}\n"));
    }
    sha256_hex(&canon)
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

// ── Text ─────────────────────────────────────────────────────────────────────

/// Terminal-friendly fixed-width report.
pub fn render_text(data: &ReportData) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("frenum guardrail regression test report".to_string());
    lines.push("=".repeat(50));
    lines.push(format!("Generated: {}", data.generated_at));
    if !data.policy_hash.is_empty() {
        lines.push(format!("Policy hash: {}...", &data.policy_hash[..16]));
    }
    lines.push(String::new());

    lines.push(format!(
        "Results: {}/{} passed, {} failed",
        data.summary.passed, data.summary.total, data.summary.failed
    ));
    lines.push(String::new());

    for row in &data.tests {
        let status = if row.passed { "PASS" } else { "FAIL" };
        lines.push(format!("  [{status}] {}", row.description));
        if !row.passed {
            lines.push(format!(
                "         expected={}, actual={}, reason={}",
                row.expected, row.actual, row.reason
            ));
        }
    }
    lines.push(String::new());

    let c = &data.coverage;
    lines.push(format!(
        "Coverage: {:.1}% ({}/{} deterministic rules)",
        c.coverage_pct, c.exercised, c.total_deterministic
    ));
    if !c.rules_not_exercised.is_empty() {
        lines.push(format!("  Not exercised: {}", c.rules_not_exercised.join(", ")));
    }
    if !c.semantic_rules.is_empty() {
        lines.push(format!(
            "  Semantic (manual validation required): {}",
            c.semantic_rules.join(", ")
        ));
    }
    lines.push(String::new());
    lines.push(format!("Evidence hash: {}...", &data.evidence_hash[..16]));

    lines.join("\n")
}

// ── JSON ─────────────────────────────────────────────────────────────────────

/// Machine-readable report for CI pipelines.
pub fn render_json(data: &ReportData) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

// ── HTML ─────────────────────────────────────────────────────────────────────

/// Self-contained HTML evidence report.
///
/// Rendered with deterministic string assembly: identical inputs produce
/// byte-identical output.
pub fn render_html(data: &ReportData) -> String {
    let mut rows = String::new();
    for row in &data.tests {
        let (status, color) = if row.passed {
            ("PASS", "#22c55e")
        } else {
            ("FAIL", "#ef4444")
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td style=\"color:{color};font-weight:bold\">{status}</td></tr>\n",
            escape(&row.description),
            escape(&row.expected),
            escape(&row.actual),
            escape(&row.rule),
        ));
    }

    let c = &data.coverage;
    let not_exercised = if c.rules_not_exercised.is_empty() {
        "none".to_string()
    } else {
        escape(&c.rules_not_exercised.join(", "))
    };
    let semantic = if c.semantic_rules.is_empty() {
        "none".to_string()
    } else {
        escape(&c.semantic_rules.join(", "))
    };
    let policy_hash = if data.policy_hash.is_empty() {
        "n/a".to_string()
    } else {
        format!("{}...", &data.policy_hash[..16])
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>frenum report</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 900px; margin: 2rem auto; padding: 0 1rem; }}
table {{ border-collapse: collapse; width: 100%; margin: 1rem 0; }}
th, td {{ border: 1px solid #d1d5db; padding: 0.5rem; text-align: left; }}
th {{ background: #f3f4f6; }}
.meta {{ color: #6b7280; font-size: 0.875rem; }}
.bar {{ background: #e5e7eb; border-radius: 4px; height: 12px; width: 100%; }}
.fill {{ background: #22c55e; border-radius: 4px; height: 12px; }}
</style></head>
<body>
<h1>frenum guardrail regression test report</h1>
<p class="meta">Generated: {generated}<br>
Policy hash: {policy_hash}<br>
Evidence hash: {evidence}...</p>

<h2>Results: {passed}/{total} passed, {failed} failed</h2>
<table>
<tr><th>Test</th><th>Expected</th><th>Actual</th><th>Rule</th><th>Status</th></tr>
{rows}</table>

<h2>Coverage: {pct:.1}%</h2>
<div class="bar"><div class="fill" style="width:{pct:.1}%"></div></div>
<p>{exercised}/{total_det} deterministic rules exercised</p>
<p>Not exercised: {not_exercised}</p>
<p>Semantic (manual validation required): {semantic}</p>
</body></html>
"#,
        generated = escape(&data.generated_at),
        policy_hash = policy_hash,
        evidence = &data.evidence_hash[..16],
        passed = data.summary.passed,
        total = data.summary.total,
        failed = data.summary.failed,
        rows = rows,
        pct = c.coverage_pct,
        exercised = c.exercised,
        total_det = c.total_deterministic,
        not_exercised = not_exercised,
        semantic = semantic,
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
