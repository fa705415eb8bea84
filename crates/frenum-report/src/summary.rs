//! Aggregation over an audit record stream.
//!
//! Computes totals, allow/block percentages, the top blocked tools and top
//! triggered rules (count descending, ties broken by name), and the human
//! override rate.  Pure data in, pure data out; reading the JSONL stream is
//! frenum-audit's job.

use std::collections::BTreeMap;

use serde::Serialize;

use frenum_contracts::{AuditRecord, Decision};

/// How many tools/rules the "top" lists keep.
const TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CountedName {
    pub name: String,
    pub count: usize,
}

/// Summary statistics over a set of audit records.
#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub total_evaluations: usize,
    pub allow_count: usize,
    pub block_count: usize,
    /// Percentage of evaluations allowed, one decimal place.
    pub allow_pct: f64,
    /// Percentage of evaluations blocked, one decimal place.
    pub block_pct: f64,
    pub top_blocked_tools: Vec<CountedName>,
    pub top_triggered_rules: Vec<CountedName>,
    /// Blocks that carry a human override.
    pub override_count: usize,
    /// overridden blocks / total blocks, as a ratio in [0, 1].
    pub override_rate: f64,
    /// Distinct policy versions seen, sorted.
    pub policy_versions: Vec<String>,
}

impl AuditSummary {
    pub fn from_records(records: &[AuditRecord]) -> Self {
        let mut allow_count = 0usize;
        let mut block_count = 0usize;
        let mut override_count = 0usize;
        let mut tool_blocks: BTreeMap<String, usize> = BTreeMap::new();
        let mut rule_triggers: BTreeMap<String, usize> = BTreeMap::new();
        let mut versions: BTreeMap<String, ()> = BTreeMap::new();

        for record in records {
            versions.insert(record.policy_version.clone(), ());
            match record.decision {
                Decision::Allow => allow_count += 1,
                Decision::Block => {
                    block_count += 1;
                    *tool_blocks.entry(record.tool_name.clone()).or_default() += 1;
                    if let Some(rule) = &record.blocking_rule {
                        *rule_triggers.entry(rule.clone()).or_default() += 1;
                    }
                    if record.human_override.is_some() {
                        override_count += 1;
                    }
                }
            }
        }

        let total = records.len();
        let pct = |count: usize| {
            if total == 0 {
                0.0
            } else {
                round_one_dp(100.0 * count as f64 / total as f64)
            }
        };
        let override_rate = if block_count == 0 {
            0.0
        } else {
            override_count as f64 / block_count as f64
        };

        Self {
            total_evaluations: total,
            allow_count,
            block_count,
            allow_pct: pct(allow_count),
            block_pct: pct(block_count),
            top_blocked_tools: top_n(tool_blocks),
            top_triggered_rules: top_n(rule_triggers),
            override_count,
            override_rate,
            policy_versions: versions.into_keys().collect(),
        }
    }

    /// Human-readable summary.
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push("=".repeat(40));
        lines.push("FRENUM AUDIT SUMMARY".to_string());
        lines.push("=".repeat(40));
        lines.push(format!(
            "Policy versions: {}",
            if self.policy_versions.is_empty() {
                "n/a".to_string()
            } else {
                self.policy_versions.join(", ")
            }
        ));
        lines.push(String::new());
        lines.push(format!("Total evaluations: {}", self.total_evaluations));
        lines.push(format!(
            "  Allow: {:>6} ({:.1}%)",
            self.allow_count, self.allow_pct
        ));
        lines.push(format!(
            "  Block: {:>6} ({:.1}%)",
            self.block_count, self.block_pct
        ));

        if !self.top_blocked_tools.is_empty() {
            lines.push(String::new());
            lines.push("Top blocked tools:".to_string());
            for (i, entry) in self.top_blocked_tools.iter().enumerate() {
                lines.push(format!("  {}. {:<30} {} blocks", i + 1, entry.name, entry.count));
            }
        }

        if !self.top_triggered_rules.is_empty() {
            lines.push(String::new());
            lines.push("Top triggered rules:".to_string());
            for (i, entry) in self.top_triggered_rules.iter().enumerate() {
                lines.push(format!("  {}. {:<30} {} triggers", i + 1, entry.name, entry.count));
            }
        }

        if self.block_count > 0 {
            lines.push(String::new());
            lines.push(format!(
                "Human override rate: {:.1}% ({} of {} blocks overridden)",
                self.override_rate * 100.0,
                self.override_count,
                self.block_count
            ));
        }

        lines.push("=".repeat(40));
        lines.join("\n")
    }

    /// Machine-readable rendering.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Top-N entries by count descending; ties break by name ascending.  The
/// BTreeMap input already orders names, so the sort is fully deterministic.
fn top_n(counts: BTreeMap<String, usize>) -> Vec<CountedName> {
    let mut entries: Vec<CountedName> = counts
        .into_iter()
        .map(|(name, count)| CountedName { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(TOP_N);
    entries
}

fn round_one_dp(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
