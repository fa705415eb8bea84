//! # frenum-report
//!
//! The regression side of frenum: run declarative test cases against a
//! compiled policy, compute guardrail coverage over its deterministic
//! rules, and synthesize reports (text / JSON / HTML) sealed with a
//! SHA-256 evidence hash.  Also aggregates audit record streams into
//! summary statistics.

pub mod render;
pub mod runner;
pub mod summary;

pub use render::{render_html, render_json, render_text, ReportData};
pub use runner::{coverage, run_tests};
pub use summary::AuditSummary;

// ── Tests ─────────────────────────────────────────────────────────────────────
