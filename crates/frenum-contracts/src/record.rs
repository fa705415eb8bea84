//! The append-only audit record schema.
//!
//! One `AuditRecord` is written per evaluation, as a single JSON object on
//! its own line.  Field order is fixed by struct declaration order and is
//! part of the wire contract; readers ignore unknown fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::Decision;

/// A human decision layered on top of an engine decision.
///
/// Overrides are annotative: the record's `decision` field keeps the
/// original engine decision, and the override sits beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanOverride {
    /// Who overrode (operator id, email, ...).
    pub actor: String,
    /// Why the engine decision was overridden.
    pub reason: String,
    /// The decision the human substituted.
    pub new_decision: Decision,
}

/// One line of the audit log.
///
/// `tool_args` is a redacted deep copy of the call's arguments: scalars
/// that triggered a `regex_block` pattern or a PII detector are replaced
/// with `"<redacted:<label>>"`, everything else is preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Universally unique identifier for this decision.
    pub decision_id: String,

    /// RFC3339 UTC timestamp with millisecond precision.
    pub timestamp: String,

    /// The `policy_version` from the policy document that was enforced.
    pub policy_version: String,

    pub tool_name: String,

    /// Redacted copy of the call arguments.
    pub tool_args: Value,

    pub decision: Decision,

    /// Names of the rules applied, in evaluation order.
    #[serde(default)]
    pub rules_evaluated: Vec<String>,

    #[serde(default)]
    pub blocking_rule: Option<String>,

    #[serde(default)]
    pub human_override: Option<HumanOverride>,

    /// Caller-supplied correlation id, if any.
    #[serde(default)]
    pub trace_id: Option<String>,
}
