//! The framework-agnostic representation of an agent tool call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured invocation an agent wants to execute.
///
/// `args` is an arbitrary nested value tree (scalars, ordered sequences,
/// nested mappings).  A `ToolCall` is treated as immutable once created:
/// the evaluator, the redactor, and the audit logger all operate on
/// references or deep copies and never mutate the original.
///
/// `name` must be non-empty; an empty name matches no rule except those
/// applying to `"*"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// The tool the agent wants to invoke (e.g. `"execute_sql"`).
    pub name: String,

    /// Nested argument tree.  Mapping insertion order is preserved so that
    /// probing and redaction are deterministic.
    #[serde(default)]
    pub args: Value,

    /// Correlation id supplied by the caller, carried verbatim into the
    /// audit record.  Never interpreted by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ToolCall {
    /// Build a tool call with the given name and argument tree.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
            trace_id: None,
        }
    }

    /// Attach a caller-supplied trace id.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}
