//! Argument redaction for audit records.
//!
//! Redaction operates on a deep copy, never the caller's value.  Only the
//! scalars whose paths the evaluator flagged are replaced, with
//! `"<redacted:<label>>"` where the label is the rule or detector that
//! matched; every other scalar is preserved byte-for-byte.  Path syntax
//! matches the value probe: dots between mapping keys, `[i]` for sequence
//! indices.

use std::collections::HashMap;

use serde_json::Value;

use frenum_contracts::Redaction;

/// Produce a redacted deep copy of `args`.
pub fn redact_args(args: &Value, redactions: &[Redaction]) -> Value {
    if redactions.is_empty() {
        return args.clone();
    }
    let labels: HashMap<&str, &str> = redactions
        .iter()
        .map(|r| (r.path.as_str(), r.label.as_str()))
        .collect();
    redact_value(args, "", &labels)
}

fn redact_value(value: &Value, path: &str, labels: &HashMap<&str, &str>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    (key.clone(), redact_value(child, &child_path, labels))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, child)| redact_value(child, &format!("{path}[{i}]"), labels))
                .collect(),
        ),
        scalar => match labels.get(path) {
            Some(label) => Value::String(format!("<redacted:{label}>")),
            None => scalar.clone(),
        },
    }
}
