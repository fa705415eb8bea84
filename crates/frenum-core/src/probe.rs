//! The value probe: deterministic traversal of nested argument trees.
//!
//! Given a `serde_json::Value` the probe yields every scalar leaf together
//! with its dotted path, depth-first, preserving mapping insertion order
//! (serde_json is built with `preserve_order`) and sequence index order.
//! Paths join mapping keys with `.` and render sequence indices as `[i]`:
//! `body.items[0].name`.
//!
//! The probe is lazy (an `Iterator`) and never mutates its input.

use serde_json::Value;

/// Render a scalar in its canonical string form.
///
/// Strings verbatim, booleans lowercase, integers without a decimal point,
/// floats via the shortest `Display` form (no trailing zeros), null as
/// `"null"`.  Returns `None` for mappings and sequences.
pub fn canonical_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| format!("{f}"))
            }
        }
        Value::Null => Some("null".to_string()),
        Value::Object(_) | Value::Array(_) => None,
    }
}

/// Lazy depth-first iterator over `(path, canonical scalar)` pairs.
pub struct Probe<'v> {
    stack: Vec<(String, &'v Value)>,
}

impl<'v> Probe<'v> {
    /// Probe every scalar leaf under `value`.  The root path is empty, so a
    /// top-level key `query` yields the path `"query"`.
    pub fn new(value: &'v Value) -> Self {
        Self::rooted(String::new(), value)
    }

    /// Probe with an explicit path prefix, used when descending into a
    /// subtree selected by `select()`.
    pub fn rooted(path: String, value: &'v Value) -> Self {
        Self {
            stack: vec![(path, value)],
        }
    }
}

impl Iterator for Probe<'_> {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, value)) = self.stack.pop() {
            match value {
                Value::Object(map) => {
                    // Reverse push so the stack pops in insertion order.
                    for (key, child) in map.iter().rev() {
                        self.stack.push((join_key(&path, key), child));
                    }
                }
                Value::Array(items) => {
                    for (i, child) in items.iter().enumerate().rev() {
                        self.stack.push((format!("{path}[{i}]"), child));
                    }
                }
                scalar => {
                    if let Some(text) = canonical_scalar(scalar) {
                        return Some((path, text));
                    }
                }
            }
        }
        None
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Resolve a dotted selector against a value tree.
///
/// Each selector segment matches one mapping key; `*` matches any single
/// segment (every key of a mapping, every index of a sequence).  Returns
/// the matched subtrees with their full paths, in traversal order.  A
/// selector that matches nothing returns an empty list.
pub fn select<'v>(value: &'v Value, selector: &str) -> Vec<(String, &'v Value)> {
    let mut current: Vec<(String, &'v Value)> = vec![(String::new(), value)];

    for segment in selector.split('.') {
        let mut next = Vec::new();
        for (path, node) in current {
            match node {
                Value::Object(map) => {
                    if segment == "*" {
                        for (key, child) in map {
                            next.push((join_key(&path, key), child));
                        }
                    } else if let Some(child) = map.get(segment) {
                        next.push((join_key(&path, segment), child));
                    }
                }
                Value::Array(items) if segment == "*" => {
                    for (i, child) in items.iter().enumerate() {
                        next.push((format!("{path}[{i}]"), child));
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    current
}

/// Probe only the scalars under the subtrees matched by `selector`.
pub fn probe_selected(value: &Value, selector: &str) -> Vec<(String, String)> {
    select(value, selector)
        .into_iter()
        .flat_map(|(path, node)| Probe::rooted(path, node))
        .collect()
}
