//! Injection points for the engine and the audit pipeline.
//!
//! - `Clock`        is the source of audit timestamps
//! - `IdGenerator`  is the source of `decision_id`s
//! - `DecisionSink` is the per-evaluation callback for embedding hosts
//!
//! Production wiring uses `SystemClock` and `UuidIdGenerator`; tests use
//! `FixedClock` and `SequenceIdGenerator` so audit records and evidence
//! hashes are reproducible byte-for-byte.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use frenum_contracts::{EvaluationResult, ToolCall};

/// Source of timestamps for audit records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of unique decision ids for audit records.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Callback invoked once per evaluation, after the decision is final.
///
/// Implementations must never influence the decision: the engine ignores
/// anything a sink does.  A sink that performs I/O must swallow (and log)
/// its own failures; hosts that need to observe audit write errors should
/// call the audit logger directly instead.
pub trait DecisionSink: Send + Sync {
    fn on_decision(&self, call: &ToolCall, result: &EvaluationResult);
}

// ── Production implementations ────────────────────────────────────────────────

/// Wall-clock UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cryptographically random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// ── Deterministic implementations ─────────────────────────────────────────────

/// A clock pinned to one instant.  Every call to `now()` returns the same
/// value, making audit records reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Ids `"<prefix>-0"`, `"<prefix>-1"`, ... in issue order.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
