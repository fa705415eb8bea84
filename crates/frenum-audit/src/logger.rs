//! Record building and the append-only JSONL sink.
//!
//! `AuditRecorder` turns an evaluation into an `AuditRecord`: it stamps the
//! decision id and timestamp from its injected `IdGenerator` and `Clock`
//! (production: uuid-v4 and wall clock; tests: deterministic substitutes)
//! and redacts the argument copy.  `JsonlAuditLogger` serializes records to
//! a shared writer, one `\n`-terminated JSON object per line, with a mutex
//! guaranteeing that concurrent appends never tear a line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::SecondsFormat;
use tracing::{error, info};

use frenum_contracts::{
    AuditRecord, EvaluationResult, FrenumError, FrenumResult, ToolCall,
};
use frenum_core::traits::{Clock, DecisionSink, IdGenerator, SystemClock, UuidIdGenerator};

use crate::redact::redact_args;

/// Builds audit records from evaluations.
pub struct AuditRecorder {
    policy_version: String,
    redact: bool,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl AuditRecorder {
    /// Recorder with production wiring: wall-clock UTC and random v4 ids.
    pub fn new(policy_version: impl Into<String>) -> Self {
        Self::with_sources(
            policy_version,
            Box::new(SystemClock),
            Box::new(UuidIdGenerator),
        )
    }

    /// Recorder with explicit time and id sources, for reproducible records.
    pub fn with_sources(
        policy_version: impl Into<String>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        Self {
            policy_version: policy_version.into(),
            redact: true,
            clock,
            ids,
        }
    }

    /// Disable argument redaction.  Off only makes sense for debugging;
    /// production records should always redact.
    pub fn without_redaction(mut self) -> Self {
        self.redact = false;
        self
    }

    /// Build the audit record for one evaluation.
    ///
    /// The record's `decision` is the engine decision; `human_override`
    /// starts empty and may be set by the host before appending (overrides
    /// are annotative, they never rewrite the decision).
    pub fn build(&self, call: &ToolCall, result: &EvaluationResult) -> AuditRecord {
        let tool_args = if self.redact {
            redact_args(&call.args, &result.redactions)
        } else {
            call.args.clone()
        };

        AuditRecord {
            decision_id: self.ids.next_id(),
            timestamp: self
                .clock
                .now()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            policy_version: self.policy_version.clone(),
            tool_name: call.name.clone(),
            tool_args,
            decision: result.decision,
            rules_evaluated: result.rules_evaluated.clone(),
            blocking_rule: result.blocking_rule.clone(),
            human_override: None,
            trace_id: call.trace_id.clone(),
        }
    }
}

/// Append-only JSON-lines audit log over any byte sink.
pub struct JsonlAuditLogger {
    recorder: AuditRecorder,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl JsonlAuditLogger {
    /// Log to an arbitrary writer (a file handle, a buffer in tests).
    pub fn new(recorder: AuditRecorder, sink: Box<dyn Write + Send>) -> Self {
        Self {
            recorder,
            sink: Mutex::new(sink),
        }
    }

    /// Open (or create) the file at `path` in append mode.
    ///
    /// The handle lives as long as the logger and is released when the
    /// logger is dropped.
    pub fn to_file(recorder: AuditRecorder, path: &Path) -> FrenumResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FrenumError::AuditWriteFailed {
                reason: format!("failed to open audit log '{}': {e}", path.display()),
            })?;
        Ok(Self::new(recorder, Box::new(file)))
    }

    /// Build a record for the evaluation and append it.
    pub fn log(&self, call: &ToolCall, result: &EvaluationResult) -> FrenumResult<AuditRecord> {
        let record = self.recorder.build(call, result);
        self.append(&record)?;
        Ok(record)
    }

    /// Append one record as a single `\n`-terminated JSON line.
    ///
    /// The whole line is written under one lock acquisition so concurrent
    /// appends keep line boundaries intact.
    pub fn append(&self, record: &AuditRecord) -> FrenumResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| FrenumError::AuditWriteFailed {
                reason: format!("failed to serialize audit record: {e}"),
            })?;

        let mut sink = self
            .sink
            .lock()
            .map_err(|e| FrenumError::AuditWriteFailed {
                reason: format!("audit sink lock poisoned: {e}"),
            })?;
        sink.write_all(json.as_bytes())
            .and_then(|_| sink.write_all(b"\n"))
            .and_then(|_| sink.flush())
            .map_err(|e| FrenumError::AuditWriteFailed {
                reason: format!("failed to append audit record: {e}"),
            })?;

        info!(
            decision_id = %record.decision_id,
            tool = %record.tool_name,
            decision = %record.decision,
            "audit record appended"
        );

        Ok(())
    }
}

impl DecisionSink for JsonlAuditLogger {
    /// Sink wiring for `Engine::with_sink`: append and swallow failures.
    ///
    /// The engine's decision must never depend on audit I/O, so errors are
    /// only traced here.  Hosts that need write failures surfaced should
    /// call `log()` directly instead.
    fn on_decision(&self, call: &ToolCall, result: &EvaluationResult) {
        if let Err(e) = self.log(call, result) {
            error!(tool = %call.name, error = %e, "audit append failed");
        }
    }
}

/// Load records from a JSONL audit stream.
///
/// Blank and unparseable lines are skipped; unknown fields inside records
/// are ignored.  Readers tolerate streams produced by newer writers.
pub fn read_records(path: &Path) -> FrenumResult<Vec<AuditRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| FrenumError::ReportError {
        reason: format!("failed to read audit log '{}': {e}", path.display()),
    })?;

    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<AuditRecord>(line).ok())
        .collect())
}
