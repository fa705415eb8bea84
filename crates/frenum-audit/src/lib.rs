//! # frenum-audit
//!
//! Append-only, redacting audit trail for frenum decisions.
//!
//! ## Overview
//!
//! Every evaluation can be persisted as one JSON line: a fixed-order record
//! carrying the decision, the rules applied, and a redacted copy of the
//! call arguments.  Scalars that triggered a `regex_block` pattern or a PII
//! detector are replaced with `"<redacted:<label>>"`; everything else is
//! preserved verbatim.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use frenum_audit::{AuditRecorder, JsonlAuditLogger};
//!
//! let logger = JsonlAuditLogger::to_file(
//!     AuditRecorder::new("1.0.0"),
//!     Path::new("decisions.jsonl"),
//! )?;
//! let record = logger.log(&call, &engine.evaluate(&call))?;
//! ```

pub mod logger;
pub mod redact;

pub use logger::{read_records, AuditRecorder, JsonlAuditLogger};
pub use redact::redact_args;

// ── Tests ─────────────────────────────────────────────────────────────────────
