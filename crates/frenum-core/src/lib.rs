//! # frenum-core
//!
//! Core primitives for the frenum policy engine:
//!
//! - the value probe (`probe`): deterministic traversal of nested
//!   tool-call arguments,
//! - the PII detector registry (`pii`),
//! - the injection traits (`traits`): `Clock`, `IdGenerator`, and
//!   `DecisionSink`, which make audit records reproducible in tests.
//!
//! No policy or audit logic lives here; this crate only provides the
//! deterministic building blocks the evaluator and audit pipeline share.

pub mod pii;
pub mod probe;
pub mod traits;

pub use pii::{scan_all, PiiDetector, PiiSpan};
pub use probe::{canonical_scalar, probe_selected, select, Probe};
pub use traits::{
    Clock, DecisionSink, FixedClock, IdGenerator, SequenceIdGenerator, SystemClock,
    UuidIdGenerator,
};
