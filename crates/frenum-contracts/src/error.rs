//! Error types for the frenum policy engine.
//!
//! All fallible operations in frenum return `FrenumResult<T>`.  Note what is
//! NOT here: evaluation has no error variant at all.  The evaluator is total;
//! every internal failure folds into a `block` decision instead of an error.

use thiserror::Error;

/// The unified error type for the frenum crates.
#[derive(Debug, Error)]
pub enum FrenumError {
    /// A policy or test document could not be loaded, or the compiled policy
    /// contains error-severity lint findings.
    ///
    /// This is the only error class that prevents the engine from starting.
    /// Warnings never do; warning-tainted rules are retained and fail closed
    /// at evaluation time.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The audit sink could not persist a decision record.
    ///
    /// The evaluation decision itself is unaffected; only the append failed.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// A report source could not be read or a rendering could not be
    /// produced.
    #[error("report error: {reason}")]
    ReportError { reason: String },
}

/// Convenience alias used throughout the frenum crates.
pub type FrenumResult<T> = Result<T, FrenumError>;
