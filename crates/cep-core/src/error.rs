//! Unified error types for the CEP ecosystem
//!
//! This module provides a common error type [`CepError`] that can represent
//! errors from any part of the system. Domain-specific error types can be
//! converted to `CepError` for uniform error handling at API boundaries.
//!
//! The contract errors (`UnknownTypeTag`, `MissingCapability`,
//! `PrematureFinalization`, `MissingPassThroughData`) are fatal: they mean
//! the optimization model cannot be meaningfully constructed and the current
//! build must abort. Data-quality findings are NOT errors - they go into
//! [`crate::diagnostics::Diagnostics`] and never unwind the stack.

use thiserror::Error;

/// Unified error type for all CEP operations.
#[derive(Error, Debug)]
pub enum CepError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/algorithm errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An entity declares a type tag with no loaded implementation.
    #[error("Unknown {family} type tag '{tag}'")]
    UnknownTypeTag { family: &'static str, tag: String },

    /// A loaded implementation lacks a required rule for its capability family.
    #[error("{family} type '{tag}' does not provide required rule '{rule}'")]
    MissingCapability {
        family: &'static str,
        tag: String,
        rule: &'static str,
    },

    /// A model-wide aggregate was read before all registrations completed.
    #[error("dynamic components read before finalization ({context})")]
    PrematureFinalization { context: String },

    /// A fixed-commitment entity has no prior-stage commitment value.
    #[error(
        "no pass-through commitment for project '{project}' at timepoint {timepoint} in stage '{stage}'"
    )]
    MissingPassThroughData {
        project: String,
        timepoint: u64,
        stage: String,
    },

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CepError.
pub type CepResult<T> = Result<T, CepError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for CepError {
    fn from(err: anyhow::Error) -> Self {
        CepError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for CepError {
    fn from(s: String) -> Self {
        CepError::Other(s)
    }
}

impl From<&str> for CepError {
    fn from(s: &str) -> Self {
        CepError::Other(s.to_string())
    }
}
