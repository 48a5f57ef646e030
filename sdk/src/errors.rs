//! Error types and handling
//!
//! This module provides the typed errors surfaced by the Conclave engine.
//! All errors implement the `ConclaveErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Per-persona failures during a council evaluation are NOT errors at this
//! level: they are recorded inside the `OpinionSet` and only become a
//! top-level `EvaluationFailed` when every persona unit failed.

use thiserror::Error;

use crate::opinion::PersonaFailure;

/// Trait for Conclave error extensions
///
/// Provides additional context for errors: user-friendly hints and
/// recoverability information.
pub trait ConclaveErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require fixing configuration or definitions before restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Validation**: malformed persona or trigger configuration, fatal at load
/// - **Lookup**: unknown persona id requested, fatal to that call
/// - **Evaluation**: every persona unit failed, surfaced with the full
///   per-persona failure list
/// - **Configuration / IO**: config file problems
#[derive(Debug, Error)]
pub enum ConclaveError {
    /// A persona definition failed validation at registry load
    #[error("invalid persona '{id}': {reason}")]
    InvalidPersona { id: String, reason: String },

    /// Two persona definitions share an id
    #[error("duplicate persona id '{0}'")]
    DuplicatePersona(String),

    /// A trigger condition failed validation at screener load
    #[error("invalid trigger condition '{id}': {reason}")]
    InvalidTrigger { id: String, reason: String },

    /// An evaluation request named an unregistered persona
    #[error("persona not found: {0}")]
    PersonaNotFound(String),

    /// Every persona unit failed; no opinion was produced
    #[error("council evaluation failed: all {} persona units failed", .failures.len())]
    EvaluationFailed { failures: Vec<PersonaFailure> },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConclaveErrorExt for ConclaveError {
    fn user_hint(&self) -> &str {
        match self {
            Self::InvalidPersona { .. } => {
                "Fix the persona definition file; every field must be present and non-empty"
            }
            Self::DuplicatePersona(_) => "Persona ids must be unique across the registry",
            Self::InvalidTrigger { .. } => {
                "Fix the trigger condition; the predicate expression did not parse"
            }
            Self::PersonaNotFound(_) => "Request only persona ids that are registered",
            Self::EvaluationFailed { .. } => {
                "Every persona unit failed; check the reasoning service and retry"
            }
            Self::Config(_) => "Check the configuration file for errors",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Load-time validation failures are fatal to startup
            Self::InvalidPersona { .. } | Self::DuplicatePersona(_) | Self::InvalidTrigger { .. } => {
                false
            }
            Self::Config(_) => false,

            // Call-scoped failures can be retried or corrected by the caller
            Self::PersonaNotFound(_) | Self::EvaluationFailed { .. } | Self::Io(_) => true,
        }
    }
}
