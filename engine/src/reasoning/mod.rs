//! Reasoning collaborator boundary
//!
//! The council treats text generation as an opaque external collaborator:
//! the engine owns prompt assembly and reply parsing, nothing else. The
//! `ReasoningProvider` trait is the only seam through which persona
//! evaluations and syntheses reach the outside world, which is also what
//! makes the orchestrator testable with scripted providers.

use async_trait::async_trait;

use sdk::opinion::FailureKind;

pub mod http;

/// Result type for reasoning operations
pub type Result<T> = std::result::Result<T, ReasoningError>;

/// Errors the reasoning collaborator can fail with
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning service rate limited the call")]
    RateLimited,

    #[error("reasoning call timed out")]
    Timeout,

    #[error("reasoning service error: {0}")]
    Service(String),
}

impl ReasoningError {
    /// The failure kind recorded against a persona when this error ends its
    /// unit.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ReasoningError::RateLimited => FailureKind::RateLimited,
            ReasoningError::Timeout => FailureKind::Timeout,
            ReasoningError::Service(_) => FailureKind::ServiceError,
        }
    }
}

/// One reasoning invocation.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    /// Identity-establishing context (the persona, for council calls)
    pub system_context: String,

    /// The task itself
    pub user_context: String,

    /// Sampling diversity in 0.0-1.0; high values keep personas distinct
    pub diversity: f64,

    /// Output size cap, in tokens
    pub max_output_tokens: u32,
}

/// Reasoning provider trait that all collaborators must implement
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Name of the provider, for logs
    fn name(&self) -> &str;

    /// Produce raw reply text for one request.
    ///
    /// Implementations must map every failure onto one of the three
    /// `ReasoningError` variants; the orchestrator records them per persona
    /// and never lets one unit's failure cancel another.
    async fn invoke(&self, request: &ReasoningRequest) -> Result<String>;
}
