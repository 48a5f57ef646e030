//! Conclave SDK
//!
//! Shared contract crate for the Conclave council engine. It carries the
//! data model exchanged between the engine and its external collaborators:
//! persona definitions, opinions and opinion sets, opportunity scores, and
//! the flat record handed to a storage collaborator.

/// Error types and handling
pub mod errors;

/// Opinions, opinion sets, and per-persona failures
pub mod opinion;

/// Persona definition types
pub mod persona;

/// Opportunity persistence record
pub mod record;

/// Opportunity score and pattern types
pub mod score;

// Re-export commonly used types
pub use errors::{ConclaveError, ConclaveErrorExt};
pub use opinion::{Conviction, FailureKind, Opinion, OpinionSet, PersonaFailure, Position};
pub use persona::{FormativeMemory, PersonaDefinition};
pub use record::OpportunityRecord;
pub use score::{ConsensusStrength, OpportunityScore, PatternId, PatternMatch};
