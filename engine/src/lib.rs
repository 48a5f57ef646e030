//! Conclave Engine Library
//!
//! Core of the Conclave council system: a fixed panel of independent
//! reasoning personas is evaluated in parallel against a market asset, the
//! resulting opinion set is aggregated with partial-failure tolerance, and a
//! deterministic pattern scorer turns it into a single explainable
//! opportunity score.
//!
//! The engine performs no hidden I/O: the reasoning and enrichment
//! collaborators are explicit trait boundaries, storage is an emitted
//! record, and everything else is pure.

/// Configuration management module
pub mod config;

/// Council evaluation orchestrator
pub mod council;

/// Market enrichment collaborator boundary
pub mod enrichment;

/// Opportunity pipeline composing the core components
pub mod opportunity;

/// Reasoning collaborator boundary
pub mod reasoning;

/// Persona registry module
pub mod registry;

/// Consensus and disagreement scorer
pub mod scorer;

/// Trigger screener module
pub mod screener;

/// Cross-opinion synthesis adapter
pub mod synthesis;

/// Telemetry and Observability
pub mod telemetry;

pub use sdk;
