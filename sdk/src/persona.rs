//! Persona definition types
//!
//! A persona is a named, immutable strategic evaluator: a philosophy, a set
//! of formative memories that shape its judgment, the patterns that trigger
//! its interest, the blind spots it is honest about, and the ordered
//! questions of its decision framework. Definitions are created at registry
//! load time and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// A formative market experience that shapes a persona's judgment.
///
/// Each memory is a compressed narrative: the situation, what the persona
/// did, why, what happened, and the strategic lesson carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormativeMemory {
    /// Historical market situation
    pub context: String,

    /// What the persona did
    pub decision: String,

    /// Strategic logic behind the decision
    pub reasoning: String,

    /// What happened as a result
    pub outcome: String,

    /// Strategic insight gained
    pub lesson: String,
}

/// Complete definition of one reasoning persona.
///
/// All list fields must hold at least one entry and all text fields must be
/// non-empty; the registry enforces this at load time. `era` is optional
/// color for the evaluation context and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDefinition {
    /// Unique identifier (e.g. "deep-value")
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Investment era and context
    #[serde(default)]
    pub era: String,

    /// Core strategic philosophy
    pub philosophy: String,

    /// Formative memories, in the order they should be narrated
    pub memories: Vec<FormativeMemory>,

    /// Market patterns that trigger this persona's interest
    pub trigger_patterns: Vec<String>,

    /// Known blind spots the persona acknowledges
    pub blind_spots: Vec<String>,

    /// Ordered questions the persona always asks
    pub decision_framework: Vec<String>,
}
