//! Opinions, opinion sets, and per-persona failures
//!
//! An `Opinion` is one persona's structured output for one evaluation
//! request. The `OpinionSet` is the aggregated result of a full council
//! evaluation: successful opinions plus a typed failure per persona that
//! could not produce one. Both are immutable once built.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directional stance a persona takes on an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Expecting upside
    Bullish,

    /// Expecting downside
    Bearish,

    /// No directional edge
    Neutral,

    /// Outside the persona's circle, or uninvestable
    Avoid,
}

impl Position {
    /// All positions, in a fixed canonical order.
    pub const ALL: [Position; 4] = [
        Position::Bullish,
        Position::Bearish,
        Position::Neutral,
        Position::Avoid,
    ];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Bullish => "bullish",
            Position::Bearish => "bearish",
            Position::Neutral => "neutral",
            Position::Avoid => "avoid",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Conviction level behind a position. Ordinal: `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conviction {
    Low,
    Medium,
    High,
}

impl Conviction {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Conviction::Low => "low",
            Conviction::Medium => "medium",
            Conviction::High => "high",
        }
    }
}

impl fmt::Display for Conviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persona's structured output for one evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    /// Persona that produced this opinion
    pub persona_id: String,

    /// Display name of the persona
    pub persona_name: String,

    /// Directional stance
    pub position: Position,

    /// Conviction behind the stance
    pub conviction: Conviction,

    /// Strategic reasoning for the position
    pub reasoning: String,

    /// Key factors supporting the thesis, in stated order
    #[serde(default)]
    pub key_factors: Vec<String>,

    /// Risks the persona flags, in stated order
    #[serde(default)]
    pub risks: Vec<String>,

    /// Blind spots the persona acknowledges might affect this analysis
    #[serde(default)]
    pub acknowledged_blind_spots: Vec<String>,

    /// When the opinion was produced
    pub timestamp: DateTime<Utc>,
}

/// Why a persona unit failed to produce an opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external reasoning call exceeded its per-unit timeout
    Timeout,

    /// The external reasoning service rejected the call for rate
    RateLimited,

    /// The external reasoning service failed
    ServiceError,

    /// The reply could not be parsed into an opinion, even after retry
    ParseError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ServiceError => "service_error",
            FailureKind::ParseError => "parse_error",
        };
        write!(f, "{name}")
    }
}

/// A recorded failure of one persona unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaFailure {
    /// Persona whose unit failed
    pub persona_id: String,

    /// Why it failed
    pub kind: FailureKind,
}

/// The aggregated result of one council evaluation.
///
/// `roster` holds the resolved persona ids in registration order; `opinions`
/// and `failures` are each ordered by that roster, never by arrival. The
/// invariant `opinions.len() + failures.len() == roster.len()` always holds
/// for sets built by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionSet {
    /// Asset the council evaluated
    pub symbol: String,

    /// Resolved persona ids, in registration order
    pub roster: Vec<String>,

    /// Successful opinions, in registration order
    pub opinions: Vec<Opinion>,

    /// Per-persona failures, in registration order
    pub failures: Vec<PersonaFailure>,
}

impl OpinionSet {
    /// Number of personas the evaluation was requested for.
    pub fn requested_count(&self) -> usize {
        self.roster.len()
    }

    /// Number of personas that produced an opinion.
    pub fn succeeded_count(&self) -> usize {
        self.opinions.len()
    }

    /// Opinion produced by a specific persona, if any.
    pub fn opinion_of(&self, persona_id: &str) -> Option<&Opinion> {
        self.opinions.iter().find(|o| o.persona_id == persona_id)
    }

    /// Number of opinions held at `High` conviction.
    pub fn high_conviction_count(&self) -> usize {
        self.opinions
            .iter()
            .filter(|o| o.conviction == Conviction::High)
            .count()
    }

    /// Number of opinions holding `position`.
    pub fn position_count(&self, position: Position) -> usize {
        self.opinions
            .iter()
            .filter(|o| o.position == position)
            .count()
    }

    /// Persona ids holding `position`, in registration order.
    pub fn persona_ids_with(&self, position: Position) -> Vec<String> {
        self.opinions
            .iter()
            .filter(|o| o.position == position)
            .map(|o| o.persona_id.clone())
            .collect()
    }
}
