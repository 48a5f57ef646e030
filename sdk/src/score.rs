//! Opportunity score and pattern types
//!
//! The scorer classifies an opinion set into named strategic patterns and
//! derives a single actionable score in `[0, 10]`. These types are the
//! scorer's pure output: every matched pattern is recorded for transparency,
//! the first match in rarity order wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::opinion::Position;

/// Named strategic patterns, in decreasing rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    /// Rare high-conviction alignment behind one direction
    HighConvictionConsensus,

    /// Quality personas constructive while the market is fearful
    ContrarianQuality,

    /// Configured anchor personas at opposite extremes
    StrategicDisagreement,

    /// A risk the majority ignores but several personas flag
    BlindSpotArbitrage,

    /// High-priority trigger aligned with a shared direction
    CatalystAlignment,

    /// No pattern fired; conviction-weighted floor
    Fallback,
}

impl PatternId {
    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::HighConvictionConsensus => "high_conviction_consensus",
            PatternId::ContrarianQuality => "contrarian_quality",
            PatternId::StrategicDisagreement => "strategic_disagreement",
            PatternId::BlindSpotArbitrage => "blind_spot_arbitrage",
            PatternId::CatalystAlignment => "catalyst_alignment",
            PatternId::Fallback => "fallback",
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How aligned the council's positions are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusStrength {
    /// At least 80% share one position
    Strong,

    /// A strict majority shares one position
    Weak,

    /// No strict majority
    None,
}

impl fmt::Display for ConsensusStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsensusStrength::Strong => "strong",
            ConsensusStrength::Weak => "weak",
            ConsensusStrength::None => "none",
        };
        write!(f, "{name}")
    }
}

/// One detected pattern, with its impact and explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Which pattern
    pub pattern: PatternId,

    /// Whether the pattern's predicate held
    pub detected: bool,

    /// Score the pattern contributes when it wins
    pub score_impact: f64,

    /// Human-readable explanation of what was detected
    pub insight: String,

    /// Personas whose opinions made the pattern fire
    pub contributing_persona_ids: Vec<String>,
}

/// Complete opportunity score for one opinion set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityScore {
    /// Actionable score in `[0, 10]`
    pub value: f64,

    /// Position held by a strict majority, if any
    pub consensus_position: Option<Position>,

    /// Strength of the consensus
    pub consensus_strength: ConsensusStrength,

    /// First matching pattern in rarity order
    pub winning_pattern: PatternId,

    /// Every pattern that matched, winning one first
    pub all_matches: Vec<PatternMatch>,

    /// Deduplicated key factors across all opinions, first occurrence first
    pub action_items: Vec<String>,

    /// Deduplicated risks across all opinions, first occurrence first
    pub risk_factors: Vec<String>,
}

impl OpportunityScore {
    /// The winning pattern's explanation, if recorded.
    pub fn key_insight(&self) -> Option<&str> {
        self.all_matches
            .iter()
            .find(|m| m.pattern == self.winning_pattern)
            .map(|m| m.insight.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_wire_names() {
        assert_eq!(
            serde_json::to_string(&PatternId::BlindSpotArbitrage).expect("serialize"),
            "\"blind_spot_arbitrage\""
        );
        assert_eq!(
            PatternId::HighConvictionConsensus.to_string(),
            "high_conviction_consensus"
        );
    }

    #[test]
    fn test_consensus_strength_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConsensusStrength::None).expect("serialize"),
            "\"none\""
        );
    }

    #[test]
    fn test_key_insight_finds_winner() {
        let score = OpportunityScore {
            value: 8.0,
            consensus_position: None,
            consensus_strength: ConsensusStrength::None,
            winning_pattern: PatternId::StrategicDisagreement,
            all_matches: vec![PatternMatch {
                pattern: PatternId::StrategicDisagreement,
                detected: true,
                score_impact: 8.0,
                insight: "anchors disagree".to_string(),
                contributing_persona_ids: vec![],
            }],
            action_items: vec![],
            risk_factors: vec![],
        };
        assert_eq!(score.key_insight(), Some("anchors disagree"));
    }
}
