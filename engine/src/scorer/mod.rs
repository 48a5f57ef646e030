//! Consensus and disagreement scorer
//!
//! Pure classifier from an opinion set to a single explainable opportunity
//! score. Total over any opinion set: it never fails and never performs I/O.
//! The ordered rule table in [`rules`] is evaluated by one generic reducer;
//! the first matching pattern wins, every match is recorded for
//! transparency, and a conviction-weighted fallback floors the score when
//! nothing fires.
//!
//! The scorer is invariant under permutation of `opinions`: it re-derives
//! the canonical registration order from the set's roster before anything
//! order-sensitive (first-occurrence dedup, blind-spot scanning) happens.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use sdk::opinion::{Conviction, Opinion, OpinionSet, Position};
use sdk::score::{ConsensusStrength, OpportunityScore, PatternId, PatternMatch};

use crate::config::ScoringConfig;
use crate::screener::Priority;

mod rules;

/// Broad market sentiment hint supplied alongside an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Per-call context the rule table may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreContext {
    /// Broad market sentiment, if the caller has a read on it
    pub market_sentiment: Option<MarketSentiment>,

    /// Priority of the trigger that originated this evaluation
    pub trigger_priority: Option<Priority>,
}

/// Configured persona subsets the rule table refers to.
#[derive(Debug, Clone, Default)]
pub struct ScorerSettings {
    /// The "quality" subset watched by the contrarian rule
    pub quality_personas: Vec<String>,

    /// The two anchors watched by the disagreement rule
    pub anchor_personas: Vec<String>,
}

impl From<ScoringConfig> for ScorerSettings {
    fn from(config: ScoringConfig) -> Self {
        Self {
            quality_personas: config.quality_personas,
            anchor_personas: config.anchor_personas,
        }
    }
}

/// Everything a rule detector may look at, precomputed once per call.
pub(crate) struct RuleInput<'a> {
    pub opinions: &'a [&'a Opinion],
    pub total: usize,
    pub consensus_position: Option<Position>,
    pub high_conviction: Vec<&'a Opinion>,
    pub quality_personas: &'a [String],
    pub anchor_personas: &'a [String],
    pub market_sentiment: Option<MarketSentiment>,
    pub trigger_priority: Option<Priority>,
}

/// What a rule detector reports when it fires.
pub(crate) struct Detection {
    pub insight: String,
    pub contributors: Vec<String>,
}

/// The consensus and disagreement scorer.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    settings: ScorerSettings,
}

impl Scorer {
    /// Create a scorer with the given persona subsets.
    pub fn new(settings: ScorerSettings) -> Self {
        Self { settings }
    }

    /// Score one opinion set.
    pub fn score(&self, set: &OpinionSet, context: &ScoreContext) -> OpportunityScore {
        let opinions = canonical_order(set);
        let total = opinions.len();

        let (consensus_position, consensus_strength) = classify_consensus(&opinions);
        let high_conviction: Vec<&Opinion> = opinions
            .iter()
            .copied()
            .filter(|o| o.conviction == Conviction::High)
            .collect();
        let high_conviction_count = high_conviction.len();

        let input = RuleInput {
            opinions: &opinions,
            total,
            consensus_position,
            high_conviction,
            quality_personas: &self.settings.quality_personas,
            anchor_personas: &self.settings.anchor_personas,
            market_sentiment: context.market_sentiment,
            trigger_priority: context.trigger_priority,
        };

        let mut all_matches: Vec<PatternMatch> = Vec::new();
        for rule in &rules::RULES {
            if let Some(detection) = (rule.detect)(&input) {
                all_matches.push(PatternMatch {
                    pattern: rule.id,
                    detected: true,
                    score_impact: rule.impact,
                    insight: detection.insight,
                    contributing_persona_ids: detection.contributors,
                });
            }
        }

        let winner = all_matches.first().map(|m| (m.pattern, m.score_impact));
        let (winning_pattern, raw_value) = match winner {
            Some(pair) => pair,
            None => {
                let floor = (3.0 + 0.5 * high_conviction_count as f64).min(5.0);
                all_matches.push(PatternMatch {
                    pattern: PatternId::Fallback,
                    detected: true,
                    score_impact: floor,
                    insight: format!(
                        "No strategic pattern detected; {high_conviction_count} \
                         high-conviction opinions set the floor"
                    ),
                    contributing_persona_ids: opinions
                        .iter()
                        .filter(|o| o.conviction == Conviction::High)
                        .map(|o| o.persona_id.clone())
                        .collect(),
                });
                (PatternId::Fallback, floor)
            }
        };

        OpportunityScore {
            value: raw_value.clamp(0.0, 10.0),
            consensus_position,
            consensus_strength,
            winning_pattern,
            all_matches,
            action_items: dedup_ordered(opinions.iter().flat_map(|o| o.key_factors.iter())),
            risk_factors: dedup_ordered(opinions.iter().flat_map(|o| o.risks.iter())),
        }
    }
}

/// Re-derive registration order from the roster, so the result does not
/// depend on how `opinions` happens to be ordered.
fn canonical_order(set: &OpinionSet) -> Vec<&Opinion> {
    let index_of = |id: &str| {
        set.roster
            .iter()
            .position(|roster_id| roster_id == id)
            .unwrap_or(usize::MAX)
    };

    let mut opinions: Vec<&Opinion> = set.opinions.iter().collect();
    opinions.sort_by(|a, b| {
        index_of(&a.persona_id)
            .cmp(&index_of(&b.persona_id))
            .then_with(|| a.persona_id.cmp(&b.persona_id))
    });
    opinions
}

/// Strict-majority position and its strength.
fn classify_consensus(opinions: &[&Opinion]) -> (Option<Position>, ConsensusStrength) {
    let total = opinions.len();
    if total == 0 {
        return (None, ConsensusStrength::None);
    }

    let mut best: Option<(Position, usize)> = None;
    for position in Position::ALL {
        let count = opinions.iter().filter(|o| o.position == position).count();
        if best.map_or(true, |(_, current)| count > current) {
            best = Some((position, count));
        }
    }

    match best {
        Some((position, count)) if count * 2 > total => {
            let strength = if count * 5 >= total * 4 {
                ConsensusStrength::Strong
            } else {
                ConsensusStrength::Weak
            };
            (Some(position), strength)
        }
        _ => (None, ConsensusStrength::None),
    }
}

/// Normalize free text for dedup and overlap checks: lowercase, collapsed
/// whitespace, trailing punctuation stripped.
pub(crate) fn normalize(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"));

    let lowered = text.to_lowercase();
    let collapsed = whitespace.replace_all(lowered.trim(), " ");
    collapsed
        .trim_end_matches(['.', ',', ';', ':', '!'])
        .trim_end()
        .to_string()
}

/// Deduplicate by normalized text, keeping the first original wording.
fn dedup_ordered<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let norm = normalize(item);
        if norm.is_empty() || !seen.insert(norm) {
            continue;
        }
        out.push(item.clone());
    }
    out
}
