//! The ordered pattern-rule table
//!
//! Each rule is a `(id, impact, detect)` row; the scorer's reducer walks the
//! table in order and the first match wins. Order is by decreasing rarity,
//! deliberately used as the tie-break when several rules would otherwise
//! match. Every detector is a pure function of the precomputed
//! [`RuleInput`](super::RuleInput), which keeps each rule testable in
//! isolation.

use std::collections::HashSet;

use sdk::opinion::{Conviction, Opinion, Position};
use sdk::score::PatternId;

use super::{normalize, Detection, MarketSentiment, RuleInput};
use crate::screener::Priority;

/// One row of the rule table.
pub(crate) struct PatternRule {
    pub id: PatternId,
    pub impact: f64,
    pub detect: fn(&RuleInput) -> Option<Detection>,
}

/// The table, in decreasing rarity. First match wins.
pub(crate) const RULES: [PatternRule; 5] = [
    PatternRule {
        id: PatternId::HighConvictionConsensus,
        impact: 9.0,
        detect: high_conviction_consensus,
    },
    PatternRule {
        id: PatternId::ContrarianQuality,
        impact: 9.0,
        detect: contrarian_quality,
    },
    PatternRule {
        id: PatternId::StrategicDisagreement,
        impact: 8.0,
        detect: strategic_disagreement,
    },
    PatternRule {
        id: PatternId::BlindSpotArbitrage,
        impact: 7.0,
        detect: blind_spot_arbitrage,
    },
    PatternRule {
        id: PatternId::CatalystAlignment,
        impact: 6.0,
        detect: catalyst_alignment,
    },
];

/// At least four high-conviction opinions behind a strict-majority
/// direction. When diverse philosophies align this hard, it is rare enough
/// to be the strongest signal the table knows.
fn high_conviction_consensus(input: &RuleInput) -> Option<Detection> {
    let consensus = input.consensus_position?;
    if input.high_conviction.len() < 4 {
        return None;
    }

    Some(Detection {
        insight: format!(
            "Rare alignment: {} of {} personas at high conviction behind a {} majority",
            input.high_conviction.len(),
            input.total,
            consensus
        ),
        contributors: input
            .high_conviction
            .iter()
            .map(|o| o.persona_id.clone())
            .collect(),
    })
}

/// A configured quality persona stays constructive while the broader market
/// sentiment hint is bearish. The classic crisis-opportunity read.
fn contrarian_quality(input: &RuleInput) -> Option<Detection> {
    if input.market_sentiment != Some(MarketSentiment::Bearish) {
        return None;
    }

    let constructive: Vec<&Opinion> = input
        .opinions
        .iter()
        .copied()
        .filter(|o| input.quality_personas.iter().any(|q| q == &o.persona_id))
        .filter(|o| matches!(o.position, Position::Bullish | Position::Neutral))
        .collect();

    if constructive.is_empty() {
        return None;
    }

    let names: Vec<&str> = constructive.iter().map(|o| o.persona_name.as_str()).collect();
    Some(Detection {
        insight: format!(
            "Contrarian quality signal: the market is fearful but {} still see value",
            names.join(", ")
        ),
        contributors: constructive.iter().map(|o| o.persona_id.clone()).collect(),
    })
}

/// The two configured anchor personas sit at opposite extremes: one at
/// avoid/bearish, the other bullish at high conviction.
fn strategic_disagreement(input: &RuleInput) -> Option<Detection> {
    if input.anchor_personas.len() != 2 {
        return None;
    }

    let first = find(input, &input.anchor_personas[0])?;
    let second = find(input, &input.anchor_personas[1])?;

    anchor_tension(first, second).or_else(|| anchor_tension(second, first))
}

fn anchor_tension(cautious: &Opinion, convinced: &Opinion) -> Option<Detection> {
    let cautious_extreme = matches!(cautious.position, Position::Avoid | Position::Bearish);
    let convinced_extreme =
        convinced.position == Position::Bullish && convinced.conviction == Conviction::High;

    if !(cautious_extreme && convinced_extreme) {
        return None;
    }

    Some(Detection {
        insight: format!(
            "Strategic tension: {} holds {} while {} is bullish at high conviction; \
             anchor disagreement this sharp often marks a mispricing",
            cautious.persona_name, cautious.position, convinced.persona_name
        ),
        contributors: vec![cautious.persona_id.clone(), convinced.persona_id.clone()],
    })
}

/// At least two opinions independently flag the same blind spot while no
/// opinion holding the majority position lists it among its risks.
fn blind_spot_arbitrage(input: &RuleInput) -> Option<Detection> {
    let majority = input.consensus_position?;

    struct Flagged {
        norm: String,
        original: String,
        persona_ids: Vec<String>,
    }

    // First-occurrence order over canonical opinions keeps this
    // deterministic under permutation of the set.
    let mut flagged: Vec<Flagged> = Vec::new();
    for opinion in input.opinions {
        let mut seen_here = HashSet::new();
        for text in &opinion.acknowledged_blind_spots {
            let norm = normalize(text);
            if norm.is_empty() || !seen_here.insert(norm.clone()) {
                continue;
            }
            match flagged.iter_mut().find(|f| f.norm == norm) {
                Some(entry) => entry.persona_ids.push(opinion.persona_id.clone()),
                None => flagged.push(Flagged {
                    norm,
                    original: text.clone(),
                    persona_ids: vec![opinion.persona_id.clone()],
                }),
            }
        }
    }

    let majority_risks: HashSet<String> = input
        .opinions
        .iter()
        .filter(|o| o.position == majority)
        .flat_map(|o| o.risks.iter().map(|r| normalize(r)))
        .collect();

    flagged
        .into_iter()
        .find(|f| f.persona_ids.len() >= 2 && !majority_risks.contains(&f.norm))
        .map(|f| Detection {
            insight: format!(
                "Blind-spot gap: '{}' is flagged by {} personas yet absent from the {} \
                 majority's risk lists",
                f.original,
                f.persona_ids.len(),
                majority
            ),
            contributors: f.persona_ids,
        })
}

/// A high-priority trigger with at least three opinions sharing one
/// non-avoid position.
fn catalyst_alignment(input: &RuleInput) -> Option<Detection> {
    if input.trigger_priority != Some(Priority::High) {
        return None;
    }

    let mut best: Option<(Position, usize)> = None;
    for position in [Position::Bullish, Position::Neutral, Position::Bearish] {
        let count = input
            .opinions
            .iter()
            .filter(|o| o.position == position)
            .count();
        if count >= 3 && best.map_or(true, |(_, current)| count > current) {
            best = Some((position, count));
        }
    }

    let (position, count) = best?;
    Some(Detection {
        insight: format!(
            "Catalyst alignment: high-priority trigger with {count} personas sharing a \
             {position} view"
        ),
        contributors: input
            .opinions
            .iter()
            .filter(|o| o.position == position)
            .map(|o| o.persona_id.clone())
            .collect(),
    })
}

fn find<'a>(input: &'a RuleInput, persona_id: &str) -> Option<&'a Opinion> {
    input
        .opinions
        .iter()
        .copied()
        .find(|o| o.persona_id == persona_id)
}
