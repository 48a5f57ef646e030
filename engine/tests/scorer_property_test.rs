//! Property tests for the scorer
//!
//! Validates the two load-bearing invariants over arbitrary opinion sets:
//! the score always lands in [0, 10], and permuting the set's opinions
//! never changes the result.

use chrono::Utc;
use proptest::prelude::*;

use conclave_engine::scorer::{MarketSentiment, ScoreContext, Scorer, ScorerSettings};
use conclave_engine::screener::Priority;
use sdk::opinion::{Conviction, Opinion, OpinionSet, Position};

fn position_strategy() -> impl Strategy<Value = Position> {
    prop_oneof![
        Just(Position::Bullish),
        Just(Position::Bearish),
        Just(Position::Neutral),
        Just(Position::Avoid),
    ]
}

fn conviction_strategy() -> impl Strategy<Value = Conviction> {
    prop_oneof![
        Just(Conviction::Low),
        Just(Conviction::Medium),
        Just(Conviction::High),
    ]
}

fn text_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{1,16}", 0..3)
}

fn context_strategy() -> impl Strategy<Value = ScoreContext> {
    (
        prop::option::of(prop_oneof![
            Just(MarketSentiment::Bullish),
            Just(MarketSentiment::Bearish),
            Just(MarketSentiment::Neutral),
        ]),
        prop::option::of(prop_oneof![Just(Priority::Medium), Just(Priority::High)]),
    )
        .prop_map(|(market_sentiment, trigger_priority)| ScoreContext {
            market_sentiment,
            trigger_priority,
        })
}

fn set_strategy() -> impl Strategy<Value = OpinionSet> {
    prop::collection::vec(
        (
            position_strategy(),
            conviction_strategy(),
            text_list_strategy(),
            text_list_strategy(),
            text_list_strategy(),
        ),
        1..8,
    )
    .prop_map(|rows| {
        let opinions: Vec<Opinion> = rows
            .into_iter()
            .enumerate()
            .map(
                |(i, (position, conviction, key_factors, risks, blind_spots))| Opinion {
                    persona_id: format!("persona-{i}"),
                    persona_name: format!("Persona {i}"),
                    position,
                    conviction,
                    reasoning: "generated".to_string(),
                    key_factors,
                    risks,
                    acknowledged_blind_spots: blind_spots,
                    timestamp: Utc::now(),
                },
            )
            .collect();
        OpinionSet {
            symbol: "ACME".to_string(),
            roster: opinions.iter().map(|o| o.persona_id.clone()).collect(),
            opinions,
            failures: vec![],
        }
    })
}

fn scorer() -> Scorer {
    Scorer::new(ScorerSettings {
        quality_personas: vec!["persona-0".to_string(), "persona-1".to_string()],
        anchor_personas: vec!["persona-0".to_string(), "persona-2".to_string()],
    })
}

proptest! {
    #[test]
    fn test_score_is_always_within_range(
        set in set_strategy(),
        context in context_strategy(),
    ) {
        let score = scorer().score(&set, &context);
        prop_assert!((0.0..=10.0).contains(&score.value));
        prop_assert!(!score.all_matches.is_empty());
        prop_assert_eq!(score.all_matches[0].pattern, score.winning_pattern);
    }
}

proptest! {
    #[test]
    fn test_score_is_invariant_under_permutation(
        (set, permuted) in set_strategy().prop_flat_map(|set| {
            let indices: Vec<usize> = (0..set.opinions.len()).collect();
            (Just(set), Just(indices).prop_shuffle())
        }).prop_map(|(set, order)| {
            let mut permuted = set.clone();
            permuted.opinions = order.into_iter().map(|i| set.opinions[i].clone()).collect();
            (set, permuted)
        }),
        context in context_strategy(),
    ) {
        let scorer = scorer();
        prop_assert_eq!(
            scorer.score(&set, &context),
            scorer.score(&permuted, &context)
        );
    }
}
