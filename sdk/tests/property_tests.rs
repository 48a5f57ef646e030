use chrono::{DateTime, Utc};
use proptest::prelude::*;

use sdk::errors::{ConclaveError, ConclaveErrorExt};
use sdk::opinion::{Conviction, FailureKind, PersonaFailure, Position};
use sdk::record::OpportunityRecord;
use sdk::score::ConsensusStrength;

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

fn strength_strategy() -> impl Strategy<Value = ConsensusStrength> {
    prop_oneof![
        Just(ConsensusStrength::Strong),
        Just(ConsensusStrength::Weak),
        Just(ConsensusStrength::None),
    ]
}

proptest! {
    #[test]
    fn test_position_conviction_roundtrip(
        position in position_strategy(),
        conviction in conviction_strategy(),
    ) {
        let json = serde_json::to_string(&position).expect("serialize position");
        let parsed: Position = serde_json::from_str(&json).expect("deserialize position");
        prop_assert_eq!(position, parsed);

        let json = serde_json::to_string(&conviction).expect("serialize conviction");
        let parsed: Conviction = serde_json::from_str(&json).expect("deserialize conviction");
        prop_assert_eq!(conviction, parsed);
    }
}

proptest! {
    #[test]
    fn test_record_roundtrip(
        symbol in "[A-Z]{1,6}",
        score in 0.0f64..=10.0,
        position in proptest::option::of(position_strategy()),
        strength in strength_strategy(),
        high_conviction in 0usize..8,
        total in 1usize..10,
        bullish in proptest::collection::vec("[a-z-]{2,12}", 0..4),
        bearish in proptest::collection::vec("[a-z-]{2,12}", 0..4),
        insight in "\\PC{0,80}",
        price in proptest::option::of(0.01f64..10_000.0),
        ts_secs in 0i64..4_102_444_800,
    ) {
        let scanned_at: DateTime<Utc> =
            DateTime::from_timestamp(ts_secs, 0).expect("valid timestamp");
        let record = OpportunityRecord {
            symbol,
            scan_id: "scan".to_string(),
            score,
            consensus_position: position,
            consensus_strength: strength,
            high_conviction_count: high_conviction,
            total_personas: total,
            bullish_persona_ids: bullish,
            bearish_persona_ids: bearish,
            key_insight: insight,
            market_context: None,
            price_at_scan: price,
            scanned_at,
        };

        let json = serde_json::to_string(&record).expect("serialize record");
        let parsed: OpportunityRecord = serde_json::from_str(&json).expect("deserialize record");
        prop_assert_eq!(record, parsed);
    }
}

proptest! {
    #[test]
    fn test_error_user_hint_completeness(text in "\\PC*") {
        let failures = vec![PersonaFailure {
            persona_id: text.clone(),
            kind: FailureKind::ServiceError,
        }];
        let errs = vec![
            ConclaveError::InvalidPersona { id: text.clone(), reason: text.clone() },
            ConclaveError::DuplicatePersona(text.clone()),
            ConclaveError::InvalidTrigger { id: text.clone(), reason: text.clone() },
            ConclaveError::PersonaNotFound(text.clone()),
            ConclaveError::EvaluationFailed { failures },
            ConclaveError::Config(text.clone()),
        ];

        for err in errs {
            // Hints are static, safe strings regardless of the payload
            prop_assert!(!err.user_hint().is_empty());
        }
    }
}
