//! Opportunity persistence record
//!
//! The flat row the engine emits for durable storage and later
//! price-performance tracking. Storage itself is an external collaborator;
//! this type is only the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::opinion::Position;
use crate::score::ConsensusStrength;

/// Flat storage record for one scored opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    /// Asset symbol, uppercased
    pub symbol: String,

    /// Groups records produced by one scan run
    pub scan_id: String,

    /// Opportunity score in `[0, 10]`
    pub score: f64,

    /// Majority position, if any
    pub consensus_position: Option<Position>,

    /// Strength of the consensus
    pub consensus_strength: ConsensusStrength,

    /// Opinions held at high conviction
    pub high_conviction_count: usize,

    /// Personas the evaluation was requested for
    pub total_personas: usize,

    /// Personas holding a bullish position
    pub bullish_persona_ids: Vec<String>,

    /// Personas holding a bearish or avoid position
    pub bearish_persona_ids: Vec<String>,

    /// The winning pattern's explanation
    pub key_insight: String,

    /// Market context the council evaluated with, if enrichment produced any
    pub market_context: Option<String>,

    /// Price at scan time, for later performance tracking
    pub price_at_scan: Option<f64>,

    /// When the record was produced
    pub scanned_at: DateTime<Utc>,
}
