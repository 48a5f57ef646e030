//! Opportunity pipeline
//!
//! Composes the core components end to end for one triggered asset:
//! optional market enrichment, council evaluation restricted to the
//! trigger's relevant personas, deterministic scoring with the trigger's
//! priority, optional synthesis, and finally the flat record handed to the
//! external storage collaborator. Scheduling and routing live outside the
//! engine; this module is only the composition.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use sdk::errors::ConclaveError;
use sdk::opinion::{OpinionSet, Position};
use sdk::record::OpportunityRecord;
use sdk::score::OpportunityScore;

use crate::council::{Council, EvaluationRequest};
use crate::enrichment::MarketEnrichment;
use crate::registry::SharedRegistry;
use crate::scorer::{MarketSentiment, ScoreContext, Scorer};
use crate::screener::TriggeredAsset;
use crate::synthesis::{Synthesis, SynthesisAdapter};

/// Per-scan inputs shared by every evaluation of the run.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    /// Groups records from one scan run; generated when absent
    pub scan_id: Option<String>,

    /// Broad market sentiment hint, if the caller has one
    pub market_sentiment: Option<MarketSentiment>,

    /// Price of the asset at scan time, for later performance tracking
    pub price_at_scan: Option<f64>,
}

/// One fully evaluated opportunity.
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// Flat record for the storage collaborator
    pub record: OpportunityRecord,

    /// Full score with every matched pattern
    pub score: OpportunityScore,

    /// The opinion set that produced the score
    pub opinion_set: OpinionSet,

    /// Narrative synthesis, or an unavailability marker
    pub synthesis: Synthesis,
}

/// The composed pipeline.
pub struct OpportunityPipeline {
    registry: SharedRegistry,
    council: Council,
    scorer: Scorer,
    enrichment: Option<Arc<dyn MarketEnrichment>>,
    synthesis: Option<SynthesisAdapter>,
}

impl OpportunityPipeline {
    /// Minimal pipeline: council plus scorer.
    pub fn new(registry: SharedRegistry, council: Council, scorer: Scorer) -> Self {
        Self {
            registry,
            council,
            scorer,
            enrichment: None,
            synthesis: None,
        }
    }

    /// Attach a market enrichment collaborator.
    pub fn with_enrichment(mut self, enrichment: Arc<dyn MarketEnrichment>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Attach a synthesis adapter.
    pub fn with_synthesis(mut self, synthesis: SynthesisAdapter) -> Self {
        self.synthesis = Some(synthesis);
        self
    }

    /// Evaluate one triggered asset end to end.
    pub async fn evaluate_triggered(
        &self,
        triggered: &TriggeredAsset,
        scan: &ScanContext,
    ) -> Result<Opportunity, ConclaveError> {
        let symbol = triggered.symbol.to_uppercase();

        // Enrichment degrades to "no extra context", never fails the run.
        let market_context = match &self.enrichment {
            Some(enrichment) => match enrichment.enrich(&symbol).await {
                Ok(text) => Some(text),
                Err(unavailable) => {
                    warn!(%symbol, %unavailable, "continuing without market context");
                    None
                }
            },
            None => None,
        };

        // Restrict the panel to the trigger's relevant personas where they
        // are actually registered; an empty intersection falls back to the
        // full panel.
        let registry = self.registry.current();
        let panel: Vec<String> = triggered
            .relevant_personas
            .iter()
            .filter(|id| registry.contains(id))
            .cloned()
            .collect();

        let mut request = EvaluationRequest::new(symbol.clone());
        if let Some(context) = &market_context {
            request = request.with_context(context.clone());
        }
        if !panel.is_empty() {
            request = request.with_personas(panel);
        }

        let opinion_set = self.council.evaluate(&request).await?;

        let score = self.scorer.score(
            &opinion_set,
            &ScoreContext {
                market_sentiment: scan.market_sentiment,
                trigger_priority: Some(triggered.priority),
            },
        );

        let synthesis = match &self.synthesis {
            Some(adapter) => adapter.synthesize(&opinion_set).await,
            None => Synthesis::Unavailable {
                reason: "synthesis adapter not configured".to_string(),
            },
        };

        let scan_id = scan
            .scan_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = build_record(
            &symbol,
            &scan_id,
            &opinion_set,
            &score,
            market_context,
            scan.price_at_scan,
        );

        info!(
            %symbol,
            score = score.value,
            pattern = %score.winning_pattern,
            "opportunity evaluated"
        );

        Ok(Opportunity {
            record,
            score,
            opinion_set,
            synthesis,
        })
    }
}

/// Flatten a scored evaluation into the storage contract.
fn build_record(
    symbol: &str,
    scan_id: &str,
    set: &OpinionSet,
    score: &OpportunityScore,
    market_context: Option<String>,
    price_at_scan: Option<f64>,
) -> OpportunityRecord {
    let mut bearish = set.persona_ids_with(Position::Bearish);
    bearish.extend(set.persona_ids_with(Position::Avoid));

    OpportunityRecord {
        symbol: symbol.to_string(),
        scan_id: scan_id.to_string(),
        score: score.value,
        consensus_position: score.consensus_position,
        consensus_strength: score.consensus_strength,
        high_conviction_count: set.high_conviction_count(),
        total_personas: set.requested_count(),
        bullish_persona_ids: set.persona_ids_with(Position::Bullish),
        bearish_persona_ids: bearish,
        key_insight: score.key_insight().unwrap_or_default().to_string(),
        market_context,
        price_at_scan,
        scanned_at: Utc::now(),
    }
}
