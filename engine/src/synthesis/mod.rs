//! Cross-opinion synthesis adapter
//!
//! Thin boundary that serializes a full opinion set into canonical text,
//! asks the external narrative collaborator for a free-form synthesis, and
//! parses the structured reply. Synthesis is strictly additive color on top
//! of the deterministic score: any call or parse failure degrades to an
//! `Unavailable` marker and never touches the already-computed result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sdk::opinion::OpinionSet;

use crate::council::parse::extract_json;
use crate::reasoning::{ReasoningProvider, ReasoningRequest};

/// Parsed synthesis reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// Where the personas agree, and why that is significant
    #[serde(default)]
    pub consensus_points: Vec<String>,

    /// Where they disagree, and what drives it
    #[serde(default)]
    pub disagreements: Vec<String>,

    /// Non-obvious reads emerging from the disagreement
    #[serde(default)]
    pub non_obvious_insights: Vec<String>,

    /// What every persona is missing
    #[serde(default)]
    pub collective_blind_spots: Vec<String>,
}

/// Synthesis outcome: a report, or a non-fatal unavailability marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Synthesis {
    Ready(SynthesisReport),
    Unavailable { reason: String },
}

impl Synthesis {
    /// Whether a report was produced.
    pub fn is_ready(&self) -> bool {
        matches!(self, Synthesis::Ready(_))
    }
}

/// The synthesis adapter.
pub struct SynthesisAdapter {
    provider: Arc<dyn ReasoningProvider>,
    diversity: f64,
    max_output_tokens: u32,
}

impl SynthesisAdapter {
    /// Create a new adapter over a reasoning collaborator.
    pub fn new(provider: Arc<dyn ReasoningProvider>, diversity: f64, max_output_tokens: u32) -> Self {
        Self {
            provider,
            diversity,
            max_output_tokens,
        }
    }

    /// Synthesize one opinion set. Never fails: degradation is a value.
    pub async fn synthesize(&self, set: &OpinionSet) -> Synthesis {
        if set.opinions.is_empty() {
            return Synthesis::Unavailable {
                reason: "no opinions to synthesize".to_string(),
            };
        }

        let request = ReasoningRequest {
            system_context: String::new(),
            user_context: build_prompt(set),
            diversity: self.diversity,
            max_output_tokens: self.max_output_tokens,
        };

        let reply = match self.provider.invoke(&request).await {
            Ok(reply) => reply,
            Err(error) => {
                info!(symbol = %set.symbol, %error, "synthesis call failed, degrading");
                return Synthesis::Unavailable {
                    reason: error.to_string(),
                };
            }
        };

        match parse_report(&reply) {
            Some(report) => Synthesis::Ready(report),
            None => {
                debug!(symbol = %set.symbol, "synthesis reply did not parse, degrading");
                Synthesis::Unavailable {
                    reason: "synthesis reply did not parse".to_string(),
                }
            }
        }
    }
}

/// Canonical text form of an opinion set.
///
/// Deterministic: follows the set's registration order and nothing else.
pub fn render_opinion_set(set: &OpinionSet) -> String {
    let mut out = String::with_capacity(1024);
    for opinion in &set.opinions {
        out.push_str(&format!(
            "## {} ({}, {} conviction)\nReasoning: {}\nKey Factors: {}\nRisks: {}\nAcknowledged Blind Spots: {}\n\n",
            opinion.persona_name,
            opinion.position,
            opinion.conviction,
            opinion.reasoning,
            opinion.key_factors.join(", "),
            opinion.risks.join(", "),
            opinion.acknowledged_blind_spots.join(", "),
        ));
    }
    out
}

fn build_prompt(set: &OpinionSet) -> String {
    format!(
        "You are analyzing competing strategic perspectives on {symbol}.\n\n\
         Here are the independent persona opinions:\n\n{body}\
         Synthesize these perspectives. This is not about finding agreement: \
         disagreement is where the insight lives.\n\n\
         Reply in this JSON format:\n\
         {{\n\
             \"consensus_points\": [\"where they agree, and whether it is meaningful\"],\n\
             \"disagreements\": [\"where they differ, and the philosophical driver\"],\n\
             \"non_obvious_insights\": [\"what the disagreement reveals\"],\n\
             \"collective_blind_spots\": [\"what all of them are missing\"]\n\
         }}",
        symbol = set.symbol,
        body = render_opinion_set(set),
    )
}

fn parse_report(raw: &str) -> Option<SynthesisReport> {
    let candidate = extract_json(raw)?;
    serde_json::from_str(candidate).ok()
}
