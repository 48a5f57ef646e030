//! Council evaluation orchestrator
//!
//! Fans out one isolated unit of work per persona, collects an opinion or a
//! typed failure per unit, and never fails the whole call for a partial
//! failure. Isolation is a correctness requirement: units share no mutable
//! state and communicate nothing to each other while running, so one
//! persona's output can never contaminate another's reasoning.
//!
//! Each unit invokes the reasoning collaborator under its own timeout,
//! parses the reply against a strict schema, and retries exactly once with a
//! structured-output-only instruction before recording a terminal parse
//! failure. A bounded semaphore caps simultaneously in-flight external
//! calls; excess units queue instead of spawning unbounded concurrency.
//! Dropping the returned future cancels all still-pending units.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use sdk::errors::ConclaveError;
use sdk::opinion::{FailureKind, Opinion, OpinionSet, PersonaFailure};
use sdk::persona::PersonaDefinition;

use crate::reasoning::{ReasoningProvider, ReasoningRequest};
use crate::registry::SharedRegistry;

pub mod parse;
pub mod prompt;

/// Request for one council evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvaluationRequest {
    /// Asset to evaluate
    pub symbol: String,

    /// Extra market context handed to every persona
    pub context_text: Option<String>,

    /// Personas to evaluate with; every registered persona when absent
    pub persona_ids: Option<Vec<String>>,
}

impl EvaluationRequest {
    /// Request evaluating `symbol` with the full registered panel.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            context_text: None,
            persona_ids: None,
        }
    }

    /// Attach market context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_text = Some(context.into());
        self
    }

    /// Restrict to a persona subset.
    pub fn with_personas(mut self, ids: Vec<String>) -> Self {
        self.persona_ids = Some(ids);
        self
    }
}

/// Tunables for council runs.
#[derive(Debug, Clone)]
pub struct CouncilSettings {
    /// Cap on simultaneously in-flight reasoning calls; panel size when
    /// absent (panels are small)
    pub max_concurrent: Option<usize>,

    /// Per-unit timeout for one reasoning attempt
    pub unit_timeout: Duration,

    /// Sampling diversity handed to the collaborator
    pub diversity: f64,

    /// Output size cap per reply, in tokens
    pub max_output_tokens: u32,
}

impl Default for CouncilSettings {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            unit_timeout: Duration::from_secs(60),
            diversity: 0.9,
            max_output_tokens: 1024,
        }
    }
}

/// The council: a registry snapshot source, a reasoning collaborator, and
/// the orchestration settings.
pub struct Council {
    registry: SharedRegistry,
    provider: Arc<dyn ReasoningProvider>,
    settings: CouncilSettings,
}

impl Council {
    /// Create a new council.
    pub fn new(
        registry: SharedRegistry,
        provider: Arc<dyn ReasoningProvider>,
        settings: CouncilSettings,
    ) -> Self {
        Self {
            registry,
            provider,
            settings,
        }
    }

    /// Evaluate an asset with the council.
    ///
    /// Resolves the roster fail-fast (an unknown persona id aborts before
    /// any external work), runs one isolated unit per persona, and
    /// aggregates results in registration order. Returns
    /// `EvaluationFailed` only when zero units succeeded.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<OpinionSet, ConclaveError> {
        let registry = self.registry.current();

        // Resolve the roster in registration order; requested subsets are
        // normalized to that order so downstream tie-breaks stay canonical.
        let roster: Vec<String> = match &request.persona_ids {
            Some(ids) => {
                for id in ids {
                    if !registry.contains(id) {
                        return Err(ConclaveError::PersonaNotFound(id.clone()));
                    }
                }
                registry
                    .ids()
                    .filter(|id| ids.iter().any(|requested| requested == id))
                    .map(str::to_string)
                    .collect()
            }
            None => registry.ids().map(str::to_string).collect(),
        };

        let panel: Vec<PersonaDefinition> = roster
            .iter()
            .map(|id| registry.get(id).cloned())
            .collect::<Result<_, _>>()?;

        let limit = self
            .settings
            .max_concurrent
            .unwrap_or(panel.len())
            .max(1);
        let semaphore = Arc::new(Semaphore::new(limit));

        info!(
            symbol = %request.symbol,
            panel = panel.len(),
            limit,
            "council evaluation started"
        );

        let mut join_set = JoinSet::new();
        for (index, persona) in panel.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let provider = Arc::clone(&self.provider);
            let symbol = request.symbol.clone();
            let context_text = request.context_text.clone();
            let settings = self.settings.clone();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Err(FailureKind::ServiceError)),
                };
                let outcome = evaluate_unit(
                    provider.as_ref(),
                    &persona,
                    &symbol,
                    context_text.as_deref(),
                    &settings,
                )
                .await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<Opinion, FailureKind>>> =
            (0..roster.len()).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(join_error) => {
                    // The unit is gone; its slot stays empty and is recorded
                    // as a service failure below.
                    warn!(error = %join_error, "council unit aborted");
                }
            }
        }

        // Re-sort to registration order by draining the indexed slots.
        let mut opinions = Vec::new();
        let mut failures = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            match slot.unwrap_or(Err(FailureKind::ServiceError)) {
                Ok(opinion) => opinions.push(opinion),
                Err(kind) => {
                    warn!(persona = %roster[index], %kind, "persona unit failed");
                    failures.push(PersonaFailure {
                        persona_id: roster[index].clone(),
                        kind,
                    });
                }
            }
        }

        if opinions.is_empty() {
            return Err(ConclaveError::EvaluationFailed { failures });
        }

        info!(
            symbol = %request.symbol,
            succeeded = opinions.len(),
            failed = failures.len(),
            "council evaluation settled"
        );

        Ok(OpinionSet {
            symbol: request.symbol.clone(),
            roster,
            opinions,
            failures,
        })
    }
}

/// Run one persona unit: assemble context, invoke, parse, retry once.
async fn evaluate_unit(
    provider: &dyn ReasoningProvider,
    persona: &PersonaDefinition,
    symbol: &str,
    context_text: Option<&str>,
    settings: &CouncilSettings,
) -> Result<Opinion, FailureKind> {
    let system_context = prompt::system_context(persona);

    let first_reply = invoke_once(
        provider,
        &system_context,
        &prompt::user_context(symbol, context_text, false),
        settings,
    )
    .await?;

    let payload = match parse::parse_opinion(&first_reply) {
        Ok(payload) => payload,
        Err(first_error) => {
            debug!(
                persona = %persona.id,
                error = %first_error,
                "opinion parse failed, retrying with structured-output-only instruction"
            );
            let second_reply = invoke_once(
                provider,
                &system_context,
                &prompt::user_context(symbol, context_text, true),
                settings,
            )
            .await?;
            match parse::parse_opinion(&second_reply) {
                Ok(payload) => payload,
                Err(second_error) => {
                    warn!(
                        persona = %persona.id,
                        error = %second_error,
                        "opinion parse failed after retry"
                    );
                    return Err(FailureKind::ParseError);
                }
            }
        }
    };

    Ok(Opinion {
        persona_id: persona.id.clone(),
        persona_name: persona.name.clone(),
        position: payload.position,
        conviction: payload.conviction,
        reasoning: payload.reasoning,
        key_factors: payload.key_factors,
        risks: payload.risks,
        acknowledged_blind_spots: payload.acknowledged_blind_spots,
        timestamp: Utc::now(),
    })
}

/// One reasoning attempt under the per-unit timeout.
async fn invoke_once(
    provider: &dyn ReasoningProvider,
    system_context: &str,
    user_context: &str,
    settings: &CouncilSettings,
) -> Result<String, FailureKind> {
    let request = ReasoningRequest {
        system_context: system_context.to_string(),
        user_context: user_context.to_string(),
        diversity: settings.diversity,
        max_output_tokens: settings.max_output_tokens,
    };

    match timeout(settings.unit_timeout, provider.invoke(&request)).await {
        Err(_elapsed) => Err(FailureKind::Timeout),
        Ok(Err(error)) => Err(error.failure_kind()),
        Ok(Ok(reply)) => Ok(reply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PersonaRegistry;
    use async_trait::async_trait;
    use sdk::persona::FormativeMemory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn definition(id: &str) -> PersonaDefinition {
        PersonaDefinition {
            id: id.to_string(),
            name: format!("Persona {id}"),
            era: String::new(),
            philosophy: "a philosophy".to_string(),
            memories: vec![FormativeMemory {
                context: "c".to_string(),
                decision: "d".to_string(),
                reasoning: "r".to_string(),
                outcome: "o".to_string(),
                lesson: "l".to_string(),
            }],
            trigger_patterns: vec!["t".to_string()],
            blind_spots: vec!["b".to_string()],
            decision_framework: vec!["q".to_string()],
        }
    }

    fn registry(ids: &[&str]) -> SharedRegistry {
        SharedRegistry::new(
            PersonaRegistry::from_definitions(ids.iter().map(|id| definition(id)).collect())
                .expect("registry"),
        )
    }

    /// Provider that counts invocations and always answers bullish.
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReasoningProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn invoke(&self, _request: &ReasoningRequest) -> crate::reasoning::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"position": "bullish", "conviction": "high", "reasoning": "x"}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_unknown_persona_fails_before_external_work() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let council = Council::new(
            registry(&["a", "b"]),
            Arc::clone(&provider) as Arc<dyn ReasoningProvider>,
            CouncilSettings::default(),
        );

        let request = EvaluationRequest::new("ACME")
            .with_personas(vec!["a".to_string(), "ghost".to_string()]);
        let result = council.evaluate(&request).await;

        assert!(matches!(
            result,
            Err(ConclaveError::PersonaNotFound(id)) if id == "ghost"
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subset_is_normalized_to_registration_order() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let council = Council::new(
            registry(&["first", "second", "third"]),
            provider,
            CouncilSettings::default(),
        );

        let request = EvaluationRequest::new("ACME")
            .with_personas(vec!["third".to_string(), "first".to_string()]);
        let set = council.evaluate(&request).await.expect("opinion set");

        assert_eq!(set.roster, vec!["first", "third"]);
        let ids: Vec<&str> = set.opinions.iter().map(|o| o.persona_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_invariant_counts_hold() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let council = Council::new(registry(&["a", "b", "c"]), provider, CouncilSettings::default());

        let set = council
            .evaluate(&EvaluationRequest::new("ACME"))
            .await
            .expect("opinion set");

        assert_eq!(set.requested_count(), 3);
        assert_eq!(set.succeeded_count() + set.failures.len(), set.requested_count());
    }
}
