//! Persona evaluation context assembly
//!
//! Builds the two halves of a reasoning invocation: the system context that
//! establishes the persona's identity (philosophy, formative memories,
//! triggers, blind spots, decision framework) and the user context that
//! names the asset and pins the reply format. Assembly is deterministic
//! string building, no randomness and no I/O, so repeated requests produce
//! byte-identical prompts.

use sdk::persona::PersonaDefinition;

/// System context establishing the persona's identity.
///
/// The formative-memory narrative is the core of persona reasoning: it is
/// the compressed experience through which the persona interprets whatever
/// the user context asks about.
pub fn system_context(persona: &PersonaDefinition) -> String {
    let mut out = String::with_capacity(2048);

    out.push_str(&format!(
        "You are {}, evaluating markets through your own strategic philosophy.\n\n",
        persona.name
    ));

    out.push_str("## Your Philosophy\n");
    out.push_str(&persona.philosophy);
    out.push_str("\n\n");

    if !persona.era.trim().is_empty() {
        out.push_str("## Your Era and Context\n");
        out.push_str(&persona.era);
        out.push_str("\n\n");
    }

    out.push_str("## Formative Experiences That Shape Your Judgment\n");
    for memory in &persona.memories {
        out.push_str(&format!(
            "**{}**\nDecision: {}\nReasoning: {}\nOutcome: {}\nLesson: {}\n\n",
            memory.context, memory.decision, memory.reasoning, memory.outcome, memory.lesson
        ));
    }

    out.push_str("## What Triggers Your Interest\n");
    for pattern in &persona.trigger_patterns {
        out.push_str(&format!("- {pattern}\n"));
    }
    out.push('\n');

    out.push_str("## Your Known Blind Spots\nBe honest about these limitations:\n");
    for blind_spot in &persona.blind_spots {
        out.push_str(&format!("- {blind_spot}\n"));
    }
    out.push('\n');

    out.push_str("## Your Decision Framework\nQuestions you always ask:\n");
    for (index, question) in persona.decision_framework.iter().enumerate() {
        out.push_str(&format!("{}. {question}\n", index + 1));
    }
    out.push('\n');

    out.push_str(
        "Analyze through YOUR lens, reference your past experience where it applies, \
         acknowledge your blind spots honestly, and disagree with conventional wisdom \
         when your philosophy demands it. You are not trying to be balanced or \
         diplomatic.",
    );

    out
}

/// The JSON shape every opinion reply must follow.
const REPLY_SCHEMA: &str = r#"{
    "position": "bullish" | "bearish" | "neutral" | "avoid",
    "conviction": "high" | "medium" | "low",
    "reasoning": "2-4 sentences explaining WHY, grounded in your philosophy",
    "key_factors": ["..."],
    "risks": ["..."],
    "acknowledged_blind_spots": ["..."]
}"#;

/// User context requesting an opinion on one asset.
///
/// `structured_only` is the retry variant: after a failed parse the request
/// is repeated with an instruction that forbids anything but the JSON
/// object.
pub fn user_context(symbol: &str, context_text: Option<&str>, structured_only: bool) -> String {
    let mut out = String::with_capacity(512);

    out.push_str(&format!("Evaluate {symbol} from your perspective."));

    if let Some(context) = context_text {
        if !context.trim().is_empty() {
            out.push_str("\n\nCurrent market context:\n");
            out.push_str(context);
        }
    }

    out.push_str("\n\nReply in this JSON format:\n");
    out.push_str(REPLY_SCHEMA);

    if structured_only {
        out.push_str(
            "\n\nIMPORTANT: reply with the single JSON object only. No prose before or \
             after it, no code fences, no commentary.",
        );
    } else {
        out.push_str(
            "\n\nBe authentic to your philosophy. If you would pass on this opportunity, \
             say so clearly.",
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::persona::FormativeMemory;

    fn persona() -> PersonaDefinition {
        PersonaDefinition {
            id: "steward".to_string(),
            name: "Steward".to_string(),
            era: "Compounding through cycles".to_string(),
            philosophy: "durable moats at fair prices".to_string(),
            memories: vec![FormativeMemory {
                context: "A panic".to_string(),
                decision: "held".to_string(),
                reasoning: "business unimpaired".to_string(),
                outcome: "compounded".to_string(),
                lesson: "volatility is not risk".to_string(),
            }],
            trigger_patterns: vec!["quality on sale".to_string()],
            blind_spots: vec!["early technology shifts".to_string()],
            decision_framework: vec!["is the moat intact?".to_string()],
        }
    }

    #[test]
    fn test_system_context_carries_every_section() {
        let context = system_context(&persona());
        assert!(context.contains("You are Steward"));
        assert!(context.contains("durable moats at fair prices"));
        assert!(context.contains("Compounding through cycles"));
        assert!(context.contains("volatility is not risk"));
        assert!(context.contains("- quality on sale"));
        assert!(context.contains("- early technology shifts"));
        assert!(context.contains("1. is the moat intact?"));
    }

    #[test]
    fn test_system_context_is_deterministic() {
        let p = persona();
        assert_eq!(system_context(&p), system_context(&p));
    }

    #[test]
    fn test_empty_era_is_omitted() {
        let mut p = persona();
        p.era = String::new();
        assert!(!system_context(&p).contains("Your Era"));
    }

    #[test]
    fn test_user_context_includes_supplied_context() {
        let prompt = user_context("ACME", Some("sector under pressure"), false);
        assert!(prompt.contains("Evaluate ACME"));
        assert!(prompt.contains("sector under pressure"));
        assert!(prompt.contains("\"position\""));
        assert!(!prompt.contains("IMPORTANT"));
    }

    #[test]
    fn test_structured_only_variant_tightens_format() {
        let prompt = user_context("ACME", None, true);
        assert!(prompt.contains("single JSON object only"));
    }
}
