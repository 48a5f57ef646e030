//! Strict opinion-reply parsing
//!
//! Replies arrive as free text that should contain one JSON object. The
//! extractor tolerates the usual model framing (markdown fences, prose
//! around the object) but the payload itself is parsed against a strict
//! schema with typed enums; anything that does not validate is a parse
//! failure the orchestrator may retry exactly once.

use serde::Deserialize;
use thiserror::Error;

use sdk::opinion::{Conviction, Position};

/// Why a reply could not be parsed into an opinion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpinionParseError {
    #[error("no JSON object found in reply")]
    NoJson,

    #[error("opinion payload did not validate: {0}")]
    Schema(String),
}

/// The validated body of an opinion reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpinionPayload {
    pub position: Position,
    pub conviction: Conviction,
    pub reasoning: String,

    #[serde(default)]
    pub key_factors: Vec<String>,

    #[serde(default)]
    pub risks: Vec<String>,

    #[serde(default, alias = "blind_spots_acknowledged")]
    pub acknowledged_blind_spots: Vec<String>,
}

/// Parse a raw reply into an opinion payload.
pub fn parse_opinion(raw: &str) -> Result<OpinionPayload, OpinionParseError> {
    let candidate = extract_json(raw).ok_or(OpinionParseError::NoJson)?;
    serde_json::from_str(candidate).map_err(|e| OpinionParseError::Schema(e.to_string()))
}

/// Locate the JSON object inside a reply.
///
/// Tries a fenced block first, then the first balanced `{...}` anywhere in
/// the text.
pub(crate) fn extract_json(content: &str) -> Option<&str> {
    if let Some(fenced) = extract_fenced(content) {
        if let Some(body) = extract_balanced(fenced.trim_start()) {
            return Some(body);
        }
    }
    let start = content.find('{')?;
    extract_balanced(&content[start..])
}

/// Body of the first markdown code fence, language tag stripped.
fn extract_fenced(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_offset = after_opening.find('\n')? + 1;
    let body = &after_opening[body_offset..];

    let closing = body.find("```")?;
    if closing == 0 {
        return None;
    }
    Some(&body[..closing])
}

/// Balanced `{...}` prefix of `s`, respecting string literals.
fn extract_balanced(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
