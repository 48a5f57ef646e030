//! Configuration management
//!
//! This module handles loading and validation of the Conclave configuration,
//! stored in TOML format.
//!
//! # Configuration Sections
//!
//! - **core**: log level, persona and trigger definition paths
//! - **council**: concurrency bound, per-unit timeout, sampling diversity
//! - **scoring**: quality and anchor persona subsets used by the pattern rules
//! - **reasoning**: reasoning collaborator endpoint and model
//! - **enrichment**: optional market enrichment collaborator
//!
//! Every field has a default so a missing section never fails
//! deserialization; `validate()` then rejects semantically broken values
//! before any component is constructed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sdk::errors::ConclaveError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Council orchestration settings
    #[serde(default)]
    pub council: CouncilConfig,

    /// Pattern scoring settings
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Reasoning collaborator settings
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Market enrichment collaborator settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path to the persona definition file
    #[serde(default)]
    pub persona_path: Option<PathBuf>,

    /// Path to the trigger condition file; bundled defaults when absent
    #[serde(default)]
    pub trigger_path: Option<PathBuf>,
}

/// Council orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    /// Cap on simultaneously in-flight reasoning calls; panel size when absent
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Per-unit timeout for one reasoning call, in seconds
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,

    /// Sampling diversity passed to the reasoning collaborator (0.0-1.0).
    /// Kept high so personas produce genuinely distinct replies.
    #[serde(default = "default_diversity")]
    pub diversity: f64,

    /// Output size cap per reasoning reply, in tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

/// Pattern scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Persona ids treated as the "quality" subset by the contrarian rule
    #[serde(default = "default_quality_personas")]
    pub quality_personas: Vec<String>,

    /// The two persona ids watched by the strategic-disagreement rule.
    /// Must be exactly two entries, or empty to disable the rule.
    #[serde(default = "default_anchor_personas")]
    pub anchor_personas: Vec<String>,
}

/// Reasoning collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Base URL for the reasoning API
    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_reasoning_api_key_env")]
    pub api_key_env: String,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_reasoning_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Market enrichment collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Whether to fetch market context before council evaluation
    #[serde(default)]
    pub enabled: bool,

    /// Base URL for the enrichment API
    #[serde(default = "default_enrichment_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_enrichment_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_enrichment_api_key_env")]
    pub api_key_env: String,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_enrichment_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_unit_timeout_secs() -> u64 {
    60
}

fn default_diversity() -> f64 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_quality_personas() -> Vec<String> {
    vec!["buffett".to_string(), "munger".to_string()]
}

fn default_anchor_personas() -> Vec<String> {
    vec!["buffett".to_string(), "burry".to_string()]
}

fn default_reasoning_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_reasoning_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_reasoning_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_reasoning_timeout_secs() -> u64 {
    60
}

fn default_enrichment_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_enrichment_model() -> String {
    "sonar".to_string()
}

fn default_enrichment_api_key_env() -> String {
    "PERPLEXITY_API_KEY".to_string()
}

fn default_enrichment_timeout_secs() -> u64 {
    30
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            persona_path: None,
            trigger_path: None,
        }
    }
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            unit_timeout_secs: default_unit_timeout_secs(),
            diversity: default_diversity(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quality_personas: default_quality_personas(),
            anchor_personas: default_anchor_personas(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: default_reasoning_base_url(),
            model: default_reasoning_model(),
            api_key_env: default_reasoning_api_key_env(),
            request_timeout_secs: default_reasoning_timeout_secs(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_enrichment_base_url(),
            model: default_enrichment_model(),
            api_key_env: default_enrichment_api_key_env(),
            request_timeout_secs: default_enrichment_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConclaveError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| ConclaveError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConclaveError> {
        if let Some(max) = self.council.max_concurrent {
            if max == 0 {
                return Err(ConclaveError::Config(
                    "council.max_concurrent must be at least 1".to_string(),
                ));
            }
        }
        if self.council.unit_timeout_secs == 0 {
            return Err(ConclaveError::Config(
                "council.unit_timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.council.diversity) {
            return Err(ConclaveError::Config(format!(
                "council.diversity must be within 0.0-1.0, got {}",
                self.council.diversity
            )));
        }
        let anchors = &self.scoring.anchor_personas;
        if !anchors.is_empty() && anchors.len() != 2 {
            return Err(ConclaveError::Config(format!(
                "scoring.anchor_personas must name exactly two personas, got {}",
                anchors.len()
            )));
        }
        if anchors.len() == 2 && anchors[0] == anchors[1] {
            return Err(ConclaveError::Config(
                "scoring.anchor_personas must name two distinct personas".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-unit timeout as a `Duration`.
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.council.unit_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.council.unit_timeout_secs, 60);
        assert_eq!(config.council.max_output_tokens, 1024);
        assert!(!config.enrichment.enabled);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[council]
max_concurrent = 3
unit_timeout_secs = 15

[scoring]
anchor_personas = ["steward", "skeptic"]
"#
        )
        .expect("write");

        let config = Config::load(file.path()).expect("load");
        assert_eq!(config.council.max_concurrent, Some(3));
        assert_eq!(config.unit_timeout(), Duration::from_secs(15));
        assert_eq!(config.scoring.anchor_personas.len(), 2);
        // Untouched sections keep their defaults
        assert_eq!(config.reasoning.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_rejects_single_anchor() {
        let mut config = Config::default();
        config.scoring.anchor_personas = vec!["only-one".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_anchors() {
        let mut config = Config::default();
        config.scoring.anchor_personas = vec!["same".to_string(), "same".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.council.max_concurrent = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_diversity() {
        let mut config = Config::default();
        config.council.diversity = 1.5;
        assert!(config.validate().is_err());
    }
}
