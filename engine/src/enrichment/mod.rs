//! Market enrichment collaborator boundary
//!
//! Optional pre-evaluation step that fetches current market context for a
//! symbol from an external research service. Absence is treated as "no
//! extra context", never as a failure: the pipeline logs and continues, and
//! personas simply evaluate without the extra text.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use sdk::errors::ConclaveError;

use crate::config::EnrichmentConfig;

/// Marker that market context could not be fetched. Not fatal anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("market enrichment unavailable: {reason}")]
pub struct EnrichmentUnavailable {
    pub reason: String,
}

/// Market enrichment collaborator.
#[async_trait]
pub trait MarketEnrichment: Send + Sync {
    /// Fetch free-text market context for a symbol.
    async fn enrich(&self, symbol: &str) -> Result<String, EnrichmentUnavailable>;
}

/// HTTP enrichment against a chat-completions research API.
pub struct HttpEnrichment {
    config: EnrichmentConfig,
    api_key: String,
    client: reqwest::Client,
}

impl HttpEnrichment {
    /// Build from config, resolving the API key from the configured
    /// environment variable.
    pub fn new(config: EnrichmentConfig) -> Result<Self, ConclaveError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ConclaveError::Config(format!(
                "enrichment API key not found in environment variable {}",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConclaveError::Config(format!("http client: {e}")))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn research_prompt(symbol: &str) -> String {
        format!(
            "Summarize the current situation around {symbol}: recent developments \
             (last 30 days), market sentiment, price action, key risks, and upcoming \
             catalysts. Focus on facts; be concise."
        )
    }
}

#[async_trait]
impl MarketEnrichment for HttpEnrichment {
    async fn enrich(&self, symbol: &str) -> Result<String, EnrichmentUnavailable> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let payload = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a financial research assistant. Provide factual, \
                                well-sourced market analysis. Be concise and focus on \
                                actionable information.",
                },
                {
                    "role": "user",
                    "content": Self::research_prompt(symbol),
                },
            ],
            "temperature": 0.2,
            "max_tokens": 1024,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EnrichmentUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentUnavailable {
                reason: format!("status {status}"),
            });
        }

        let data: serde_json::Value =
            response.json().await.map_err(|e| EnrichmentUnavailable {
                reason: e.to_string(),
            })?;

        data.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| EnrichmentUnavailable {
                reason: "no content in response".to_string(),
            })
    }
}
