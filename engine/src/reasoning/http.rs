//! HTTP reasoning provider
//!
//! Talks to a messages-style completion API. The API key is resolved from a
//! configured environment variable at construction time so a misconfigured
//! deployment fails before any council work starts.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use sdk::errors::ConclaveError;

use super::{ReasoningError, ReasoningProvider, ReasoningRequest};
use crate::config::ReasoningConfig;

pub struct HttpReasoningProvider {
    config: ReasoningConfig,
    api_key: String,
    client: reqwest::Client,
}

impl HttpReasoningProvider {
    /// Build a provider from config, resolving the API key from the
    /// configured environment variable.
    pub fn new(config: ReasoningConfig) -> Result<Self, ConclaveError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ConclaveError::Config(format!(
                "reasoning API key not found in environment variable {}",
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

    /// Build a provider with an explicit key, bypassing the environment.
    pub fn with_api_key(
        config: ReasoningConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ConclaveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConclaveError::Config(format!("http client: {e}")))?;
        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn invoke(&self, request: &ReasoningRequest) -> super::Result<String> {
        let url = format!("{}/messages", self.config.base_url);

        let payload = json!({
            "model": self.config.model,
            "max_tokens": request.max_output_tokens,
            "temperature": request.diversity,
            "system": request.system_context,
            "messages": [{
                "role": "user",
                "content": request.user_context,
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout
                } else {
                    ReasoningError::Service(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ReasoningError::RateLimited);
            }
            return Err(ReasoningError::Service(format!("{status}: {body}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReasoningError::Service(e.to_string()))?;

        let blocks = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ReasoningError::Service("no content array in response".to_string())
            })?;

        let mut text = String::new();
        for block in blocks {
            if let Some(part) = block.get("text").and_then(|t| t.as_str()) {
                text.push_str(part);
            }
        }

        Ok(text)
    }
}
