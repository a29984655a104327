//! Chat-completion client for the selection and answer generation steps
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (SiliconFlow,
//! Ollama, OpenAI itself). The request carries a bounded timeout so an
//! unresponsive upstream cannot hang a request indefinitely; callers treat a
//! timeout like any other model failure and fall back.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::AichefError;
use crate::errors::Result;

/// Client for an OpenAI-compatible chat completions API
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmService {
    /// Create an LLM client from config.
    ///
    /// Returns `Ok(None)` when no API key is configured: the service keeps
    /// running and selection degrades to deterministic fallbacks.
    ///
    /// # Errors
    /// - HTTP client build errors (invalid timeout configuration)
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        if !config.llm_enabled() {
            return Ok(None);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()
            .map_err(|e| AichefError::Http(e.to_string()))?;

        Ok(Some(Self {
            client,
            endpoint: config.llm_endpoint().trim_end_matches('/').to_string(),
            api_key: config.llm.llm_key.clone(),
            model: config.llm_model().to_string(),
        }))
    }

    /// Send a system + user prompt pair and return the assistant's text
    ///
    /// # Errors
    /// - Network failures and timeouts
    /// - Non-success HTTP status from the upstream
    /// - Responses with no choices or malformed JSON
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} ({})", url, self.model);

        let body = ChatRequest {
            model: &self.model,
            temperature,
            max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.trim()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AichefError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AichefError::Llm(format!(
                "chat API error ({status}): {error_text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AichefError::Llm(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AichefError::Llm("No choices in response".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_key_is_none() {
        let config = AppConfig::default();
        assert!(!config.llm_enabled());
        assert!(LlmService::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_from_config_with_key() {
        let mut config = AppConfig::default();
        config.llm.llm_key = "sk-test".to_string();
        let service = LlmService::from_config(&config).unwrap().unwrap();
        assert_eq!(service.model, config.llm.llm_model);
    }
}
