//! Anthropic Messages API client for text generation.
//!
//! See: <https://docs.anthropic.com/en/api/messages>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::classify::{check_response, classify_transport, read_json};
use super::pricing::estimate_cost;
use super::traits::Provider;
use super::DEFAULT_TIMEOUT;
use crate::error::{ProviderError, ProviderResult};
use crate::modality::Text;
use crate::types::{GenerationOptions, GenerationResult, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
/// The Messages API requires `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Clone)]
pub struct AnthropicClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub const NAME: &'static str = "anthropic";

    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another host (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<MessagesUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl Provider<Text> for AnthropicClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    // No JSON mode on this API; structured requests rely on the prompt.
    async fn generate(
        &self,
        payload: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<Text>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Authentication("no Anthropic API key configured".into()))?;
        let model = options.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let body = MessagesRequest {
            model,
            max_tokens: options.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: [Message {
                role: "user",
                content: payload,
            }],
            temperature: options.temperature,
            stop_sequences: (!options.stop_sequences.is_empty())
                .then_some(options.stop_sequences.as_slice()),
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;
        let response = check_response(response, self.timeout).await?;
        let parsed: MessagesResponse = read_json(response, self.timeout).await?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse("no text content blocks".into()));
        }

        let usage = parsed
            .usage
            .map(|u| {
                TokenUsage::new(u.input_tokens, u.output_tokens).with_cost(estimate_cost(
                    Self::NAME,
                    model,
                    u.input_tokens,
                    u.output_tokens,
                ))
            })
            .unwrap_or_default();

        Ok(GenerationResult::new(text, usage, Self::NAME))
    }
}
