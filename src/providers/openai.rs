//! OpenAI client for chat completions and text-to-speech.
//!
//! One client serves both modalities: [`Provider<Text>`] posts to
//! `/v1/chat/completions`, [`Provider<Speech>`] to `/v1/audio/speech`.
//! See: <https://platform.openai.com/docs/api-reference>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::classify::{check_response, classify_transport, read_json};
use super::pricing::estimate_cost;
use super::traits::Provider;
use super::DEFAULT_TIMEOUT;
use crate::error::{ProviderError, ProviderResult};
use crate::modality::{Speech, Text};
use crate::types::{AudioUsage, GenerationOptions, GenerationResult, ResponseFormat, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SPEECH_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "alloy";

/// Client for the OpenAI REST API.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub const NAME: &'static str = "openai";

    /// Create a client. Without a key the client is registered but unavailable.
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

    /// Per-request deadline. Default: 60s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn post(&self, path: &str) -> ProviderResult<RequestBuilder> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Authentication("no OpenAI API key configured".into()))?;
        Ok(self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(key)
            .timeout(self.timeout))
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;
        check_response(response, self.timeout).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonMode>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct JsonMode {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

#[async_trait]
impl Provider<Text> for OpenAiClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        payload: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<Text>> {
        let model = options.model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL);
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: payload,
            }],
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
            stop: (!options.stop_sequences.is_empty()).then_some(options.stop_sequences.as_slice()),
            response_format: (options.response_format == ResponseFormat::Json)
                .then_some(JsonMode { kind: "json_object" }),
        };

        let response = self.send(self.post("/v1/chat/completions")?.json(&body)).await?;
        let parsed: ChatResponse = read_json(response, self.timeout).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("no message content in choices".into()))?;

        let usage = parsed
            .usage
            .map(|u| {
                TokenUsage::new(u.prompt_tokens, u.completion_tokens).with_cost(estimate_cost(
                    Self::NAME,
                    model,
                    u.prompt_tokens,
                    u.completion_tokens,
                ))
            })
            .unwrap_or_default();

        Ok(GenerationResult::new(content, usage, Self::NAME))
    }
}

#[async_trait]
impl Provider<Speech> for OpenAiClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        payload: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<Speech>> {
        let body = SpeechRequest {
            model: options.model.as_deref().unwrap_or(DEFAULT_SPEECH_MODEL),
            input: payload,
            voice: options.voice.as_deref().unwrap_or(DEFAULT_VOICE),
            response_format: &options.audio_format,
            speed: options.speech_rate,
        };

        let response = self.send(self.post("/v1/audio/speech")?.json(&body)).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;
        if audio.is_empty() {
            return Err(ProviderError::MalformedResponse("empty audio body".into()));
        }

        let usage = AudioUsage::estimate(audio.len(), &options.audio_format);
        Ok(GenerationResult::new(audio.to_vec(), usage, Self::NAME))
    }
}
