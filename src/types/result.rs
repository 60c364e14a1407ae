//! Generation results and usage reports

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::modality::Modality;

/// `provider_name` of results served from cache.
pub const CACHE_PROVIDER: &str = "cache";

/// Outcome of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerationResult<M: Modality> {
    /// Generated text, or encoded audio bytes.
    pub content: M::Content,
    pub usage: M::Usage,
    /// Backend that produced the content, or [`CACHE_PROVIDER`].
    pub provider_name: String,
    /// Wall-clock duration of the producing call; 0 when cached.
    pub latency_ms: u64,
    /// True when served without a backend call.
    pub cached: bool,
}

impl<M: Modality> GenerationResult<M> {
    /// Result of a fresh provider call. The manager fills in latency.
    pub fn new(content: M::Content, usage: M::Usage, provider_name: impl Into<String>) -> Self {
        Self {
            content,
            usage,
            provider_name: provider_name.into(),
            latency_ms: 0,
            cached: false,
        }
    }

    pub(crate) fn from_cache(content: M::Content, usage: M::Usage) -> Self {
        Self {
            content,
            usage,
            provider_name: CACHE_PROVIDER.to_string(),
            latency_ms: 0,
            cached: true,
        }
    }
}

/// Token consumption of a text generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Derived from the provider's price table; 0.0 when the model is unpriced.
    pub estimated_cost_usd: f64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            estimated_cost_usd: 0.0,
        }
    }

    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.estimated_cost_usd = cost_usd;
        self
    }
}

/// Size and estimated duration of a synthesized clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioUsage {
    pub bytes: usize,
    pub estimated_duration_secs: f64,
}

impl AudioUsage {
    /// Estimate duration from byte length and the nominal bitrate of `format`.
    pub fn estimate(bytes: usize, format: &str) -> Self {
        let bits_per_sec = f64::from(nominal_bitrate(format));
        Self {
            bytes,
            estimated_duration_secs: (bytes as f64 * 8.0) / bits_per_sec,
        }
    }
}

/// Nominal bitrates of the formats speech backends emit by default.
fn nominal_bitrate(format: &str) -> u32 {
    match format.to_ascii_lowercase().as_str() {
        "opus" => 64_000,
        "aac" | "mp3" => 128_000,
        // 24 kHz, 16-bit mono
        "wav" | "pcm" => 384_000,
        "flac" => 256_000,
        "ulaw" | "mulaw" => 64_000,
        _ => 128_000,
    }
}

/// Outcome of a batch sent to a single provider.
///
/// Failed items do not abort the batch; they are listed in `failures`.
#[derive(Debug, Clone)]
pub struct BatchResult<M: Modality> {
    /// Provider the batch was sent to.
    pub provider_name: String,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful items, in input order.
    pub results: Vec<BatchItem<M>>,
    /// Failed items, in input order.
    pub failures: Vec<BatchFailure>,
}

/// A successful batch item and its position in the input.
#[derive(Debug, Clone)]
pub struct BatchItem<M: Modality> {
    pub index: usize,
    pub result: GenerationResult<M>,
}

/// A failed batch item and its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub index: usize,
    pub error: ProviderError,
}
