//! Text and speech as two instances of one orchestration shape.
//!
//! The manager, provider trait and cache are written once, generic over a
//! [`Modality`]. A modality fixes what a provider produces (`Content`), how
//! consumption is reported (`Usage`), and which request fields distinguish
//! two otherwise identical payloads in the cache.

use std::fmt;

use crate::telemetry;
use crate::types::{AudioUsage, GenerationOptions, TokenUsage};

/// One family of generation backends.
pub trait Modality: fmt::Debug + Clone + Send + Sync + 'static {
    /// What a provider call produces.
    type Content: Clone + fmt::Debug + Send + Sync + 'static;

    /// Consumption report attached to each result.
    type Usage: Clone + fmt::Debug + Default + Send + Sync + 'static;

    /// Short name used in cache key namespaces, logs and metric labels.
    const NAME: &'static str;

    /// Every option that changes what a provider produces, in canonical
    /// form. Two requests share a cache entry only if payload, language
    /// and all of these match.
    fn key_fields(options: &GenerationOptions) -> Vec<String>;

    /// Usage reported for content served from cache.
    fn cached_usage(content: &Self::Content, options: &GenerationOptions) -> Self::Usage;

    /// Emit consumption metrics for a provider-produced result.
    fn record_usage(provider: &str, usage: &Self::Usage);
}

/// Text generation: prompt in, text out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

/// Speech synthesis: text in, encoded audio out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Speech;

impl Modality for Text {
    type Content = String;
    type Usage = TokenUsage;

    const NAME: &'static str = "text";

    fn key_fields(options: &GenerationOptions) -> Vec<String> {
        let mut fields = vec![
            options.model.clone().unwrap_or_default(),
            options.response_format.as_str().to_string(),
            options.temperature.map(f32_field).unwrap_or_default(),
            options
                .max_output_tokens
                .map(|n| n.to_string())
                .unwrap_or_default(),
        ];
        fields.extend(options.stop_sequences.iter().cloned());
        fields
    }

    fn cached_usage(_content: &String, _options: &GenerationOptions) -> TokenUsage {
        // nothing was spent
        TokenUsage::default()
    }

    fn record_usage(provider: &str, usage: &TokenUsage) {
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.to_owned(),
            "direction" => "prompt",
        )
        .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.to_owned(),
            "direction" => "completion",
        )
        .increment(u64::from(usage.completion_tokens));
    }
}

impl Modality for Speech {
    type Content = Vec<u8>;
    type Usage = AudioUsage;

    const NAME: &'static str = "speech";

    fn key_fields(options: &GenerationOptions) -> Vec<String> {
        vec![
            options.voice.clone().unwrap_or_default(),
            options.audio_format.trim().to_ascii_lowercase(),
            options.model.clone().unwrap_or_default(),
            f32_field(options.speech_rate),
            f32_field(options.pitch),
        ]
    }

    fn cached_usage(content: &Vec<u8>, options: &GenerationOptions) -> AudioUsage {
        AudioUsage::estimate(content.len(), &options.audio_format)
    }

    fn record_usage(provider: &str, usage: &AudioUsage) {
        metrics::counter!(telemetry::AUDIO_BYTES_TOTAL, "provider" => provider.to_owned())
            .increment(usage.bytes as u64);
    }
}

/// Bit-exact float rendering; `-0.0` folds into `0.0`.
fn f32_field(value: f32) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:08x}", value.to_bits())
}
