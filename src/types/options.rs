//! Generation options shared by text and speech requests

use serde::{Deserialize, Serialize};

/// Output format requested from a text provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the provider for a JSON document (structured output flag where supported).
    Json,
}

impl ResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Options for a single generation request.
///
/// One struct serves both modalities: text providers read the sampling
/// fields, speech providers read the voice and audio fields, and each
/// ignores the rest. `None` fields fall back to provider defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Provider-specific model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    pub response_format: ResponseFormat,

    /// Sequences where generation should stop, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,

    /// Speech voice identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Language code. Default: `"en"`.
    pub language: String,

    /// Audio container/codec name. Default: `"mp3"`.
    pub audio_format: String,

    /// Speech rate multiplier, 1.0 = normal.
    pub speech_rate: f32,

    /// Pitch multiplier, 1.0 = normal.
    ///
    /// For custom speech providers. The OpenAI and ElevenLabs clients ignore
    /// it, as neither API exposes pitch. It still distinguishes cache
    /// entries.
    pub pitch: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            max_output_tokens: None,
            response_format: ResponseFormat::Text,
            stop_sequences: Vec::new(),
            voice: None,
            language: "en".to_string(),
            audio_format: "mp3".to_string(),
            speech_rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Add a single stop sequence.
    pub fn stop_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.stop_sequences.push(sequence.into());
        self
    }

    pub fn stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = sequences;
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self
    }

    pub fn speech_rate(mut self, rate: f32) -> Self {
        self.speech_rate = rate;
        self
    }

    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}
