//! ElevenLabs text-to-speech client.
//!
//! See: <https://elevenlabs.io/docs/api-reference/text-to-speech/convert>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::classify::{check_response, classify_transport};
use super::traits::Provider;
use super::DEFAULT_TIMEOUT;
use crate::error::{ProviderError, ProviderResult};
use crate::modality::Speech;
use crate::types::{AudioUsage, GenerationOptions, GenerationResult};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
/// "Rachel", a stock voice present on every account.
const DEFAULT_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";
/// Sample rate of the `pcm_24000` output format (16-bit mono).
const PCM_SAMPLE_RATE: u32 = 24_000;

#[derive(Clone)]
pub struct ElevenLabsClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ElevenLabsClient {
    pub const NAME: &'static str = "elevenlabs";

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

/// Vendor `output_format` for a generic audio format name.
fn output_format(audio_format: &str) -> &'static str {
    match audio_format.to_ascii_lowercase().as_str() {
        "pcm" | "wav" => "pcm_24000",
        "ulaw" | "mulaw" => "ulaw_8000",
        "opus" => "opus_48000_64",
        _ => "mp3_44100_128",
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    language_code: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    speed: f32,
}

#[async_trait]
impl Provider<Speech> for ElevenLabsClient {
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
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Authentication("no ElevenLabs API key configured".into()))?;
        let voice = options.voice.as_deref().unwrap_or(DEFAULT_VOICE);
        let body = SynthesisRequest {
            text: payload,
            model_id: options.model.as_deref().unwrap_or(DEFAULT_MODEL),
            language_code: &options.language,
            voice_settings: VoiceSettings {
                speed: options.speech_rate,
            },
        };

        let response = self
            .http
            .post(format!("{}/v1/text-to-speech/{voice}", self.base_url))
            .query(&[("output_format", output_format(&options.audio_format))])
            .header("xi-api-key", key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;
        let response = check_response(response, self.timeout).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;
        if audio.is_empty() {
            return Err(ProviderError::MalformedResponse("empty audio body".into()));
        }

        let estimate = AudioUsage::estimate(audio.len(), &options.audio_format);
        // the API has no wav output; wrap its raw PCM
        let audio = if options.audio_format.eq_ignore_ascii_case("wav") {
            wav_from_pcm(&audio, PCM_SAMPLE_RATE)?
        } else {
            audio.to_vec()
        };
        let usage = AudioUsage {
            bytes: audio.len(),
            ..estimate
        };
        Ok(GenerationResult::new(audio, usage, Self::NAME))
    }
}

/// Prefix 16-bit mono little-endian PCM with a 44-byte RIFF/WAVE header.
fn wav_from_pcm(pcm: &[u8], sample_rate: u32) -> ProviderResult<Vec<u8>> {
    const CHANNELS: u16 = 1;
    const BITS_PER_SAMPLE: u16 = 16;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;

    let data_len = u32::try_from(pcm.len())
        .ok()
        .filter(|len| *len <= u32::MAX - 36)
        .ok_or_else(|| ProviderError::MalformedResponse("PCM body too large for WAV".into()))?;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    Ok(wav)
}
