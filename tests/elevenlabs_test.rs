//! Wiremock tests for the ElevenLabs client.
#![cfg(feature = "elevenlabs")]

use std::time::Duration;

use lectern::{ElevenLabsClient, GenerationOptions, Provider, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ElevenLabsClient {
    ElevenLabsClient::new(Some("xi-test".into()))
        .with_base_url(server.uri())
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn synthesis_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-42"))
        .and(query_param("output_format", "mp3_44100_128"))
        .and(header("xi-api-key", "xi-test"))
        .and(body_partial_json(json!({
            "text": "Hola, clase.",
            "model_id": "eleven_multilingual_v2",
            "language_code": "es",
            "voice_settings": {"speed": 0.9}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4000]))
        .expect(1)
        .mount(&server)
        .await;

    let options = GenerationOptions::new()
        .voice("voice-42")
        .language("es")
        .speech_rate(0.9);
    let result = client(&server).generate("Hola, clase.", &options).await.unwrap();

    assert_eq!(result.provider_name, "elevenlabs");
    assert_eq!(result.content.len(), 4000);
    assert_eq!(result.usage.bytes, 4000);
}

#[tokio::test]
async fn wav_request_returns_a_wav_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"))
        .and(query_param("output_format", "pcm_24000"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 48_000]))
        .expect(1)
        .mount(&server)
        .await;

    let options = GenerationOptions::new().audio_format("wav");
    let result = client(&server).generate("Hello", &options).await.unwrap();

    let wav = &result.content;
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 48_000);
    assert_eq!(&wav[44..], &[7u8; 48_000][..]);
    assert_eq!(result.usage.bytes, 48_044);
    // 48 kB of 24 kHz 16-bit mono
    assert!((result.usage.estimated_duration_secs - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn pcm_request_returns_raw_samples() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("output_format", "pcm_24000"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 480]))
        .mount(&server)
        .await;

    let options = GenerationOptions::new().audio_format("pcm");
    let result = client(&server).generate("Hello", &options).await.unwrap();

    assert_eq!(result.content, vec![7u8; 480]);
}

#[tokio::test]
async fn quota_exhaustion_is_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate("Hello", &GenerationOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::RateLimit { retry_after: None });
}

#[tokio::test]
async fn missing_key_is_unavailable_and_rejected() {
    let client = ElevenLabsClient::new(None);
    assert!(!client.is_available());

    let err = client
        .generate("Hello", &GenerationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Authentication(_)));
}
