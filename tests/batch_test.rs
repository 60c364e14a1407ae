//! Tests for batch speech synthesis.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockProvider, settings};
use lectern::{GenerationOptions, LecternError, ProviderError, Speech, SpeechManager};

fn items(payloads: &[&str]) -> Vec<(String, GenerationOptions)> {
    payloads
        .iter()
        .map(|p| (p.to_string(), GenerationOptions::new().voice("nova")))
        .collect()
}

/// Audio bytes echo the payload so results can be matched to inputs.
fn echo(name: &'static str) -> MockProvider<Speech> {
    MockProvider::new(name, |payload, _| {
        if payload.starts_with("fail") {
            Err(ProviderError::Generic("unsupported text".into()))
        } else {
            Ok(payload.as_bytes().to_vec())
        }
    })
}

fn manager(primary: &Arc<MockProvider<Speech>>, fallback: &Arc<MockProvider<Speech>>) -> SpeechManager {
    SpeechManager::builder(settings("primary", "fallback"))
        .provider(primary.clone())
        .provider(fallback.clone())
        .build()
}

#[tokio::test]
async fn every_item_succeeds() {
    let primary = Arc::new(echo("primary"));
    let fallback = Arc::new(echo("fallback"));

    let batch = manager(&primary, &fallback)
        .generate_batch(&items(&["one", "two", "three"]))
        .await
        .unwrap();

    assert_eq!(batch.provider_name, "primary");
    assert_eq!(batch.succeeded, 3);
    assert_eq!(batch.failed, 0);
    let contents: Vec<&[u8]> = batch.results.iter().map(|i| i.result.content.as_slice()).collect();
    assert_eq!(contents, vec![b"one".as_slice(), b"two".as_slice(), b"three".as_slice()]);
    assert_eq!(
        batch.results.iter().map(|i| i.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test(start_paused = true)]
async fn items_in_flight_are_bounded() {
    let primary = Arc::new(echo("primary").with_latency(Duration::from_millis(100)));
    let manager = SpeechManager::builder(lectern::ModalitySettings::new("primary").batch_concurrency(2))
        .provider(primary.clone())
        .build();

    let start = tokio::time::Instant::now();
    let batch = manager
        .generate_batch(&items(&["a", "b", "c", "d", "e", "f"]))
        .await
        .unwrap();

    // three waves of two, not one wave of six
    assert_eq!(start.elapsed(), Duration::from_millis(300));
    assert_eq!(batch.succeeded, 6);
    let contents: Vec<&[u8]> = batch.results.iter().map(|i| i.result.content.as_slice()).collect();
    assert_eq!(
        contents,
        vec![
            b"a".as_slice(),
            b"b".as_slice(),
            b"c".as_slice(),
            b"d".as_slice(),
            b"e".as_slice(),
            b"f".as_slice()
        ]
    );
}

#[tokio::test]
async fn failed_items_are_partial_failures() {
    let primary = Arc::new(echo("primary"));
    let fallback = Arc::new(echo("fallback"));

    let batch = manager(&primary, &fallback)
        .generate_batch(&items(&["one", "fail-me", "three"]))
        .await
        .unwrap();

    assert_eq!(batch.succeeded, 2);
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.failures[0].index, 1);
    assert!(matches!(batch.failures[0].error, ProviderError::Generic(_)));
    assert_eq!(fallback.calls(), 0, "no per-item fallback");
}

#[tokio::test]
async fn fully_failed_batch_is_still_a_batch_result() {
    let primary = Arc::new(MockProvider::<Speech>::failing(
        "primary",
        ProviderError::Authentication("bad key".into()),
    ));
    let fallback = Arc::new(echo("fallback"));

    let batch = manager(&primary, &fallback)
        .generate_batch(&items(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(batch.failed, 2);
    assert_eq!(batch.succeeded, 0);
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn first_available_provider_takes_the_batch() {
    let primary = Arc::new(echo("primary").unavailable());
    let fallback = Arc::new(echo("fallback"));

    let batch = manager(&primary, &fallback)
        .generate_batch(&items(&["a"]))
        .await
        .unwrap();

    assert_eq!(batch.provider_name, "fallback");
    assert_eq!(primary.calls(), 0);
}

#[tokio::test]
async fn cached_items_are_not_resent() {
    let primary = Arc::new(echo("primary"));
    let fallback = Arc::new(echo("fallback"));
    let manager = manager(&primary, &fallback);

    manager
        .generate("one", &GenerationOptions::new().voice("nova"))
        .await
        .unwrap();
    let batch = manager.generate_batch(&items(&["one", "two"])).await.unwrap();

    assert_eq!(primary.calls(), 2);
    assert!(batch.results[0].result.cached);
    assert!(!batch.results[1].result.cached);

    // batch results populate the cache too
    let again = manager
        .generate("two", &GenerationOptions::new().voice("nova"))
        .await
        .unwrap();
    assert!(again.cached);
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let primary = Arc::new(echo("primary"));
    let fallback = Arc::new(echo("fallback"));

    let batch = manager(&primary, &fallback).generate_batch(&[]).await.unwrap();

    assert_eq!(batch.succeeded + batch.failed, 0);
}

#[tokio::test]
async fn disabled_batch_is_refused() {
    let primary = Arc::new(echo("primary"));
    let manager = SpeechManager::builder(settings("primary", "fallback").enabled(false))
        .provider(primary.clone())
        .build();

    let err = manager.generate_batch(&items(&["a"])).await.unwrap_err();

    assert!(matches!(
        err,
        LecternError::ConfigurationDisabled { modality: "speech" }
    ));
    assert_eq!(primary.calls(), 0);
}

#[tokio::test]
async fn no_available_provider_is_refused() {
    let primary = Arc::new(echo("primary").unavailable());
    let manager = SpeechManager::builder(lectern::ModalitySettings::new("primary"))
        .provider(primary)
        .build();

    let err = manager.generate_batch(&items(&["a"])).await.unwrap_err();

    assert!(matches!(err, LecternError::NoProvidersAvailable { .. }));
}
