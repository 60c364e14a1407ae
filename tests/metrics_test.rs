//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

mod common;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use common::{MockProvider, connection_error, settings};
use lectern::{
    GenerationOptions, GenerationResult, Provider, ProviderError, ProviderResult, Text,
    TextManager, TokenUsage, telemetry,
};

// ============================================================================
// Mock providers
// ============================================================================

/// Reports a fixed token usage with every answer.
struct MeteredProvider;

#[async_trait]
impl Provider<Text> for MeteredProvider {
    fn name(&self) -> &str {
        "metered"
    }

    async fn generate(
        &self,
        _payload: &str,
        _options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<Text>> {
        Ok(GenerationResult::new(
            "ok".to_string(),
            TokenUsage::new(12, 30),
            "metered",
        ))
    }
}

// ============================================================================
// Snapshot helpers
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counters matching `name` that carry the label `label=value`.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` keeps the sync `with_local_recorder` closure on the
/// current thread while `block_on` drives the inner async work.
fn recorded<T>(fut: impl Future<Output = T>) -> (T, Snapshotter) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let out = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (out, snapshotter)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_request_records_metrics() {
    let (result, snapshotter) = recorded(async {
        TextManager::builder(settings("metered", "unused"))
            .provider(Arc::new(MeteredProvider))
            .build()
            .generate("hello", &GenerationOptions::new())
            .await
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "ok"),
        1
    );
    assert!(has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS));
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, "direction", "prompt"),
        12
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, "direction", "completion"),
        30
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn fallback_records_retries_and_fallback() {
    let (result, snapshotter) = recorded(async {
        let primary = Arc::new(MockProvider::<Text>::failing("primary", connection_error()));
        let fallback = Arc::new(MockProvider::<Text>::succeeding("fallback", "ok".to_string()));
        TextManager::builder(settings("primary", "fallback"))
            .provider(primary)
            .provider(fallback)
            .build()
            .generate("hello", &GenerationOptions::new())
            .await
    });
    assert_eq!(result.unwrap().provider_name, "fallback");

    let snapshot = snapshotter.snapshot().into_vec();
    // two retries on the primary, then one hop to the fallback
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 2);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::FALLBACKS_TOTAL, "from", "primary"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "error"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "ok"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn exhausted_chain_records_no_trailing_fallback() {
    let (result, snapshotter) = recorded(async {
        let auth = ProviderError::Authentication("bad key".into());
        TextManager::builder(settings("primary", "fallback"))
            .provider(Arc::new(MockProvider::<Text>::failing("primary", auth.clone())))
            .provider(Arc::new(MockProvider::<Text>::failing("fallback", auth)))
            .build()
            .generate("hello", &GenerationOptions::new())
            .await
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::FALLBACKS_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 0);
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_lookups_are_counted() {
    let (_, snapshotter) = recorded(async {
        let manager = TextManager::builder(settings("metered", "unused"))
            .provider(Arc::new(MeteredProvider))
            .build();
        let options = GenerationOptions::new();
        manager.generate("hello", &options).await.unwrap();
        manager.generate("hello", &options).await.unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    // the hit never reached a provider
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    TextManager::builder(settings("metered", "unused"))
        .provider(Arc::new(MeteredProvider))
        .build()
        .generate("hello", &GenerationOptions::new())
        .await
        .unwrap();
}
