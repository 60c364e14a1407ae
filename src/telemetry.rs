//! Telemetry metric name constants.
//!
//! Centralised metric names for lectern operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `lectern_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `modality`: "text" or "speech"
//! - `provider`: provider name (e.g. "openai", "elevenlabs")
//! - `operation`: entry point (e.g. "generate", "generate_structured")
//! - `status`: outcome: "ok" or "error"
//! - `kind`: classified error kind (e.g. "rate_limit")

/// Provider chain walks, one per provider tried.
///
/// Labels: `modality`, `provider`, `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "lectern_requests_total";

/// Duration of each provider's share of a request, retries included.
///
/// Labels: `modality`, `provider`, `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "lectern_request_duration_seconds";

/// Retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`, `kind`.
pub const RETRIES_TOTAL: &str = "lectern_retries_total";

/// Advances from one provider to the next in a chain.
///
/// Labels: `modality`, `from`, `kind`.
pub const FALLBACKS_TOTAL: &str = "lectern_fallbacks_total";

/// Total tokens consumed by text providers.
///
/// Labels: `provider`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "lectern_tokens_total";

/// Total audio bytes produced by speech providers.
///
/// Labels: `provider`.
pub const AUDIO_BYTES_TOTAL: &str = "lectern_audio_bytes_total";

/// Cache lookups that returned a live entry.
pub const CACHE_HITS_TOTAL: &str = "lectern_cache_hits_total";

/// Cache lookups that found nothing or an expired entry.
pub const CACHE_MISSES_TOTAL: &str = "lectern_cache_misses_total";
