//! Generation manager: provider selection, retry, fallback and caching.
//!
//! One [`GenerationManager`] per modality. It owns the provider registry
//! (name → provider), the settings, and optionally a cache; it is the only
//! component that knows about all three.
//!
//! # Call flow
//!
//! ```text
//! generate(payload, options)
//!        │
//!        ├─ disabled? ─────────────────────► ConfigurationDisabled
//!        ├─ cache hit? ────────────────────► result (cached = true)
//!        ▼
//!   [primary, fallback]  (registered + available, distinct)
//!        │   empty ────────────────────────► NoProvidersAvailable
//!        ▼
//!   for each provider:
//!     attempt ─ RateLimit/Timeout/Connection ─► backoff, re-attempt
//!        │       (up to max_retries)
//!        ├─ ok ─► cache store ─────────────► result (cached = false)
//!        └─ terminal error ─► next provider
//!        ▼
//!   AllProvidersFailed [(provider, error), …]
//! ```

mod batch;
mod structured;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheConfig, CacheKey, ResponseCache};
use crate::config::ModalitySettings;
use crate::error::{ProviderError, ProviderFailure, ProviderResult};
use crate::modality::{Modality, Speech, Text};
use crate::providers::retry::{whole_millis, with_retry};
use crate::providers::{Provider, RetryConfig};
use crate::telemetry;
use crate::types::{GenerationOptions, GenerationResult};
use crate::{LecternError, Result};

/// Manager for text generation.
pub type TextManager = GenerationManager<Text>;

/// Manager for speech synthesis.
pub type SpeechManager = GenerationManager<Speech>;

/// Orchestrates one modality's providers.
///
/// Immutable after [`build`](GenerationManagerBuilder::build); share it
/// behind an `Arc`.
pub struct GenerationManager<M: Modality> {
    settings: ModalitySettings,
    retry: RetryConfig,
    providers: HashMap<String, Arc<dyn Provider<M>>>,
    cache: Option<Arc<ResponseCache<M::Content>>>,
}

impl<M: Modality> fmt::Debug for GenerationManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationManager")
            .field("modality", &M::NAME)
            .field("settings", &self.settings)
            .field("providers", &self.provider_names())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

/// Builder for [`GenerationManager`].
pub struct GenerationManagerBuilder<M: Modality> {
    settings: ModalitySettings,
    providers: HashMap<String, Arc<dyn Provider<M>>>,
    cache: Option<Arc<ResponseCache<M::Content>>>,
}

impl<M: Modality> GenerationManagerBuilder<M> {
    /// Register a provider under its [`name()`](Provider::name).
    ///
    /// A later registration with the same name replaces the earlier one.
    pub fn provider(mut self, provider: Arc<dyn Provider<M>>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    /// Use a shared cache instead of a private one.
    ///
    /// Ignored when the settings disable caching.
    pub fn cache(mut self, cache: Arc<ResponseCache<M::Content>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> GenerationManager<M> {
        let cache = self.settings.cache_enabled.then(|| {
            self.cache
                .unwrap_or_else(|| Arc::new(ResponseCache::new(&CacheConfig::default())))
        });
        GenerationManager {
            retry: self.settings.retry_config(),
            settings: self.settings,
            providers: self.providers,
            cache,
        }
    }
}

impl<M: Modality> GenerationManager<M> {
    pub fn builder(settings: ModalitySettings) -> GenerationManagerBuilder<M> {
        GenerationManagerBuilder {
            settings,
            providers: HashMap::new(),
            cache: None,
        }
    }

    pub fn settings(&self) -> &ModalitySettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// The manager's cache, absent when caching is disabled.
    pub fn cache(&self) -> Option<&Arc<ResponseCache<M::Content>>> {
        self.cache.as_ref()
    }

    /// Registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Drop every cached entry of this modality. Returns the number removed.
    pub fn invalidate_cache(&self) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.invalidate_by_prefix(&format!("{}:", M::NAME)))
    }

    /// Generate content, falling back from primary to fallback provider.
    #[instrument(skip(self, payload, options), fields(modality = M::NAME, operation = "generate"))]
    pub async fn generate(
        &self,
        payload: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResult<M>> {
        let (result, ()) = self.run(payload, options, "generate", |_| Ok(())).await?;
        Ok(result)
    }

    /// The shared orchestration behind every entry point.
    ///
    /// `accept` inspects produced content. Rejection is a terminal
    /// (non-retried) error for that provider and sends the chain onward;
    /// a rejected cache entry is evicted and treated as a miss.
    async fn run<T, F>(
        &self,
        payload: &str,
        options: &GenerationOptions,
        operation: &'static str,
        accept: F,
    ) -> Result<(GenerationResult<M>, T)>
    where
        F: Fn(&M::Content) -> ProviderResult<T> + Send + Sync,
        T: Send,
    {
        self.ensure_enabled()?;

        let key = self.cache_key(payload, options);
        if let Some(hit) = self.cached(&key, options, &accept) {
            return Ok(hit);
        }

        let chain = self.provider_chain();
        if chain.is_empty() {
            warn!(modality = M::NAME, "no providers available");
            return Err(LecternError::NoProvidersAvailable { modality: M::NAME });
        }

        let mut failures = Vec::with_capacity(chain.len());
        let mut remaining = chain.len();
        for provider in chain {
            remaining -= 1;
            let name = provider.name();
            let start = Instant::now();
            let outcome = with_retry(&self.retry, name, operation, || {
                self.attempt(provider.as_ref(), payload, options, &accept)
            })
            .await;

            match outcome {
                Ok((result, accepted)) => {
                    Self::record_request(operation, name, start, true);
                    M::record_usage(name, &result.usage);
                    if let Some(cache) = &self.cache {
                        cache.set(key.as_str(), result.content.clone(), self.settings.cache_ttl());
                    }
                    return Ok((result, accepted));
                }
                Err(error) => {
                    Self::record_request(operation, name, start, false);
                    if remaining > 0 {
                        metrics::counter!(telemetry::FALLBACKS_TOTAL,
                            "modality" => M::NAME,
                            "from" => name.to_owned(),
                            "kind" => error.kind().as_str(),
                        )
                        .increment(1);
                        info!(provider = name, error = %error, "provider failed, falling back");
                    }
                    failures.push(ProviderFailure {
                        provider: name.to_string(),
                        error,
                    });
                }
            }
        }

        warn!(modality = M::NAME, attempts = failures.len(), "all providers failed");
        Err(LecternError::AllProvidersFailed { failures })
    }

    /// One provider call under the per-call deadline.
    ///
    /// Latency covers this attempt only.
    async fn attempt<T, F>(
        &self,
        provider: &dyn Provider<M>,
        payload: &str,
        options: &GenerationOptions,
        accept: &F,
    ) -> ProviderResult<(GenerationResult<M>, T)>
    where
        F: Fn(&M::Content) -> ProviderResult<T>,
    {
        let deadline = self.settings.timeout();
        let started = Instant::now();
        let mut result = tokio::time::timeout(deadline, provider.generate(payload, options))
            .await
            .map_err(|_| ProviderError::Timeout(deadline))??;
        let accepted = accept(&result.content)?;

        result.latency_ms = whole_millis(started.elapsed());
        result.cached = false;
        Ok((result, accepted))
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.settings.enabled {
            Ok(())
        } else {
            debug!(modality = M::NAME, "generation disabled");
            Err(LecternError::ConfigurationDisabled { modality: M::NAME })
        }
    }

    fn cache_key(&self, payload: &str, options: &GenerationOptions) -> CacheKey {
        CacheKey::fingerprint(M::NAME, payload, &options.language, &M::key_fields(options))
    }

    /// Serve from cache if a live entry exists and passes `accept`.
    fn cached<T, F>(
        &self,
        key: &CacheKey,
        options: &GenerationOptions,
        accept: &F,
    ) -> Option<(GenerationResult<M>, T)>
    where
        F: Fn(&M::Content) -> ProviderResult<T>,
    {
        let cache = self.cache.as_ref()?;
        let content = cache.get(key.as_str())?;
        match accept(&content) {
            Ok(accepted) => {
                debug!(modality = M::NAME, key = %key, "cache hit");
                let usage = M::cached_usage(&content, options);
                Some((GenerationResult::from_cache(content, usage), accepted))
            }
            Err(error) => {
                debug!(modality = M::NAME, key = %key, error = %error, "evicting rejected cache entry");
                cache.invalidate(key.as_str());
                None
            }
        }
    }

    /// Primary then fallback, each only if registered and available.
    ///
    /// Skipped providers are not attempts and leave no failure entry.
    fn provider_chain(&self) -> Vec<&Arc<dyn Provider<M>>> {
        let primary = self.settings.primary.as_deref();
        let fallback = self
            .settings
            .fallback
            .as_deref()
            .filter(|name| Some(*name) != primary);

        let mut chain = Vec::with_capacity(2);
        for name in [primary, fallback].into_iter().flatten() {
            match self.providers.get(name) {
                Some(provider) if provider.is_available() => chain.push(provider),
                Some(_) => debug!(provider = name, "provider unavailable, skipping"),
                None => debug!(provider = name, "provider not registered, skipping"),
            }
        }
        chain
    }

    fn record_request(operation: &'static str, provider: &str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "modality" => M::NAME,
            "provider" => provider.to_owned(),
            "operation" => operation,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "modality" => M::NAME,
            "provider" => provider.to_owned(),
            "operation" => operation,
        )
        .record(start.elapsed().as_secs_f64());
    }
}
