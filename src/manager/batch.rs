//! Batch generation against a single provider.

use futures_util::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{instrument, warn};

use super::GenerationManager;
use crate::error::ProviderResult;
use crate::modality::Modality;
use crate::providers::Provider;
use crate::providers::retry::with_retry;
use crate::types::{BatchFailure, BatchItem, BatchResult, GenerationOptions, GenerationResult};
use crate::{LecternError, Result};

impl<M: Modality> GenerationManager<M> {
    /// Generate every item on the first available provider, at most
    /// `batch_concurrency` at a time.
    ///
    /// There is no per-item fallback: an item that fails after its retries
    /// is recorded in [`BatchResult::failures`] and the rest of the batch
    /// carries on. Items already cached are served from the cache. A batch
    /// in which every item failed is still `Ok`, with `failed == items.len()`.
    #[instrument(skip(self, items), fields(modality = M::NAME, operation = "generate_batch", batch_size = items.len()))]
    pub async fn generate_batch(
        &self,
        items: &[(String, GenerationOptions)],
    ) -> Result<BatchResult<M>> {
        self.ensure_enabled()?;

        let Some(provider) = self.provider_chain().into_iter().next() else {
            warn!(modality = M::NAME, "no providers available");
            return Err(LecternError::NoProvidersAvailable { modality: M::NAME });
        };
        let name = provider.name();

        let start = Instant::now();
        let outcomes: Vec<_> = stream::iter(items)
            .map(|(payload, options)| self.batch_item(provider.as_ref(), payload, options))
            .buffered(self.settings.batch_concurrency.max(1))
            .collect()
            .await;

        let mut batch = BatchResult {
            provider_name: name.to_string(),
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
            failures: Vec::new(),
        };
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => batch.results.push(BatchItem { index, result }),
                Err(error) => batch.failures.push(BatchFailure { index, error }),
            }
        }
        batch.succeeded = batch.results.len();
        batch.failed = batch.failures.len();

        Self::record_request("generate_batch", name, start, batch.failed == 0);
        if batch.failed > 0 {
            warn!(
                provider = name,
                succeeded = batch.succeeded,
                failed = batch.failed,
                "batch completed with failures"
            );
        }
        Ok(batch)
    }

    async fn batch_item(
        &self,
        provider: &dyn Provider<M>,
        payload: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<M>> {
        let key = self.cache_key(payload, options);
        if let Some((hit, ())) = self.cached(&key, options, &accept_any::<M>) {
            return Ok(hit);
        }

        let (result, ()) = with_retry(&self.retry, provider.name(), "generate_batch", || {
            self.attempt(provider, payload, options, &accept_any::<M>)
        })
        .await?;

        M::record_usage(provider.name(), &result.usage);
        if let Some(cache) = &self.cache {
            cache.set(key.as_str(), result.content.clone(), self.settings.cache_ttl());
        }
        Ok(result)
    }
}

fn accept_any<M: Modality>(_: &M::Content) -> ProviderResult<()> {
    Ok(())
}
