//! Application-owned generation context.
//!
//! [`GenerationContext`] bundles both managers and the shared data cache.
//! It is built once at startup from [`Config`] and [`Credentials`] and
//! handed to whatever needs to generate; there is no global instance.
//!
//! ```rust,no_run
//! use lectern::{Config, Credentials, GenerationContext, GenerationOptions};
//!
//! # async fn run() -> lectern::Result<()> {
//! let config = Config::load(None)?;
//! let ctx = GenerationContext::builder(config)
//!     .credentials(Credentials::from_env())
//!     .build();
//!
//! let reply = ctx.text().generate("Summarise photosynthesis.", &GenerationOptions::new()).await?;
//! println!("{} (via {})", reply.content, reply.provider_name);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::ResponseCache;
use crate::config::{CacheSettings, Config, Credentials};
use crate::manager::{GenerationManager, SpeechManager, TextManager};
use crate::modality::{Speech, Text};
use crate::providers::Provider;

/// Both managers plus a category-TTL data cache.
pub struct GenerationContext {
    text: Arc<TextManager>,
    speech: Arc<SpeechManager>,
    data: Arc<ResponseCache<Value>>,
    cache_settings: CacheSettings,
}

impl GenerationContext {
    pub fn builder(config: Config) -> GenerationContextBuilder {
        GenerationContextBuilder {
            config,
            credentials: Credentials::default(),
            vendor_clients: true,
            text_providers: Vec::new(),
            speech_providers: Vec::new(),
        }
    }

    /// Context with the reference vendor clients wired from `credentials`.
    pub fn from_config(config: Config, credentials: Credentials) -> Self {
        Self::builder(config).credentials(credentials).build()
    }

    pub fn text(&self) -> &Arc<TextManager> {
        &self.text
    }

    pub fn speech(&self) -> &Arc<SpeechManager> {
        &self.speech
    }

    /// The shared data cache. Keys written through the helpers below are
    /// `"{category}:{key}"`.
    pub fn data_cache(&self) -> &Arc<ResponseCache<Value>> {
        &self.data
    }

    /// Configured lifetime of a data category.
    pub fn ttl_for(&self, category: &str) -> Duration {
        self.cache_settings.ttl_for(category)
    }

    pub fn get_data(&self, category: &str, key: &str) -> Option<Value> {
        self.data.get(&data_key(category, key))
    }

    pub fn set_data(&self, category: &str, key: &str, value: Value) {
        self.data
            .set(data_key(category, key), value, self.ttl_for(category));
    }

    /// Cached value of `category`/`key`, computing and storing it on a miss.
    pub async fn get_or_populate_data<F, Fut, E>(
        &self,
        category: &str,
        key: &str,
        populate: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.data
            .get_or_populate(&data_key(category, key), populate, self.ttl_for(category))
            .await
    }

    /// Drop every entry of one data category. Returns the number removed.
    pub fn invalidate_category(&self, category: &str) -> usize {
        self.data.invalidate_by_prefix(&format!("{category}:"))
    }
}

fn data_key(category: &str, key: &str) -> String {
    format!("{category}:{key}")
}

/// Builder for [`GenerationContext`].
pub struct GenerationContextBuilder {
    config: Config,
    credentials: Credentials,
    vendor_clients: bool,
    text_providers: Vec<Arc<dyn Provider<Text>>>,
    speech_providers: Vec<Arc<dyn Provider<Speech>>>,
}

impl GenerationContextBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Skip registering the built-in vendor clients.
    pub fn without_vendor_clients(mut self) -> Self {
        self.vendor_clients = false;
        self
    }

    /// Register an extra text provider. Replaces a vendor client of the same name.
    pub fn text_provider(mut self, provider: Arc<dyn Provider<Text>>) -> Self {
        self.text_providers.push(provider);
        self
    }

    /// Register an extra speech provider. Replaces a vendor client of the same name.
    pub fn speech_provider(mut self, provider: Arc<dyn Provider<Speech>>) -> Self {
        self.speech_providers.push(provider);
        self
    }

    pub fn build(self) -> GenerationContext {
        let cache_config = self.config.cache.cache_config();

        let mut text = GenerationManager::<Text>::builder(self.config.text.clone())
            .cache(Arc::new(ResponseCache::new(&cache_config)));
        let mut speech = GenerationManager::<Speech>::builder(self.config.speech.clone())
            .cache(Arc::new(ResponseCache::new(&cache_config)));

        if self.vendor_clients {
            for provider in vendor_text_clients(&self.config, &self.credentials) {
                text = text.provider(provider);
            }
            for provider in vendor_speech_clients(&self.config, &self.credentials) {
                speech = speech.provider(provider);
            }
        }
        for provider in self.text_providers {
            text = text.provider(provider);
        }
        for provider in self.speech_providers {
            speech = speech.provider(provider);
        }

        GenerationContext {
            text: Arc::new(text.build()),
            speech: Arc::new(speech.build()),
            data: Arc::new(ResponseCache::new(&cache_config)),
            cache_settings: self.config.cache,
        }
    }
}

#[allow(unused_variables, unused_mut)]
fn vendor_text_clients(config: &Config, credentials: &Credentials) -> Vec<Arc<dyn Provider<Text>>> {
    let timeout = config.text.timeout();
    let mut clients: Vec<Arc<dyn Provider<Text>>> = Vec::new();
    #[cfg(feature = "openai")]
    clients.push(Arc::new(
        crate::providers::OpenAiClient::new(credentials.openai.clone()).with_timeout(timeout),
    ));
    #[cfg(feature = "anthropic")]
    clients.push(Arc::new(
        crate::providers::AnthropicClient::new(credentials.anthropic.clone()).with_timeout(timeout),
    ));
    clients
}

#[allow(unused_variables, unused_mut)]
fn vendor_speech_clients(
    config: &Config,
    credentials: &Credentials,
) -> Vec<Arc<dyn Provider<Speech>>> {
    let timeout = config.speech.timeout();
    let mut clients: Vec<Arc<dyn Provider<Speech>>> = Vec::new();
    #[cfg(feature = "openai")]
    clients.push(Arc::new(
        crate::providers::OpenAiClient::new(credentials.openai.clone()).with_timeout(timeout),
    ));
    #[cfg(feature = "elevenlabs")]
    clients.push(Arc::new(
        crate::providers::ElevenLabsClient::new(credentials.elevenlabs.clone())
            .with_timeout(timeout),
    ));
    clients
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[cfg(all(feature = "openai", feature = "anthropic", feature = "elevenlabs"))]
    #[test]
    fn vendor_clients_are_registered_but_unavailable_without_keys() {
        let ctx = GenerationContext::from_config(Config::default(), Credentials::default());
        assert_eq!(ctx.text().provider_names(), vec!["anthropic", "openai"]);
        assert_eq!(ctx.speech().provider_names(), vec!["elevenlabs", "openai"]);
    }

    #[test]
    fn data_cache_uses_category_ttl() {
        let ctx = GenerationContext::builder(Config::default())
            .without_vendor_clients()
            .build();
        assert_eq!(ctx.ttl_for("processing_status"), Duration::from_secs(60));

        ctx.set_data("vocabulary", "unit-3", json!(["photosynthesis"]));
        ctx.set_data("processing_status", "job-1", json!("running"));
        assert_eq!(ctx.get_data("vocabulary", "unit-3"), Some(json!(["photosynthesis"])));

        assert_eq!(ctx.invalidate_category("vocabulary"), 1);
        assert_eq!(ctx.get_data("vocabulary", "unit-3"), None);
        assert!(ctx.get_data("processing_status", "job-1").is_some());
    }
}
