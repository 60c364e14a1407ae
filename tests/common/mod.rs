//! Shared mock providers for manager tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lectern::{
    GenerationOptions, GenerationResult, Modality, ModalitySettings, Provider, ProviderError,
    ProviderResult,
};

type Outcome<C> = Box<dyn Fn(&str, u32) -> ProviderResult<C> + Send + Sync>;

/// Mock provider whose outcome is a function of (payload, call index).
pub struct MockProvider<M: Modality> {
    name: &'static str,
    available: bool,
    latency: Duration,
    outcome: Outcome<M::Content>,
    call_count: AtomicU32,
    seen: Mutex<Vec<(String, GenerationOptions)>>,
}

impl<M: Modality> MockProvider<M> {
    pub fn new(
        name: &'static str,
        outcome: impl Fn(&str, u32) -> ProviderResult<M::Content> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            available: true,
            latency: Duration::ZERO,
            outcome: Box::new(outcome),
            call_count: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Always returns `content`.
    pub fn succeeding(name: &'static str, content: M::Content) -> Self {
        Self::new(name, move |_, _| Ok(content.clone()))
    }

    /// Always fails with `error`.
    pub fn failing(name: &'static str, error: ProviderError) -> Self {
        Self::new(name, move |_, _| Err(error.clone()))
    }

    /// Fails with `error` for the first `failures` calls, then returns `content`.
    pub fn flaky(
        name: &'static str,
        failures: u32,
        error: ProviderError,
        content: M::Content,
    ) -> Self {
        Self::new(name, move |_, call| {
            if call < failures {
                Err(error.clone())
            } else {
                Ok(content.clone())
            }
        })
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Payloads and options of every call, in order.
    pub fn seen(&self) -> Vec<(String, GenerationOptions)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl<M: Modality> Provider<M> for MockProvider<M> {
    fn name(&self) -> &str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(
        &self,
        payload: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<M>> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.seen
            .lock()
            .unwrap()
            .push((payload.to_string(), options.clone()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let content = (self.outcome)(payload, call)?;
        Ok(GenerationResult::new(content, M::Usage::default(), self.name))
    }
}

/// `primary` → `fallback`, two retries, millisecond backoff.
pub fn settings(primary: &str, fallback: &str) -> ModalitySettings {
    ModalitySettings::new(primary)
        .fallback(fallback)
        .max_retries(2)
        .retry_base_delay_ms(10)
        .retry_max_delay_ms(100)
}

pub fn connection_error() -> ProviderError {
    ProviderError::Connection("connection refused".into())
}
