//! The provider capability trait.
//!
//! One implementation per backend vendor and modality. A provider performs
//! exactly one backend call per [`Provider::generate`] and reports failure
//! as a classified [`ProviderError`]; it never retries and never falls
//! back. Both are the manager's job.
//!
//! # Example
//!
//! ```ignore
//! async fn generate(&self, payload: &str, options: &GenerationOptions)
//!     -> ProviderResult<GenerationResult<Text>>
//! {
//!     let response = self.call_backend(payload, options).await?; // classified
//!     let text = response.text.ok_or_else(|| {
//!         ProviderError::MalformedResponse("missing text".into())
//!     })?;
//!     Ok(GenerationResult::new(text, usage, self.name()))
//! }
//! ```

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::modality::{Modality, Speech, Text};
use crate::types::{GenerationOptions, GenerationResult};

/// A backend vendor able to produce content of modality `M`.
#[async_trait]
pub trait Provider<M: Modality>: Send + Sync {
    /// Stable identifier, used in settings, logs and `provider_name`.
    fn name(&self) -> &str;

    /// Cheap local readiness check, e.g. "is a credential configured".
    ///
    /// Must not perform I/O. Unavailable providers are skipped by the
    /// manager without counting as an attempt.
    fn is_available(&self) -> bool {
        true
    }

    /// Perform one backend call.
    async fn generate(
        &self,
        payload: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult<M>>;
}

/// Text-generation provider.
pub type TextProvider = dyn Provider<Text>;

/// Speech-synthesis provider.
pub type SpeechProvider = dyn Provider<Speech>;
