//! Lectern - multi-provider text and speech generation orchestration
//!
//! Lectern fronts interchangeable generation backends for an LMS backend:
//! text providers (chat models) and speech providers (text-to-speech). For
//! each modality a [`GenerationManager`] walks an ordered primary → fallback
//! chain, retries transient failures with backoff, and caches results so
//! identical requests never reach a backend twice within their TTL.
//!
//! Every vendor failure is reduced into one closed [`ProviderError`]
//! taxonomy; callers only ever see a result or a [`LecternError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::{Config, Credentials, GenerationContext, GenerationOptions};
//!
//! #[tokio::main]
//! async fn main() -> lectern::Result<()> {
//!     let ctx = GenerationContext::from_config(Config::load(None)?, Credentials::from_env());
//!
//!     let audio = ctx
//!         .speech()
//!         .generate("The mitochondria is the powerhouse of the cell.",
//!                   &GenerationOptions::new().voice("nova"))
//!         .await?;
//!     println!("{} bytes from {}", audio.content.len(), audio.provider_name);
//!     Ok(())
//! }
//! ```
//!
//! # Custom providers
//!
//! Implement [`Provider`] for the modality and register it on a manager:
//!
//! ```rust,ignore
//! let manager = TextManager::builder(ModalitySettings::new("inhouse").fallback("openai"))
//!     .provider(Arc::new(InHouseModel::new()))
//!     .provider(Arc::new(OpenAiClient::new(key)))
//!     .build();
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod modality;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, CacheStats, ResponseCache};
pub use config::{CacheSettings, Config, Credentials, ModalitySettings};
pub use context::{GenerationContext, GenerationContextBuilder};
pub use error::{ErrorKind, LecternError, ProviderError, ProviderFailure, ProviderResult, Result};
pub use manager::{GenerationManager, GenerationManagerBuilder, SpeechManager, TextManager};
pub use modality::{Modality, Speech, Text};
pub use providers::{Provider, RetryConfig, SpeechProvider, TextProvider};
pub use types::{
    AudioUsage, BatchFailure, BatchItem, BatchResult, CACHE_PROVIDER, GenerationOptions,
    GenerationResult, ResponseFormat, TokenUsage,
};

#[cfg(feature = "anthropic")]
pub use providers::AnthropicClient;
#[cfg(feature = "elevenlabs")]
pub use providers::ElevenLabsClient;
#[cfg(feature = "openai")]
pub use providers::OpenAiClient;
