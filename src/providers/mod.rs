//! Provider trait, retry policy, and reference vendor clients.
//!
//! Vendor clients are feature-gated (`openai`, `anthropic`, `elevenlabs`,
//! all on by default). Each reduces its failures through [`classify`] into
//! the shared [`ProviderError`](crate::ProviderError) taxonomy.

use std::time::Duration;

pub(crate) mod classify;
pub mod pricing;
pub mod retry;
pub mod traits;

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "elevenlabs")]
pub mod elevenlabs;
#[cfg(feature = "openai")]
pub mod openai;

pub use retry::RetryConfig;
pub use traits::{Provider, SpeechProvider, TextProvider};

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicClient;
#[cfg(feature = "elevenlabs")]
pub use elevenlabs::ElevenLabsClient;
#[cfg(feature = "openai")]
pub use openai::OpenAiClient;

/// Per-request deadline vendor clients apply unless told otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
