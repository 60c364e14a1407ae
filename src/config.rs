//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (`--config <path>` in the CLI)
//! 2. `~/.lectern/config.toml` (user)
//! 3. `/etc/lectern/config.toml` (system)
//! 4. built-in defaults
//!
//! `LECTERN_*` environment variables then override the provider chain and
//! enable flags. API keys never live in the file; they come from the
//! environment via [`Credentials`].
//!
//! ```toml
//! [text]
//! primary = "openai"
//! fallback = "anthropic"
//! timeout_secs = 30
//! max_retries = 3
//!
//! [speech]
//! primary = "elevenlabs"
//! cache_ttl_secs = 86400
//!
//! [cache]
//! max_entries = 10000
//!
//! [cache.categories]
//! processing_status = 60
//! vocabulary = 300
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::providers::RetryConfig;
use crate::{LecternError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub text: ModalitySettings,
    pub speech: ModalitySettings,
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text: ModalitySettings::default().with_default_chain(TEXT_CHAIN),
            speech: ModalitySettings::default().with_default_chain(SPEECH_CHAIN),
            cache: CacheSettings::default(),
        }
    }
}

/// Default (primary, fallback) per modality.
const TEXT_CHAIN: (&str, &str) = ("openai", "anthropic");
const SPEECH_CHAIN: (&str, &str) = ("openai", "elevenlabs");

/// Settings of one modality's manager.
///
/// When `primary` is left unset the modality's default chain applies
/// (text: openai → anthropic, speech: openai → elevenlabs). Setting
/// `primary` alone means "no fallback".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalitySettings {
    /// Master switch. Disabled managers refuse every call. Default: true.
    pub enabled: bool,
    pub primary: Option<String>,
    pub fallback: Option<String>,
    /// Per-call deadline in seconds (default: 30).
    pub timeout_secs: u64,
    /// Retries per provider after the initial attempt (default: 3).
    pub max_retries: u32,
    /// Backoff seed in milliseconds (default: 500).
    pub retry_base_delay_ms: u64,
    /// Cap on the computed backoff in milliseconds (default: 30000).
    pub retry_max_delay_ms: u64,
    pub cache_enabled: bool,
    /// Lifetime of cached generations in seconds (default: 3600).
    pub cache_ttl_secs: u64,
    /// Batch items in flight at once against the provider (default: 4).
    pub batch_concurrency: usize,
}

impl Default for ModalitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            primary: None,
            fallback: None,
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            cache_enabled: true,
            cache_ttl_secs: 3600,
            batch_concurrency: 4,
        }
    }
}

impl ModalitySettings {
    /// Settings with `primary` as the only provider.
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: Some(primary.into()),
            ..Self::default()
        }
    }

    pub fn fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback = Some(name.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.retry_base_delay_ms = ms;
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.retry_max_delay_ms = ms;
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    pub fn batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = n;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_retries(self.max_retries)
            .base_delay(Duration::from_millis(self.retry_base_delay_ms))
            .max_delay(Duration::from_millis(self.retry_max_delay_ms))
    }

    fn with_default_chain(mut self, (primary, fallback): (&str, &str)) -> Self {
        if self.primary.is_none() {
            self.primary = Some(primary.to_string());
            self.fallback.get_or_insert_with(|| fallback.to_string());
        }
        self
    }

    fn validate(&self, section: &str) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(LecternError::Configuration(format!(
                "[{section}] timeout_secs must be greater than zero"
            )));
        }
        if self.batch_concurrency == 0 {
            return Err(LecternError::Configuration(format!(
                "[{section}] batch_concurrency must be greater than zero"
            )));
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(LecternError::Configuration(format!(
                "[{section}] retry_base_delay_ms exceeds retry_max_delay_ms"
            )));
        }
        Ok(())
    }
}

/// Settings of the shared data cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum entries per cache (default: 10000).
    pub max_entries: u64,
    /// TTL for categories not listed below (default: 3600).
    pub default_ttl_secs: u64,
    /// Per-data-category TTLs in seconds.
    pub categories: HashMap<String, u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl_secs: 3600,
            categories: HashMap::from([
                ("processing_status".to_string(), 60),
                ("vocabulary".to_string(), 300),
            ]),
        }
    }
}

impl CacheSettings {
    /// TTL of `category`, or the default TTL when it has none.
    pub fn ttl_for(&self, category: &str) -> Duration {
        Duration::from_secs(
            self.categories
                .get(category)
                .copied()
                .unwrap_or(self.default_ttl_secs),
        )
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.max_entries)
            .default_ttl(Duration::from_secs(self.default_ttl_secs))
    }
}

impl Config {
    /// Parse a TOML document, filling in default provider chains.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| LecternError::Configuration(format!("failed to parse config: {e}")))?;
        config.text = config.text.with_default_chain(TEXT_CHAIN);
        config.speech = config.speech.with_default_chain(SPEECH_CHAIN);
        config.validate()?;
        Ok(config)
    }

    /// Load from the standard locations, then apply `LECTERN_*` overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_path, |name| std::env::var(name).ok())
    }

    /// [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with<F>(explicit_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    LecternError::Configuration(format!("failed to read config file {path:?}: {e}"))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides_from(lookup)?;
        Ok(config)
    }

    /// `None` when no file exists anywhere and no path was given.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(LecternError::Configuration(format!(
                "config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".lectern").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/lectern/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Apply `LECTERN_{TEXT,SPEECH}_{PRIMARY,FALLBACK,ENABLED}`.
    ///
    /// An empty `*_FALLBACK` removes the fallback.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (prefix, settings) in [("TEXT", &mut self.text), ("SPEECH", &mut self.speech)] {
            if let Some(primary) = lookup(&format!("LECTERN_{prefix}_PRIMARY")) {
                settings.primary = non_empty(primary);
            }
            if let Some(fallback) = lookup(&format!("LECTERN_{prefix}_FALLBACK")) {
                settings.fallback = non_empty(fallback);
            }
            let enabled_var = format!("LECTERN_{prefix}_ENABLED");
            if let Some(enabled) = lookup(&enabled_var) {
                settings.enabled = parse_bool(&enabled_var, &enabled)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.text.validate("text")?;
        self.speech.validate("speech")
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(LecternError::Configuration(format!(
            "{var}: expected a boolean, got {other:?}"
        ))),
    }
}

/// Provider name → environment variable name mapping.
const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("elevenlabs", "ELEVENLABS_API_KEY"),
];

/// Vendor API keys.
///
/// A missing key leaves its provider registered but unavailable.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub elevenlabs: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::default();
        for (provider, var) in PROVIDER_ENV_VARS {
            let key = lookup(var).and_then(non_empty);
            match *provider {
                "openai" => credentials.openai = key,
                "anthropic" => credentials.anthropic = key,
                _ => credentials.elevenlabs = key,
            }
        }
        credentials
    }

    /// API key for a provider by name.
    pub fn api_key(&self, provider: &str) -> Option<&str> {
        match provider {
            "openai" => self.openai.as_deref(),
            "anthropic" => self.anthropic.as_deref(),
            "elevenlabs" => self.elevenlabs.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("openai", &redact(&self.openai))
            .field("anthropic", &redact(&self.anthropic))
            .field("elevenlabs", &redact(&self.elevenlabs))
            .finish()
    }
}
