//! In-process TTL cache for generated content.
//!
//! [`ResponseCache`] stores raw provider output (text or audio bytes) keyed
//! by a request fingerprint, with a lifetime chosen per entry. It also
//! serves as the general-purpose data cache for callers that want
//! per-category TTLs (processing status at 60s, vocabulary at 300s, …).
//!
//! # Architecture
//!
//! Entries live in a moka concurrent map. No lock is held outside a single
//! map operation, so a provider call is never awaited while the cache is
//! locked. The price is that two concurrent misses on the same key both
//! reach a provider and both write; the last write wins.
//!
//! # Expiry
//!
//! Each entry records its own `expires_at`. moka evicts on that schedule,
//! and [`get`](ResponseCache::get) re-checks the deadline itself before
//! returning, removing the entry when it has passed. A reader therefore
//! never observes an expired value, whatever moka's housekeeping timing.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;

use crate::telemetry;

/// Longest lifetime an entry may be given.
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Configuration for a [`ResponseCache`].
///
/// ```rust
/// # use lectern::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .default_ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Lifetime used by callers that have no category-specific TTL. Default: 1 hour.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Hands each entry's own deadline to moka.
struct PerEntryExpiry;

impl<V> Expiry<String, CacheEntry<V>> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(updated_at))
    }
}

/// Thread-safe TTL cache with per-entry lifetimes.
pub struct ResponseCache<V> {
    entries: Cache<String, CacheEntry<V>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send + Sync + 'static> ResponseCache<V> {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(PerEntryExpiry)
            .build();
        Self {
            entries,
            default_ttl: config.default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry.
    ///
    /// An entry past its deadline is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let found = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Some(entry.value),
            Some(_) => {
                self.entries.invalidate(key);
                None
            }
            None => None,
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        }
        found
    }

    /// Store `value`, replacing any previous entry, live for `ttl`.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl.min(MAX_TTL);
        self.entries
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Remove one entry. Returns whether a live entry was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Returns the number of live entries removed.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let now = Instant::now();
        let keys: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();

        keys.iter()
            .filter_map(|key| self.entries.remove(key.as_str()))
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Look up `key`; on a miss run `populate` once, store its value and return it.
    ///
    /// Errors from `populate` are returned as-is and nothing is stored.
    /// Concurrent callers missing on the same key each run their own
    /// `populate`.
    pub async fn get_or_populate<F, Fut, E>(
        &self,
        key: &str,
        populate: F,
        ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = populate().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.entry_count(),
        }
    }

    /// Evict all entries. Counters are kept.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
