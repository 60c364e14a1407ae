//! Caching subsystem.
//!
//! - [`ResponseCache`]: per-entry TTL cache with hit/miss accounting,
//!   prefix invalidation and a `get_or_populate` helper.
//! - [`CacheKey`]: deterministic request fingerprint used by the managers.

pub mod key;
pub mod response;

pub use key::CacheKey;
pub use response::{CacheConfig, CacheStats, ResponseCache};
