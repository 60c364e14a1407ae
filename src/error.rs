//! Lectern error types
//!
//! Two layers:
//!
//! - [`ProviderError`]: the closed set of failure kinds a single provider
//!   call can end in. Every vendor client reduces its own failures into
//!   exactly one of these before the manager sees them.
//! - [`LecternError`]: what callers of the managers see: either a
//!   pre-flight refusal or the aggregate of every provider's terminal error.

use std::fmt;
use std::time::Duration;

/// Classified failure of one provider call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Credentials rejected (HTTP 401/403). Retrying cannot succeed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Backend throttled the request (HTTP 429).
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    /// The per-call deadline elapsed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connect, DNS or transport failure before a response arrived.
    #[error("connection error: {0}")]
    Connection(String),

    /// Response missing expected fields or not parseable as expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("provider error: {0}")]
    Generic(String),
}

/// Discriminant of [`ProviderError`], used for labels and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    Timeout,
    Connection,
    MalformedResponse,
    Generic,
}

impl ErrorKind {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::MalformedResponse => "malformed_response",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Connection(_) => ErrorKind::Connection,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Generic(_) => ErrorKind::Generic,
        }
    }

    /// Whether the manager may re-attempt the same provider.
    ///
    /// Only rate limits, timeouts and connection failures qualify.
    /// Authentication, malformed responses and generic errors move straight
    /// on to the next provider in the chain.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. } | Self::Timeout(_) | Self::Connection(_)
        )
    }

    /// Backend-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Terminal error of one provider within a fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Lectern error types
#[derive(Debug, thiserror::Error)]
pub enum LecternError {
    /// Generation for this modality is switched off in settings.
    #[error("{modality} generation is disabled")]
    ConfigurationDisabled { modality: &'static str },

    /// Neither the primary nor the fallback provider is registered and available.
    #[error("no {modality} providers available")]
    NoProvidersAvailable { modality: &'static str },

    /// Every provider in the chain was exhausted, in attempt order.
    #[error("all providers failed: {}", join_failures(.failures))]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl LecternError {
    /// Per-provider terminal errors, empty unless `AllProvidersFailed`.
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed { failures } => failures,
            _ => &[],
        }
    }

    /// True when the chain was exhausted and every provider ended in `kind`.
    ///
    /// Lets callers tell "all credentials are bad" apart from "the network
    /// is flaky" without inspecting vendor details.
    pub fn all_failures_are(&self, kind: ErrorKind) -> bool {
        let failures = self.failures();
        !failures.is_empty() && failures.iter().all(|f| f.error.kind() == kind)
    }

    /// Whether the layer above should present this as "try again later".
    pub fn is_retry_later(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationDisabled { .. }
                | Self::NoProvidersAvailable { .. }
                | Self::AllProvidersFailed { .. }
        )
    }
}

/// Result type alias for Lectern operations
pub type Result<T> = std::result::Result<T, LecternError>;

/// Result type alias for a single provider call
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
