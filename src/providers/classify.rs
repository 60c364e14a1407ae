//! Reduction of HTTP and transport failures into [`ProviderError`].
//!
//! Every vendor client funnels its responses through [`check_response`] and
//! its send errors through [`classify_transport`], so the six-kind taxonomy
//! is applied the same way regardless of backend.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, ProviderResult};

/// Longest error body kept in a classified message.
const MAX_BODY_EXCERPT: usize = 256;

/// Map a non-success HTTP status to a provider error.
pub(crate) fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let detail = excerpt(body);
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(format!("{status}: {detail}")),
        429 => ProviderError::RateLimit {
            retry_after: parse_retry_after(headers),
        },
        _ => ProviderError::Generic(format!("{status}: {detail}")),
    }
}

/// Map a `reqwest` send/receive failure to a provider error.
///
/// `timeout` is the per-call deadline that was applied, reported back in
/// [`ProviderError::Timeout`].
pub(crate) fn classify_transport(err: &reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if err.is_connect() || err.is_request() {
        ProviderError::Connection(err.to_string())
    } else if err.is_decode() {
        ProviderError::MalformedResponse(err.to_string())
    } else {
        ProviderError::Generic(err.to_string())
    }
}

/// Pass a successful response through; classify anything else.
pub(crate) async fn check_response(response: Response, timeout: Duration) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(&e, timeout))?;
    Err(classify_status(status, &headers, &body))
}

/// Decode a JSON body; a shape mismatch is a malformed response.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> ProviderResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| classify_transport(&e, timeout))?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

/// `retry-after-ms` (milliseconds) wins over `retry-after` (seconds).
///
/// HTTP-date forms of `retry-after` are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(ms) = header("retry-after-ms").and_then(|s| s.trim().parse::<f64>().ok())
        && ms.is_finite()
        && ms >= 0.0
    {
        return Some(Duration::from_secs_f64(ms / 1000.0));
    }
    header("retry-after")
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
