//! Tests for the error taxonomy.

use std::time::Duration;

use lectern::{ErrorKind, LecternError, ProviderError, ProviderFailure};

#[test]
fn only_transient_kinds_are_retryable() {
    assert!(ProviderError::RateLimit { retry_after: None }.is_retryable());
    assert!(ProviderError::Timeout(Duration::from_secs(30)).is_retryable());
    assert!(ProviderError::Connection("dns".into()).is_retryable());

    assert!(!ProviderError::Authentication("401".into()).is_retryable());
    assert!(!ProviderError::MalformedResponse("no choices".into()).is_retryable());
    assert!(!ProviderError::Generic("500".into()).is_retryable());
}

#[test]
fn retry_after_only_from_rate_limit() {
    let hinted = ProviderError::RateLimit {
        retry_after: Some(Duration::from_secs(2)),
    };
    assert_eq!(hinted.retry_after(), Some(Duration::from_secs(2)));
    assert_eq!(ProviderError::Timeout(Duration::from_secs(1)).retry_after(), None);
}

#[test]
fn kind_labels_are_stable() {
    assert_eq!(
        ProviderError::RateLimit { retry_after: None }.kind().as_str(),
        "rate_limit"
    );
    assert_eq!(
        ProviderError::MalformedResponse(String::new()).kind(),
        ErrorKind::MalformedResponse
    );
    assert_eq!(ErrorKind::Authentication.to_string(), "authentication");
}

#[test]
fn aggregate_message_lists_providers_in_order() {
    let err = LecternError::AllProvidersFailed {
        failures: vec![
            ProviderFailure {
                provider: "openai".into(),
                error: ProviderError::Connection("reset".into()),
            },
            ProviderFailure {
                provider: "anthropic".into(),
                error: ProviderError::Authentication("bad key".into()),
            },
        ],
    };
    let message = err.to_string();
    let openai = message.find("openai").unwrap();
    let anthropic = message.find("anthropic").unwrap();
    assert!(openai < anthropic);
    assert!(message.contains("connection error: reset"));
}

#[test]
fn all_failures_are_requires_failures() {
    let none = LecternError::NoProvidersAvailable { modality: "text" };
    assert!(!none.all_failures_are(ErrorKind::Authentication));
    assert!(none.failures().is_empty());

    let auth_only = LecternError::AllProvidersFailed {
        failures: vec![ProviderFailure {
            provider: "elevenlabs".into(),
            error: ProviderError::Authentication("401".into()),
        }],
    };
    assert!(auth_only.all_failures_are(ErrorKind::Authentication));
}

#[test]
fn retry_later_classification() {
    assert!(LecternError::ConfigurationDisabled { modality: "speech" }.is_retry_later());
    assert!(LecternError::NoProvidersAvailable { modality: "speech" }.is_retry_later());
    assert!(!LecternError::Configuration("bad toml".into()).is_retry_later());
}

#[test]
fn io_errors_convert() {
    let err: LecternError = std::io::Error::other("disk full").into();
    assert!(matches!(err, LecternError::Io(_)));
}
